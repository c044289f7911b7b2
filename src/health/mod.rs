/// Liveness probing of Solr core and server endpoints
///
/// Probes are best effort: failures become [`HealthStatus`] values and are
/// never raised as errors.
use crate::connectors::{Connector, ConnectorBase};
use crate::core::{ConnectionManager, EndpointKey, SolrRequest, PING_HANDLER, SERVER_INFO_HANDLER};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Added to every measured latency so a reachable endpoint never reports zero
pub const PING_EPSILON: Duration = Duration::from_micros(1);

/// Outcome of a single probe
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy { latency: Duration },
    Unhealthy { reason: String },
    Timeout,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy { latency } => {
                write!(f, "Healthy ({:.3} ms)", latency.as_secs_f64() * 1000.0)
            }
            HealthStatus::Unhealthy { reason } => write!(f, "Unhealthy: {}", reason),
            HealthStatus::Timeout => write!(f, "Timeout"),
        }
    }
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy { .. })
    }

    pub fn latency(&self) -> Option<Duration> {
        match self {
            HealthStatus::Healthy { latency } => Some(*latency),
            _ => None,
        }
    }

    /// Latency in seconds, 0.0 when the endpoint is unreachable
    pub fn latency_secs(&self) -> f64 {
        self.latency().map(|l| l.as_secs_f64()).unwrap_or(0.0)
    }
}

/// Probe one endpoint: the core through its ping handler, the server
/// through its system info handler.
pub async fn probe(connection: &ConnectionManager, key: EndpointKey) -> HealthStatus {
    let handler = match key {
        EndpointKey::Core => PING_HANDLER,
        EndpointKey::Server => SERVER_INFO_HANDLER,
    };

    if let Err(e) = connection.ensure_connected().await {
        return HealthStatus::Unhealthy { reason: e.to_string() };
    }

    let request = SolrRequest::get(handler).param("wt", "json");
    let start = Instant::now();
    let result = connection.execute(key, request).await;

    match result {
        // Latency covers the whole body, not just the headers
        Ok(response) if response.status().is_success() => match response.bytes().await {
            Ok(_) => HealthStatus::Healthy {
                latency: start.elapsed() + PING_EPSILON,
            },
            Err(e) if e.is_timeout() => HealthStatus::Timeout,
            Err(e) => HealthStatus::Unhealthy {
                reason: format!("Failed to read response body: {}", e),
            },
        },
        Ok(response) => HealthStatus::Unhealthy {
            reason: format!("HTTP status {}", response.status().as_u16()),
        },
        Err(e) if e.is_timeout() => HealthStatus::Timeout,
        Err(e) => HealthStatus::Unhealthy { reason: e.to_string() },
    }
}

impl ConnectorBase {
    pub async fn ping_core(&self) -> HealthStatus {
        probe(self.connection(), EndpointKey::Core).await
    }

    pub async fn ping_server(&self) -> HealthStatus {
        probe(self.connection(), EndpointKey::Server).await
    }
}

/// Periodic probing of one connector endpoint
pub struct HealthCheckManager {
    connector: Arc<dyn Connector>,
    target: EndpointKey,
    interval: Duration,
}

impl HealthCheckManager {
    pub fn new(connector: Arc<dyn Connector>, target: EndpointKey, interval: Duration) -> Self {
        Self {
            connector,
            target,
            interval,
        }
    }

    pub async fn check_once(&self) -> HealthStatus {
        match self.target {
            EndpointKey::Core => self.connector.ping_core().await,
            EndpointKey::Server => self.connector.ping_server().await,
        }
    }

    /// Probe on every tick, for `rounds` ticks or forever when `None`.
    ///
    /// Returns the last observed status.
    pub async fn run_health_checks(&self, rounds: Option<usize>) -> Option<HealthStatus> {
        let mut interval = tokio::time::interval(self.interval);
        let mut last = None;
        let mut done = 0usize;

        while rounds.map_or(true, |r| done < r) {
            interval.tick().await;

            let status = self.check_once().await;
            let uri = match self.target {
                EndpointKey::Core => self.connector.core_uri(),
                EndpointKey::Server => self.connector.server_uri(),
            };

            match &status {
                HealthStatus::Healthy { latency } => {
                    tracing::info!(
                        endpoint = %uri,
                        latency_ms = latency.as_secs_f64() * 1000.0,
                        "Solr endpoint is healthy"
                    );
                }
                HealthStatus::Unhealthy { reason } => {
                    tracing::warn!("Solr endpoint {} is unhealthy: {}", uri, reason);
                }
                HealthStatus::Timeout => {
                    tracing::warn!("Health check timeout for Solr endpoint {}", uri);
                }
            }

            last = Some(status);
            done += 1;
        }

        last
    }
}
