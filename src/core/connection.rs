/// Connection handling for the core and server endpoints
///
/// The connection manager is the only place that creates network-facing
/// handles. The HTTP client is built lazily on first use and lives as long
/// as the manager; the "server" endpoint is registered on first
/// administrative need.
use super::{Endpoint, EndpointKey};
use crate::config::EndpointConfig;
use crate::error::{SolrError, SolrResult};
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Host name that gets replaced by the public host in display URIs
const LOOPBACK_HOST: &str = "localhost";

/// Body of an outgoing request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Raw JSON document
    Json(String),
    /// Form-encoded parameters
    Form(Vec<(String, String)>),
}

/// A request against a handler of one endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct SolrRequest {
    pub method: Method,
    /// Handler path relative to the endpoint base URI, may carry a query string
    pub handler: String,
    pub params: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Overrides the endpoint timeout for this request only
    pub timeout: Option<Duration>,
}

impl SolrRequest {
    pub fn get<S: Into<String>>(handler: S) -> Self {
        Self {
            method: Method::GET,
            handler: handler.into(),
            params: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn post_json<S: Into<String>, B: Into<String>>(handler: S, body: B) -> Self {
        Self {
            method: Method::POST,
            handler: handler.into(),
            params: Vec::new(),
            body: Some(RequestBody::Json(body.into())),
            timeout: None,
        }
    }

    pub fn post_form<S: Into<String>>(handler: S, params: Vec<(String, String)>) -> Self {
        Self {
            method: Method::POST,
            handler: handler.into(),
            params: Vec::new(),
            body: Some(RequestBody::Form(params)),
            timeout: None,
        }
    }

    pub fn param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params(mut self, params: Vec<(String, String)>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Connection manager owning the client handle and the endpoint pair
pub struct ConnectionManager {
    config: EndpointConfig,
    credentials: Option<(String, String)>,
    /// Externally visible host name, substituted for "localhost" in display URIs
    public_host: Option<String>,
    client: OnceCell<Client>,
    endpoints: RwLock<HashMap<EndpointKey, Endpoint>>,
    /// Live timeout overrides per endpoint
    overrides: Mutex<HashMap<EndpointKey, ActiveOverride>>,
}

/// Overrides sharing one endpoint, and the timeout to restore when the last ends
#[derive(Debug, Clone, Copy)]
struct ActiveOverride {
    count: usize,
    baseline: Duration,
}

impl ConnectionManager {
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            config,
            credentials: None,
            public_host: None,
            client: OnceCell::new(),
            endpoints: RwLock::new(HashMap::new()),
            overrides: Mutex::new(HashMap::new()),
        }
    }

    /// Send HTTP basic auth credentials with every request
    pub fn with_credentials<U: Into<String>, P: Into<String>>(mut self, username: U, password: P) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Set the externally visible host name used by [`resolve_base_uri`](Self::resolve_base_uri)
    pub fn with_public_host(mut self, host: Option<String>) -> Self {
        self.public_host = host.filter(|h| !h.trim().is_empty());
        self
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Whether the client handle has been created
    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }

    /// Build the client and register the core endpoint on first call
    pub async fn ensure_connected(&self) -> SolrResult<&Client> {
        self.client
            .get_or_try_init(|| async {
                let client = Client::builder()
                    .connect_timeout(self.config.query_timeout())
                    .build()
                    .map_err(|e| SolrError::internal(format!("Failed to create HTTP client: {}", e)))?;

                self.register(Endpoint::new(
                    EndpointKey::Core,
                    self.config.core_base_uri(),
                    self.config.query_timeout(),
                ));
                info!("Connected to Solr core endpoint {}", self.config.core_base_uri());
                Ok::<Client, SolrError>(client)
            })
            .await
    }

    /// Register the server endpoint next to the core endpoint
    pub async fn attach_server_endpoint(&self) -> SolrResult<()> {
        self.ensure_connected().await?;

        if self.endpoint(EndpointKey::Server).is_none() {
            self.register(Endpoint::new(
                EndpointKey::Server,
                self.config.server_base_uri(),
                self.config.query_timeout(),
            ));
            info!("Attached Solr server endpoint {}", self.config.server_base_uri());
        }

        Ok(())
    }

    fn register(&self, endpoint: Endpoint) {
        let mut endpoints = self.endpoints.write().unwrap_or_else(|e| e.into_inner());
        endpoints.entry(endpoint.key).or_insert(endpoint);
    }

    /// Registered endpoint, if any
    pub fn endpoint(&self, key: EndpointKey) -> Option<Endpoint> {
        let endpoints = self.endpoints.read().unwrap_or_else(|e| e.into_inner());
        endpoints.get(&key).cloned()
    }

    /// Base URI used on the wire and as cache key
    pub fn endpoint_base_uri(&self, key: EndpointKey) -> String {
        match key {
            EndpointKey::Core => self.config.core_base_uri(),
            EndpointKey::Server => self.config.server_base_uri(),
        }
    }

    /// Base URI for display and link generation.
    ///
    /// Substitutes the public host name when the configured host is
    /// "localhost". Never touches the network.
    pub fn resolve_base_uri(&self, key: EndpointKey) -> String {
        let host = match (&self.public_host, self.config.host.as_str()) {
            (Some(public), LOOPBACK_HOST) => public.as_str(),
            _ => self.config.host.as_str(),
        };

        match key {
            EndpointKey::Core => self.config.core_base_uri_for_host(host),
            EndpointKey::Server => self.config.server_base_uri_for_host(host),
        }
    }

    /// Current timeout of a registered endpoint
    pub fn endpoint_timeout(&self, key: EndpointKey) -> Option<Duration> {
        self.endpoint(key).map(|e| e.timeout)
    }

    /// Replace the timeout of a registered endpoint, returning the previous one
    pub fn set_endpoint_timeout(&self, key: EndpointKey, timeout: Duration) -> Option<Duration> {
        let mut endpoints = self.endpoints.write().unwrap_or_else(|e| e.into_inner());
        endpoints
            .get_mut(&key)
            .map(|endpoint| std::mem::replace(&mut endpoint.timeout, timeout))
    }

    /// Override an endpoint timeout until the returned guard is dropped.
    ///
    /// Overlapping overrides of one endpoint nest: the timeout in place before
    /// the first of them is restored once the last guard is gone.
    pub fn override_timeout(&self, key: EndpointKey, timeout: Duration) -> TimeoutOverride<'_> {
        let mut overrides = self.overrides.lock().unwrap_or_else(|e| e.into_inner());
        let active = match self.set_endpoint_timeout(key, timeout) {
            Some(previous) => {
                let entry = overrides.entry(key).or_insert(ActiveOverride {
                    count: 0,
                    baseline: previous,
                });
                entry.count += 1;
                true
            }
            None => false,
        };

        TimeoutOverride {
            connection: self,
            key,
            active,
        }
    }

    fn release_override(&self, key: EndpointKey) {
        let mut overrides = self.overrides.lock().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = overrides.get_mut(&key) else {
            return;
        };

        entry.count -= 1;
        if entry.count == 0 {
            let baseline = entry.baseline;
            overrides.remove(&key);
            self.set_endpoint_timeout(key, baseline);
        }
    }

    /// Send a request and return the raw response, whatever its status
    pub async fn execute(&self, key: EndpointKey, request: SolrRequest) -> SolrResult<Response> {
        let client = self.ensure_connected().await?;
        if key == EndpointKey::Server {
            self.attach_server_endpoint().await?;
        }

        let endpoint = self
            .endpoint(key)
            .ok_or_else(|| SolrError::internal(format!("Endpoint {} is not registered", key)))?;

        let uri = endpoint.handler_uri(&request.handler);
        let timeout = request.timeout.unwrap_or(endpoint.timeout);

        debug!(
            endpoint = %key,
            handler = %request.handler,
            method = %request.method,
            timeout_ms = timeout.as_millis() as u64,
            "Dispatching Solr request"
        );

        let mut builder = client
            .request(request.method.clone(), &uri)
            .header(ACCEPT, "application/json")
            .timeout(timeout);

        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }

        if let Some((username, password)) = &self.credentials {
            builder = builder.basic_auth(username, Some(password));
        }

        builder = match request.body {
            Some(RequestBody::Json(body)) => builder.header(CONTENT_TYPE, "application/json").body(body),
            Some(RequestBody::Form(params)) => builder.form(&params),
            None => builder,
        };

        builder
            .send()
            .await
            .map_err(|e| SolrError::transport(&endpoint.base_uri, e))
    }

    /// Send a request, require a success status and decode the JSON body
    pub async fn execute_json(&self, key: EndpointKey, request: SolrRequest) -> SolrResult<Value> {
        let base_uri = self.endpoint_base_uri(key);
        let response = self.execute(key, request).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SolrError::transport(&base_uri, e))?;

        if !status.is_success() {
            return Err(status_error(&base_uri, status.as_u16(), &body));
        }

        decode_json(&base_uri, &body)
    }

    /// Send a request, require a success status and return the raw body
    pub async fn execute_bytes(&self, key: EndpointKey, request: SolrRequest) -> SolrResult<Bytes> {
        let base_uri = self.endpoint_base_uri(key);
        let response = self.execute(key, request).await?;
        let status = response.status();

        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!("Failed to read error body from {}: {}", base_uri, e);
                    String::new()
                }
            };
            return Err(status_error(&base_uri, status.as_u16(), &body));
        }

        response
            .bytes()
            .await
            .map_err(|e| SolrError::transport(&base_uri, e))
    }
}

/// Restores an endpoint timeout on drop, on every exit path
pub struct TimeoutOverride<'a> {
    connection: &'a ConnectionManager,
    key: EndpointKey,
    /// False when the endpoint wasn't registered and nothing was replaced
    active: bool,
}

impl Drop for TimeoutOverride<'_> {
    fn drop(&mut self) {
        if self.active {
            self.connection.release_override(self.key);
        }
    }
}

pub(crate) fn decode_json(base_uri: &str, body: &str) -> SolrResult<Value> {
    serde_json::from_str(body).map_err(|e| {
        SolrError::protocol(format!("Invalid JSON response from {}: {}", base_uri, e))
    })
}

/// Error for a non-success status, carrying Solr's own message when present
pub(crate) fn status_error(base_uri: &str, status: u16, body: &str) -> SolrError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/msg").and_then(Value::as_str).map(str::to_string));

    match detail {
        Some(msg) => SolrError::Unreachable {
            endpoint: base_uri.to_string(),
            message: format!("HTTP status {}: {}", status, msg),
            status: Some(status),
            source: None,
        },
        None => SolrError::http_status(base_uri, status),
    }
}
