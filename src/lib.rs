//! Solr connector - session and request dispatch for Apache Solr
//!
//! A connector owns the connection to one core and, on demand, to the server
//! hosting it. On top of that it provides cached metadata retrieval, version
//! negotiation, liveness probes, a generic REST pipeline and core statistics.
//! Variants are selected by configuration and share one [`ConnectorBase`].
pub mod cache;
pub mod config;
pub mod connectors;
pub mod core;
pub mod error;
pub mod health;
pub mod query;
pub mod stats;
pub mod utils;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{create_store, CacheKey, FileStore, MemoryStore, MetadataCache, MetadataStore};
pub use config::{ConnectorConfig, ConnectorKind, EndpointConfig, HttpMethod, Scheme};
pub use connectors::{create_connector, BasicAuthConnector, Connector, ConnectorBase, Setting, StandardConnector};
pub use crate::core::{EndpointKey, RestMethod};
pub use error::{ErrorSeverity, SolrError, SolrResult};
pub use health::{HealthCheckManager, HealthStatus};
pub use query::{QueryHelper, SelectQuery, UpdateQuery};
pub use stats::StatsSummary;

/// Build the configured connector together with its configured metadata store
pub fn connector_from_config(config: &ConnectorConfig) -> SolrResult<Box<dyn Connector>> {
    let store = create_store(&config.cache);
    create_connector(config, store)
}
