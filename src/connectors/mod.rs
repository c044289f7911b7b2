/// Connector variants selectable by configuration
///
/// Every variant wraps a [`ConnectorBase`]; the [`Connector`] trait
/// forwards to it, so a variant only decides how the base is built and how
/// it describes itself.
pub mod base;
pub mod basic_auth;
pub mod standard;

pub use base::ConnectorBase;
pub use basic_auth::BasicAuthConnector;
pub use standard::StandardConnector;

use crate::cache::MetadataStore;
use crate::config::{ConnectorConfig, ConnectorKind};
use crate::core::{EndpointKey, RestMethod};
use crate::error::SolrResult;
use crate::health::HealthStatus;
use crate::query::{SelectQuery, UpdateQuery};
use crate::stats::StatsSummary;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Environment variable holding the externally visible host name
pub const PUBLIC_HOST_ENV: &str = "SERVER_NAME";

/// A label/value pair describing a configured connector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub label: String,
    pub value: String,
}

impl Setting {
    pub fn new<L: Into<String>, V: Into<String>>(label: L, value: V) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Capability set of a Solr connector
#[async_trait]
pub trait Connector: Send + Sync {
    fn base(&self) -> &ConnectorBase;

    fn kind(&self) -> ConnectorKind;

    fn label(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn view_settings(&self) -> Vec<Setting> {
        self.base().view_settings(self.label())
    }

    async fn connect(&self) -> SolrResult<()> {
        self.base().connect().await
    }

    async fn attach_server_endpoint(&self) -> SolrResult<()> {
        self.base().attach_server_endpoint().await
    }

    fn server_uri(&self) -> String {
        self.base().server_uri()
    }

    fn core_uri(&self) -> String {
        self.base().core_uri()
    }

    fn server_link(&self) -> String {
        self.base().server_link()
    }

    fn core_link(&self) -> String {
        self.base().core_link()
    }

    async fn get_server_info(&self, reset: bool) -> SolrResult<Value> {
        self.base().get_server_info(reset).await
    }

    async fn get_core_info(&self, reset: bool) -> SolrResult<Value> {
        self.base().get_core_info(reset).await
    }

    async fn get_luke(&self) -> SolrResult<Value> {
        self.base().get_luke().await
    }

    async fn get_solr_version(&self, force_auto_detect: bool) -> String {
        self.base().get_solr_version(force_auto_detect).await
    }

    async fn get_solr_major_version(&self, version: &str) -> String {
        self.base().get_solr_major_version(version).await
    }

    async fn get_solr_branch(&self, version: &str) -> String {
        self.base().get_solr_branch(version).await
    }

    async fn get_lucene_match_version(&self, version: &str) -> String {
        self.base().get_lucene_match_version(version).await
    }

    async fn get_schema_version_string(&self, reset: bool) -> SolrResult<String> {
        self.base().get_schema_version_string(reset).await
    }

    async fn get_schema_version(&self, reset: bool) -> SolrResult<String> {
        self.base().get_schema_version(reset).await
    }

    async fn ping_core(&self) -> HealthStatus {
        self.base().ping_core().await
    }

    async fn ping_server(&self) -> HealthStatus {
        self.base().ping_server().await
    }

    async fn get_stats_summary(&self) -> SolrResult<StatsSummary> {
        self.base().get_stats_summary().await
    }

    async fn rest_request(
        &self,
        key: EndpointKey,
        path: &str,
        method: RestMethod,
        json_body: Option<&str>,
    ) -> SolrResult<Value> {
        self.base().rest_request(key, path, method, json_body).await
    }

    async fn core_rest_get(&self, path: &str) -> SolrResult<Value> {
        self.base().core_rest_get(path).await
    }

    async fn core_rest_post(&self, path: &str, json_body: &str) -> SolrResult<Value> {
        self.base().core_rest_post(path, json_body).await
    }

    async fn server_rest_get(&self, path: &str) -> SolrResult<Value> {
        self.base().server_rest_get(path).await
    }

    async fn server_rest_post(&self, path: &str, json_body: &str) -> SolrResult<Value> {
        self.base().server_rest_post(path, json_body).await
    }

    async fn search(&self, query: &SelectQuery) -> SolrResult<Value> {
        self.base().search(query).await
    }

    async fn update(&self, update: &UpdateQuery) -> SolrResult<Value> {
        self.base().update(update).await
    }

    async fn optimize(&self) -> SolrResult<Value> {
        self.base().optimize().await
    }

    async fn reload_core(&self) -> SolrResult<bool> {
        self.base().reload_core().await
    }
}

/// Build the connector variant selected by configuration
pub fn create_connector(
    config: &ConnectorConfig,
    store: Arc<dyn MetadataStore>,
) -> SolrResult<Box<dyn Connector>> {
    config.validate()?;
    let public_host = std::env::var(PUBLIC_HOST_ENV).ok();

    let connector: Box<dyn Connector> = match config.connector {
        ConnectorKind::Standard => Box::new(
            StandardConnector::new(config.endpoint.clone(), store).with_public_host(public_host),
        ),
        ConnectorKind::BasicAuth => Box::new(
            BasicAuthConnector::new(config.endpoint.clone(), store).with_public_host(public_host),
        ),
    };

    Ok(connector)
}
