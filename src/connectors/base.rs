/// Connector engine shared by every variant
use super::Setting;
use crate::cache::{MetadataCache, MetadataStore};
use crate::config::{EndpointConfig, FieldError, ConfigError, HttpMethod};
use crate::core::{
    ConnectionManager, EndpointKey, RestMethod, SolrRequest, CORES_HANDLER, CORE_INFO_HANDLER,
    LUKE_HANDLER, SELECT_HANDLER, SERVER_INFO_HANDLER, UPDATE_HANDLER,
};
use crate::error::{SolrError, SolrResult};
use crate::query::{encoded_len, QueryHelper, SelectQuery, UpdateQuery, MAX_GET_QUERY_LENGTH};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::info;

/// Connection, cache and lazily built helpers of one connector instance
pub struct ConnectorBase {
    connection: ConnectionManager,
    cache: MetadataCache,
    query_helper: OnceLock<QueryHelper>,
    update_template: OnceLock<UpdateQuery>,
}

impl ConnectorBase {
    pub fn new(
        config: EndpointConfig,
        credentials: Option<(String, String)>,
        store: Arc<dyn MetadataStore>,
    ) -> Self {
        let mut connection = ConnectionManager::new(config);
        if let Some((username, password)) = credentials {
            connection = connection.with_credentials(username, password);
        }

        Self {
            connection,
            cache: MetadataCache::new(store),
            query_helper: OnceLock::new(),
            update_template: OnceLock::new(),
        }
    }

    pub fn with_public_host(mut self, host: Option<String>) -> Self {
        self.connection = self.connection.with_public_host(host);
        self
    }

    pub fn config(&self) -> &EndpointConfig {
        self.connection.config()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub async fn connect(&self) -> SolrResult<()> {
        self.connection.ensure_connected().await.map(|_| ())
    }

    pub async fn attach_server_endpoint(&self) -> SolrResult<()> {
        self.connection.attach_server_endpoint().await
    }

    pub fn server_uri(&self) -> String {
        self.connection.resolve_base_uri(EndpointKey::Server)
    }

    pub fn core_uri(&self) -> String {
        self.connection.resolve_base_uri(EndpointKey::Core)
    }

    /// Link to the admin UI of the server
    pub fn server_link(&self) -> String {
        self.server_uri()
    }

    /// Link to the core page of the admin UI
    pub fn core_link(&self) -> String {
        format!("{}#/{}", self.server_uri(), self.config().core)
    }

    pub async fn get_data_from_handler(&self, key: EndpointKey, handler: &str, reset: bool) -> SolrResult<Value> {
        self.cache
            .get_data_from_handler(&self.connection, key, handler, reset)
            .await
    }

    pub async fn get_server_info(&self, reset: bool) -> SolrResult<Value> {
        self.get_data_from_handler(EndpointKey::Server, SERVER_INFO_HANDLER, reset)
            .await
    }

    pub async fn get_core_info(&self, reset: bool) -> SolrResult<Value> {
        self.get_data_from_handler(EndpointKey::Core, CORE_INFO_HANDLER, reset)
            .await
    }

    /// Index statistics; always fetched fresh
    pub async fn get_luke(&self) -> SolrResult<Value> {
        self.get_data_from_handler(EndpointKey::Core, LUKE_HANDLER, true)
            .await
    }

    pub async fn rest_request(
        &self,
        key: EndpointKey,
        path: &str,
        method: RestMethod,
        json_body: Option<&str>,
    ) -> SolrResult<Value> {
        self.connection.rest_request(key, path, method, json_body).await
    }

    pub async fn core_rest_get(&self, path: &str) -> SolrResult<Value> {
        self.rest_request(EndpointKey::Core, path, RestMethod::Get, None).await
    }

    pub async fn core_rest_post(&self, path: &str, json_body: &str) -> SolrResult<Value> {
        self.rest_request(EndpointKey::Core, path, RestMethod::Post, Some(json_body))
            .await
    }

    pub async fn server_rest_get(&self, path: &str) -> SolrResult<Value> {
        self.rest_request(EndpointKey::Server, path, RestMethod::Get, None).await
    }

    pub async fn server_rest_post(&self, path: &str, json_body: &str) -> SolrResult<Value> {
        self.rest_request(EndpointKey::Server, path, RestMethod::Post, Some(json_body))
            .await
    }

    /// Lazily built query helper of this instance
    pub fn query_helper(&self) -> &QueryHelper {
        self.query_helper.get_or_init(QueryHelper::new)
    }

    /// Fresh update builder, cloned from this instance's template
    pub fn update_query(&self) -> UpdateQuery {
        self.update_template.get_or_init(UpdateQuery::new).clone()
    }

    pub fn select_query(&self) -> SelectQuery {
        SelectQuery::default()
    }

    /// Run a select query with the query timeout
    pub async fn search(&self, query: &SelectQuery) -> SolrResult<Value> {
        let params = query.to_params();
        let use_post = match self.config().http_method {
            HttpMethod::Get => false,
            HttpMethod::Post => true,
            HttpMethod::Auto => encoded_len(&params) > MAX_GET_QUERY_LENGTH,
        };

        let request = if use_post {
            SolrRequest::post_form(SELECT_HANDLER, params)
        } else {
            SolrRequest::get(SELECT_HANDLER).params(params)
        };

        self.connection
            .execute_json(EndpointKey::Core, request.with_timeout(self.config().query_timeout()))
            .await
    }

    /// Send an update request with the index timeout
    pub async fn update(&self, update: &UpdateQuery) -> SolrResult<Value> {
        let request = SolrRequest::post_json(UPDATE_HANDLER, update.to_json()?)
            .param("wt", "json")
            .with_timeout(self.config().index_timeout());

        self.connection.execute_json(EndpointKey::Core, request).await
    }

    /// Optimize the index with the optimize timeout
    pub async fn optimize(&self) -> SolrResult<Value> {
        let body = self.update_query().optimize(None).to_json()?;
        let request = SolrRequest::post_json(UPDATE_HANDLER, body)
            .param("wt", "json")
            .with_timeout(self.config().optimize_timeout());

        self.connection.execute_json(EndpointKey::Core, request).await
    }

    /// Reload the configured core through the server's core admin handler
    pub async fn reload_core(&self) -> SolrResult<bool> {
        let core = self.config().core.clone();
        if core.is_empty() {
            return Err(SolrError::Config(ConfigError::ValidationError(vec![FieldError::new(
                "core",
                "No core is configured to reload.",
            )])));
        }

        let request = SolrRequest::get(CORES_HANDLER)
            .param("action", "RELOAD")
            .param("core", core.as_str())
            .param("wt", "json")
            .with_timeout(self.config().optimize_timeout());

        let payload = self.connection.execute_json(EndpointKey::Server, request).await?;
        let reloaded = payload
            .pointer("/responseHeader/status")
            .and_then(Value::as_i64)
            == Some(0);

        if reloaded {
            info!("Reloaded Solr core {}", core);
        }
        Ok(reloaded)
    }

    /// Settings shown next to a configured server
    pub fn view_settings(&self, label: &str) -> Vec<Setting> {
        let config = self.config();
        let version = if config.solr_version.is_empty() {
            "auto-detect".to_string()
        } else {
            config.solr_version.clone()
        };

        vec![
            Setting::new("Connector", label),
            Setting::new("Solr server URI", self.server_uri()),
            Setting::new("Solr core URI", self.core_link()),
            Setting::new("Configured Solr version", version),
            Setting::new("HTTP method", config.http_method.as_str()),
        ]
    }
}
