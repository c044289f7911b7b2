/// Metadata caching for expensive administrative responses
///
/// Responses of info handlers are cached per (endpoint base URI, handler)
/// in an injected durable [`MetadataStore`] shared with other processes or
/// instances. The store is authoritative, so a refresh by any instance is
/// seen by all of them. The map owned by the connector instance only serves
/// payloads while the store can't be read. Concurrent writers may race on
/// the same key and the last writer wins.
pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::{CacheConfig, StoreKind};
use crate::core::{ConnectionManager, EndpointKey, SolrRequest};
use crate::error::{SolrError, SolrResult};
use async_trait::async_trait;
use fnv::{FnvHashMap, FnvHashSet};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Namespace key of the durable entry
pub const STATE_KEY: &str = "solr_connector.endpoint.data";

/// Composite cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub base_uri: String,
    pub handler: String,
}

impl CacheKey {
    pub fn new<B: Into<String>, H: Into<String>>(base_uri: B, handler: H) -> Self {
        Self {
            base_uri: base_uri.into(),
            handler: handler.into(),
        }
    }
}

/// Durable key-value store for decoded handler payloads
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> SolrResult<Option<Value>>;

    async fn set(&self, key: &CacheKey, payload: Value) -> SolrResult<()>;

    async fn invalidate(&self, key: &CacheKey) -> SolrResult<()>;
}

/// Build the durable store selected by configuration
pub fn create_store(config: &CacheConfig) -> Arc<dyn MetadataStore> {
    match (config.store, config.path.as_deref()) {
        (StoreKind::File, Some(path)) => Arc::new(FileStore::new(path)),
        (StoreKind::File, None) => {
            warn!("File store configured without a path, falling back to memory");
            Arc::new(MemoryStore::new())
        }
        (StoreKind::Memory, _) => Arc::new(MemoryStore::new()),
    }
}

/// Two-tier cache in front of the info handlers of one connector
pub struct MetadataCache {
    store: Arc<dyn MetadataStore>,
    local: Mutex<FnvHashMap<CacheKey, Value>>,
    /// Handlers that already failed in this process
    failed: Mutex<FnvHashSet<CacheKey>>,
}

impl MetadataCache {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            local: Mutex::new(FnvHashMap::default()),
            failed: Mutex::new(FnvHashSet::default()),
        }
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    /// Return the payload of `handler` on the given endpoint.
    ///
    /// Without `reset` the payload in the durable store is returned without
    /// any network call. With `reset` the handler is always queried again. A handler
    /// that failed once in this process is not queried again until
    /// [`reset_failures`](Self::reset_failures) is called.
    pub async fn get_data_from_handler(
        &self,
        connection: &ConnectionManager,
        key: EndpointKey,
        handler: &str,
        reset: bool,
    ) -> SolrResult<Value> {
        connection.ensure_connected().await?;
        if key == EndpointKey::Server {
            connection.attach_server_endpoint().await?;
        }

        let cache_key = CacheKey::new(connection.endpoint_base_uri(key), handler);

        if self.has_failed(&cache_key) {
            return Err(SolrError::unreachable(
                &cache_key.base_uri,
                format!("handler {} already failed in this process", handler),
            ));
        }

        if !reset {
            match self.store.get(&cache_key).await {
                Ok(Some(payload)) => {
                    debug!("Using stored {} data of {}", handler, cache_key.base_uri);
                    self.local_insert(cache_key, payload.clone());
                    return Ok(payload);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to read metadata store: {}", e);
                    if let Some(payload) = self.local_get(&cache_key) {
                        return Ok(payload);
                    }
                }
            }
        }

        let request = SolrRequest::get(handler).param("wt", "json");
        match connection.execute_json(key, request).await {
            Ok(payload) => {
                if let Err(e) = self.store.set(&cache_key, payload.clone()).await {
                    warn!("Failed to write metadata store: {}", e);
                }
                self.local_insert(cache_key, payload.clone());
                Ok(payload)
            }
            Err(e) => {
                warn!("Fetching {} from {} failed: {}", handler, cache_key.base_uri, e);
                self.failed
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(cache_key);
                Err(e)
            }
        }
    }

    /// Drop a cached payload from both tiers
    pub async fn invalidate(&self, key: &CacheKey) -> SolrResult<()> {
        self.local
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        self.store.invalidate(key).await
    }

    /// Allow handlers that failed earlier to be queried again
    pub fn reset_failures(&self) {
        self.failed.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn has_failed(&self, key: &CacheKey) -> bool {
        self.failed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }

    fn local_get(&self, key: &CacheKey) -> Option<Value> {
        self.local
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn local_insert(&self, key: CacheKey, payload: Value) {
        self.local
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CORE_INFO_HANDLER, SERVER_INFO_HANDLER};
    use crate::test_support::{core_info, mock_config};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/admin/system"))
            .and(query_param("wt", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(core_info("8.11.2", "drupal-4.2")))
            .expect(1)
            .mount(&server)
            .await;

        let connection = ConnectionManager::new(mock_config(&server));
        let cache = MetadataCache::new(Arc::new(MemoryStore::new()));

        let first = cache
            .get_data_from_handler(&connection, EndpointKey::Core, CORE_INFO_HANDLER, false)
            .await
            .unwrap();
        let second = cache
            .get_data_from_handler(&connection, EndpointKey::Core, CORE_INFO_HANDLER, false)
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_reset_always_refetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/admin/info/system"))
            .respond_with(ResponseTemplate::new(200).set_body_json(core_info("9.4.0", "x-1")))
            .expect(3)
            .mount(&server)
            .await;

        let connection = ConnectionManager::new(mock_config(&server));
        let cache = MetadataCache::new(Arc::new(MemoryStore::new()));

        for reset in [false, true, true] {
            cache
                .get_data_from_handler(&connection, EndpointKey::Server, SERVER_INFO_HANDLER, reset)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_durable_store_is_shared_between_instances() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/admin/luke"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"index": {"numDocs": 12}})))
            .expect(1)
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        let connection = ConnectionManager::new(mock_config(&server));

        let first = MetadataCache::new(Arc::new(store.clone()));
        first
            .get_data_from_handler(&connection, EndpointKey::Core, "admin/luke", false)
            .await
            .unwrap();

        let other_connection = ConnectionManager::new(mock_config(&server));
        let second = MetadataCache::new(Arc::new(store.clone()));
        let payload = second
            .get_data_from_handler(&other_connection, EndpointKey::Core, "admin/luke", false)
            .await
            .unwrap();

        assert_eq!(payload["index"]["numDocs"], 12);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_refresh_by_one_instance_is_seen_by_another() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/admin/system"))
            .respond_with(ResponseTemplate::new(200).set_body_json(core_info("8.11.2", "drupal-4.2")))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/admin/system"))
            .respond_with(ResponseTemplate::new(200).set_body_json(core_info("9.4.0", "drupal-4.3")))
            .expect(1)
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        let first_connection = ConnectionManager::new(mock_config(&server));
        let first = MetadataCache::new(Arc::new(store.clone()));
        let second_connection = ConnectionManager::new(mock_config(&server));
        let second = MetadataCache::new(Arc::new(store.clone()));

        let before = first
            .get_data_from_handler(&first_connection, EndpointKey::Core, CORE_INFO_HANDLER, false)
            .await
            .unwrap();
        assert_eq!(before["lucene"]["solr-spec-version"], "8.11.2");

        second
            .get_data_from_handler(&second_connection, EndpointKey::Core, CORE_INFO_HANDLER, true)
            .await
            .unwrap();

        let after = first
            .get_data_from_handler(&first_connection, EndpointKey::Core, CORE_INFO_HANDLER, false)
            .await
            .unwrap();
        assert_eq!(after["lucene"]["solr-spec-version"], "9.4.0");
    }

    /// Store that can't be read or written
    struct BrokenStore;

    #[async_trait]
    impl MetadataStore for BrokenStore {
        async fn get(&self, _key: &CacheKey) -> SolrResult<Option<Value>> {
            Err(SolrError::internal("store offline"))
        }

        async fn set(&self, _key: &CacheKey, _payload: Value) -> SolrResult<()> {
            Err(SolrError::internal("store offline"))
        }

        async fn invalidate(&self, _key: &CacheKey) -> SolrResult<()> {
            Err(SolrError::internal("store offline"))
        }
    }

    #[tokio::test]
    async fn test_local_copy_is_used_when_store_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/admin/system"))
            .respond_with(ResponseTemplate::new(200).set_body_json(core_info("8.11.2", "drupal-4.2")))
            .expect(1)
            .mount(&server)
            .await;

        let connection = ConnectionManager::new(mock_config(&server));
        let cache = MetadataCache::new(Arc::new(BrokenStore));

        for _ in 0..2 {
            let payload = cache
                .get_data_from_handler(&connection, EndpointKey::Core, CORE_INFO_HANDLER, false)
                .await
                .unwrap();
            assert_eq!(payload["lucene"]["solr-spec-version"], "8.11.2");
        }
    }

    #[tokio::test]
    async fn test_failures_are_not_cached_nor_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/admin/system"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        let connection = ConnectionManager::new(mock_config(&server));
        let cache = MetadataCache::new(Arc::new(store.clone()));

        let err = cache
            .get_data_from_handler(&connection, EndpointKey::Core, CORE_INFO_HANDLER, false)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert!(err.to_string().contains("/solr/core1/"));

        // Guard short-circuits even when a reset is requested
        let err = cache
            .get_data_from_handler(&connection, EndpointKey::Core, CORE_INFO_HANDLER, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already failed"));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_reset_failures_allows_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/admin/system"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/admin/system"))
            .respond_with(ResponseTemplate::new(200).set_body_json(core_info("8.0.0", "a-1")))
            .mount(&server)
            .await;

        let connection = ConnectionManager::new(mock_config(&server));
        let cache = MetadataCache::new(Arc::new(MemoryStore::new()));

        assert!(cache
            .get_data_from_handler(&connection, EndpointKey::Core, CORE_INFO_HANDLER, false)
            .await
            .is_err());

        cache.reset_failures();
        let payload = cache
            .get_data_from_handler(&connection, EndpointKey::Core, CORE_INFO_HANDLER, false)
            .await
            .unwrap();
        assert_eq!(payload["lucene"]["solr-spec-version"], "8.0.0");
    }

    #[tokio::test]
    async fn test_invalidate_drops_both_tiers() {
        let store = MemoryStore::new();
        let cache = MetadataCache::new(Arc::new(store.clone()));
        let key = CacheKey::new("http://localhost:8983/solr/", SERVER_INFO_HANDLER);

        store.set(&key, serde_json::json!({"a": 1})).await.unwrap();
        cache.local_insert(key.clone(), serde_json::json!({"a": 1}));

        cache.invalidate(&key).await.unwrap();
        assert!(cache.local_get(&key).is_none());
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[test]
    fn test_create_store() {
        let memory = create_store(&CacheConfig::default());
        let key = CacheKey::new("http://h:1/", "admin/system");
        assert!(tokio_test::block_on(memory.get(&key)).unwrap().is_none());

        let dir = tempfile::tempdir().unwrap();
        let file = create_store(&CacheConfig {
            store: StoreKind::File,
            path: Some(dir.path().join("state.json").to_string_lossy().into_owned()),
        });
        tokio_test::block_on(file.set(&key, serde_json::json!(true))).unwrap();
        assert_eq!(
            tokio_test::block_on(file.get(&key)).unwrap(),
            Some(serde_json::json!(true))
        );
    }
}
