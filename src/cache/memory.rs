/// Process-wide in-memory metadata store
use super::{CacheKey, MetadataStore};
use crate::error::SolrResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// base URI -> handler -> payload
type EndpointData = HashMap<String, HashMap<String, Value>>;

/// In-memory store; clones share the same entries
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<EndpointData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached (base URI, handler) payloads
    pub async fn len(&self) -> usize {
        self.entries.read().await.values().map(HashMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy of the whole mapping
    pub async fn snapshot(&self) -> EndpointData {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> SolrResult<Option<Value>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&key.base_uri)
            .and_then(|handlers| handlers.get(&key.handler))
            .cloned())
    }

    async fn set(&self, key: &CacheKey, payload: Value) -> SolrResult<()> {
        let mut entries = self.entries.write().await;
        entries
            .entry(key.base_uri.clone())
            .or_default()
            .insert(key.handler.clone(), payload);
        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> SolrResult<()> {
        let mut entries = self.entries.write().await;
        if let Some(handlers) = entries.get_mut(&key.base_uri) {
            handlers.remove(&key.handler);
            if handlers.is_empty() {
                entries.remove(&key.base_uri);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_keys_do_not_collide_across_servers() {
        let store = MemoryStore::new();
        let a = CacheKey::new("http://solr-a:8983/solr/core1/", "admin/system");
        let b = CacheKey::new("http://solr-b:8983/solr/core1/", "admin/system");

        store.set(&a, json!({"server": "a"})).await.unwrap();
        store.set(&b, json!({"server": "b"})).await.unwrap();

        assert_eq!(store.get(&a).await.unwrap(), Some(json!({"server": "a"})));
        assert_eq!(store.get(&b).await.unwrap(), Some(json!({"server": "b"})));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let store = MemoryStore::new();
        let key = CacheKey::new("http://localhost:8983/solr/", "admin/info/system");

        store.set(&key, json!(1)).await.unwrap();
        store.set(&key, json!(2)).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let store = MemoryStore::new();
        let key = CacheKey::new("http://localhost:8983/solr/", "admin/info/system");

        store.set(&key, json!({})).await.unwrap();
        store.invalidate(&key).await.unwrap();
        assert!(store.is_empty().await);
        assert!(store.snapshot().await.is_empty());

        // Unknown keys are fine
        store.invalidate(&key).await.unwrap();
    }
}
