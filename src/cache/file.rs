/// Metadata store persisted as a JSON document on disk
///
/// The document holds a single entry under [`STATE_KEY`] mapping base URIs
/// to handler payloads. Writes are read-modify-write without locking, so
/// processes racing on the same file may drop each other's entries; the
/// next fetch repopulates them.
use super::{CacheKey, MetadataStore, STATE_KEY};
use crate::error::{SolrError, SolrResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> SolrResult<Map<String, Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(SolrError::internal(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(mut document)) => match document.remove(STATE_KEY) {
                Some(Value::Object(data)) => Ok(data),
                _ => Ok(Map::new()),
            },
            Ok(_) | Err(_) => {
                warn!("Ignoring unreadable metadata store {}", self.path.display());
                Ok(Map::new())
            }
        }
    }

    async fn save(&self, data: Map<String, Value>) -> SolrResult<()> {
        let mut document = Map::new();
        document.insert(STATE_KEY.to_string(), Value::Object(data));

        let content = serde_json::to_string_pretty(&Value::Object(document))
            .map_err(|e| SolrError::internal(format!("Failed to serialize metadata: {}", e)))?;

        // Write next to the target and rename so readers never see half a file
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| SolrError::internal(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| SolrError::internal(format!("Failed to write {}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl MetadataStore for FileStore {
    async fn get(&self, key: &CacheKey) -> SolrResult<Option<Value>> {
        let data = self.load().await?;
        Ok(data
            .get(&key.base_uri)
            .and_then(|handlers| handlers.get(&key.handler))
            .cloned())
    }

    async fn set(&self, key: &CacheKey, payload: Value) -> SolrResult<()> {
        let mut data = self.load().await?;
        let handlers = data
            .entry(key.base_uri.clone())
            .or_insert_with(|| Value::Object(Map::new()));

        if !handlers.is_object() {
            *handlers = Value::Object(Map::new());
        }
        if let Value::Object(handlers) = handlers {
            handlers.insert(key.handler.clone(), payload);
        }

        self.save(data).await
    }

    async fn invalidate(&self, key: &CacheKey) -> SolrResult<()> {
        let mut data = self.load().await?;
        let emptied = match data.get_mut(&key.base_uri) {
            Some(Value::Object(handlers)) => {
                if handlers.remove(&key.handler).is_none() {
                    return Ok(());
                }
                handlers.is_empty()
            }
            _ => return Ok(()),
        };

        if emptied {
            data.remove(&key.base_uri);
        }
        self.save(data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));
        let key = CacheKey::new("http://localhost:8983/solr/", "admin/info/system");
        assert_eq!(store.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let key = CacheKey::new("http://localhost:8983/solr/core1/", "admin/system");

        FileStore::new(&path)
            .set(&key, json!({"core": {"schema": "drupal-4.2"}}))
            .await
            .unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get(&key).await.unwrap(),
            Some(json!({"core": {"schema": "drupal-4.2"}}))
        );

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw[STATE_KEY]["http://localhost:8983/solr/core1/"]["admin/system"].is_object());
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.json"));
        let kept = CacheKey::new("http://localhost:8983/solr/", "admin/info/system");
        let dropped = CacheKey::new("http://localhost:8983/solr/", "admin/ping");

        store.set(&kept, json!(1)).await.unwrap();
        store.set(&dropped, json!(2)).await.unwrap();
        store.invalidate(&dropped).await.unwrap();

        assert_eq!(store.get(&kept).await.unwrap(), Some(json!(1)));
        assert_eq!(store.get(&dropped).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        let key = CacheKey::new("http://localhost:8983/solr/", "admin/info/system");
        assert_eq!(store.get(&key).await.unwrap(), None);

        store.set(&key, json!("ok")).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(json!("ok")));
    }
}
