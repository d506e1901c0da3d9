//! An in-memory `PayloadStore`, used by this workspace's own tests.
//!
//! Not a shipped backend — spec.md §1 scopes concrete adapters (file,
//! Redis, S3, relational) out as "adapter contracts only." This one
//! exists purely so `offload-processor`'s tests don't need a real
//! backend to exercise the offload path.

use crate::store::{PayloadStore, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

/// Grounded on `tower-cache::store::CacheStore`'s `Arc<Mutex<HashMap<..>>>`
/// shape, minus LRU eviction: a payload store has no size bound of its
/// own, callers decide what to delete.
pub struct InMemoryStore {
    store_id: String,
    entries: Mutex<HashMap<String, Bytes>>,
}

impl InMemoryStore {
    pub fn new(store_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl PayloadStore for InMemoryStore {
    fn store_id(&self) -> &str {
        &self.store_id
    }

    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        _content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        self.entries.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.lock().unwrap().contains_key(key))
    }
}
