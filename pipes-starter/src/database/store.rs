// Config store
//
// Key-value storage of serialized configs keyed by their content hash. Implementations must
// reject a second insert for the same hash with `StoreError::Duplicate`; callers treat that as
// success.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A record with this hash already exists.
    #[error("Config already stored")]
    Duplicate,
    #[error("Storage failure: {0}")]
    Backend(String),
}

/// Storage seam for the save/load handlers.
/// Production uses Postgres; tests and service-less runs use the in-memory store.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Insert a new record. Fails with `Duplicate` when `config_hash` is taken.
    async fn insert(&self, config_hash: &str, json_config: &str) -> Result<(), StoreError>;

    async fn fetch(&self, config_hash: &str) -> Result<Option<String>, StoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Process-local store. Insert-if-absent happens under one lock, so racing inserts of the same
/// hash resolve to exactly one success.
#[derive(Default)]
pub struct MemoryConfigStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn insert(&self, config_hash: &str, json_config: &str) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
        if records.contains_key(config_hash) {
            return Err(StoreError::Duplicate);
        }
        records.insert(config_hash.to_string(), json_config.to_string());
        Ok(())
    }

    async fn fetch(&self, config_hash: &str) -> Result<Option<String>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
        Ok(records.get(config_hash).cloned())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn insert_then_fetch() {
        let store = MemoryConfigStore::new();
        store.insert("abc", r#"{"a":1}"#).await.unwrap();
        assert_eq!(
            store.fetch("abc").await.unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );
        assert!(store.fetch("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_insert_is_duplicate() {
        let store = MemoryConfigStore::new();
        store.insert("abc", "{}").await.unwrap();
        assert_eq!(store.insert("abc", "{}").await, Err(StoreError::Duplicate));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_racers_produce_exactly_one_insert() {
        // INTENT: the uniqueness check is the only synchronization racers rely on.
        let store = Arc::new(MemoryConfigStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.insert("same-hash", r#"{"a":1}"#).await
            }));
        }

        let mut ok = 0;
        let mut dup = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(()) => ok += 1,
                Err(StoreError::Duplicate) => dup += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(ok, 1, "exactly one racer should win");
        assert_eq!(dup, 15);
        assert_eq!(store.len(), 1);
    }
}
