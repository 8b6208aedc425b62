use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{BlobStore, StoreError};

/// Ephemeral backend; also the substitute store for tests.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Seed a raw blob, bypassing the typed layers above the store.
    pub async fn put_raw(&self, key: &str, value: Value) {
        self.blobs.lock().await.insert(key.to_owned(), value);
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.blobs.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.blobs.lock().await.insert(key.to_owned(), value);
        Ok(())
    }
}
