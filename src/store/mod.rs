use async_trait::async_trait;
use log::error;
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Key for the global collection of all votes, independent of the
/// election-definition collection.
pub const VOTES_KEY: &str = "votes";
pub const ELECTIONS_KEY: &str = "elections";

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> StoreError {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> StoreError {
        StoreError::Serde(e)
    }
}

pub fn log_store_error(e: &StoreError) {
    error!("unexpected store error: {:?}", e);
}

/// Key-value persistence: whole JSON blobs, replaced as a unit on save.
/// `load` returns `None` for keys that were never saved or whose blob no
/// longer parses as JSON.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn save(&self, key: &str, value: Value) -> Result<(), StoreError>;
}
