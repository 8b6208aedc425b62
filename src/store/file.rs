use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use log::warn;
use serde_json::Value;
use tokio::fs;

use super::{BlobStore, StoreError};

/// One JSON file per key under a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> FileStore {
        FileStore { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl BlobStore for FileStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let bytes = match fs::read(self.path_for(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("unparseable blob for key [{}], treating as absent: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec(&value)?;
        // Write through a temp file so a failed save cannot clobber the
        // previous blob.
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, self.path_for(key)).await?;
        Ok(())
    }
}
