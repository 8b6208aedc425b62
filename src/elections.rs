use std::sync::Arc;

use log::warn;
use tokio::sync::Mutex;

use crate::model::Election;
use crate::store::{self, BlobStore, StoreError, ELECTIONS_KEY};

/// Election definitions, persisted as one blob like the vote collection.
/// Admin edits are read-modify-write under `write_lock`.
#[derive(Clone)]
pub struct ElectionStore {
    store: Arc<dyn BlobStore>,
    write_lock: Arc<Mutex<()>>,
}

impl ElectionStore {
    pub fn new(store: Arc<dyn BlobStore>) -> ElectionStore {
        ElectionStore {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn try_load_all(&self) -> Result<Vec<Election>, StoreError> {
        let blob = self.store.load(ELECTIONS_KEY).await?;
        Ok(match blob {
            None => Vec::new(),
            Some(value) => match serde_json::from_value(value) {
                Ok(elections) => elections,
                Err(e) => {
                    warn!("election collection does not deserialize, treating as empty: {}", e);
                    Vec::new()
                }
            },
        })
    }

    async fn load_all(&self) -> Vec<Election> {
        self.try_load_all().await.unwrap_or_else(|e| {
            store::log_store_error(&e);
            Vec::new()
        })
    }

    async fn save_all(&self, elections: &[Election]) -> Result<(), StoreError> {
        let value = serde_json::to_value(elections)?;
        self.store.save(ELECTIONS_KEY, value).await
    }

    /// Newest first, like the admin dashboard lists them.
    pub async fn list(&self) -> Vec<Election> {
        let mut elections = self.load_all().await;
        elections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        elections
    }

    pub async fn find(&self, id: &str) -> Option<Election> {
        self.load_all().await.into_iter().find(|e| e.id == id)
    }

    pub async fn insert(&self, election: Election) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut elections = self.try_load_all().await?;
        elections.push(election);
        self.save_all(&elections).await
    }

    /// Replaces the stored election with the same id. Returns false when
    /// no such election exists.
    pub async fn replace(&self, election: Election) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut elections = self.try_load_all().await?;
        let slot = match elections.iter_mut().find(|e| e.id == election.id) {
            None => return Ok(false),
            Some(slot) => slot,
        };
        *slot = election;
        self.save_all(&elections).await?;
        Ok(true)
    }

    pub async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut elections = self.try_load_all().await?;
        let before = elections.len();
        elections.retain(|e| e.id != id);
        if elections.len() == before {
            return Ok(false);
        }
        self.save_all(&elections).await?;
        Ok(true)
    }
}
