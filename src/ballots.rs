use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::warn;
use tokio::sync::Mutex;

use crate::model::Vote;
use crate::store::{self, BlobStore, StoreError, VOTES_KEY};
use crate::util;

#[derive(Debug)]
pub enum CastVoteError {
    /// A vote already exists for this (election, voter) pair.
    DuplicateVote,
    Unexpected,
}

impl From<StoreError> for CastVoteError {
    fn from(e: StoreError) -> Self {
        store::log_store_error(&e);
        Self::Unexpected
    }
}

/// Records one vote per (election, voter) pair over the injected blob
/// store. The whole vote collection is one blob, read-modify-written
/// under `write_lock` so the duplicate check and the append cannot
/// interleave between writers.
#[derive(Clone)]
pub struct BallotStore {
    store: Arc<dyn BlobStore>,
    write_lock: Arc<Mutex<()>>,
}

impl BallotStore {
    pub fn new(store: Arc<dyn BlobStore>) -> BallotStore {
        BallotStore {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn try_load_all(&self) -> Result<Vec<Vote>, StoreError> {
        let blob = self.store.load(VOTES_KEY).await?;
        Ok(match blob {
            None => Vec::new(),
            Some(value) => match serde_json::from_value(value) {
                Ok(votes) => votes,
                Err(e) => {
                    warn!("vote collection does not deserialize, treating as empty: {}", e);
                    Vec::new()
                }
            },
        })
    }

    /// Queries never fail: a store that cannot be read counts as empty.
    async fn load_all(&self) -> Vec<Vote> {
        self.try_load_all().await.unwrap_or_else(|e| {
            store::log_store_error(&e);
            Vec::new()
        })
    }

    async fn save_all(&self, votes: &[Vote]) -> Result<(), StoreError> {
        let value = serde_json::to_value(votes)?;
        self.store.save(VOTES_KEY, value).await
    }

    /// Appends a fresh vote unless the voter already voted in this
    /// election. Selection completeness and candidate validity are the
    /// caller's responsibility; only the duplicate invariant is enforced
    /// here.
    pub async fn cast_vote(
        &self,
        election_id: &str,
        voter_id: &str,
        selections: HashMap<String, String>,
    ) -> Result<Vote, CastVoteError> {
        debug_assert!(!election_id.is_empty() && !voter_id.is_empty());

        let _guard = self.write_lock.lock().await;

        let mut votes = self.try_load_all().await?;
        let already_voted = votes
            .iter()
            .any(|v| v.election_id == election_id && v.voter_id == voter_id);
        if already_voted {
            return Err(CastVoteError::DuplicateVote);
        }

        let vote = Vote {
            id: util::new_id("vote"),
            election_id: election_id.to_owned(),
            voter_id: voter_id.to_owned(),
            votes: selections,
            timestamp: Utc::now(),
        };
        votes.push(vote.clone());
        self.save_all(&votes).await?;

        Ok(vote)
    }

    pub async fn has_voted(&self, election_id: &str, voter_id: &str) -> bool {
        self.load_all()
            .await
            .iter()
            .any(|v| v.election_id == election_id && v.voter_id == voter_id)
    }

    pub async fn get_vote(&self, election_id: &str, voter_id: &str) -> Option<Vote> {
        self.load_all()
            .await
            .into_iter()
            .find(|v| v.election_id == election_id && v.voter_id == voter_id)
    }

    /// All votes for the election; order is unspecified.
    pub async fn get_election_votes(&self, election_id: &str) -> Vec<Vote> {
        self.load_all()
            .await
            .into_iter()
            .filter(|v| v.election_id == election_id)
            .collect()
    }

    pub async fn get_total_votes(&self, election_id: &str) -> usize {
        self.get_election_votes(election_id).await.len()
    }

    /// Cascade hook for election deletion.
    pub async fn delete_election_votes(&self, election_id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut votes = self.try_load_all().await?;
        votes.retain(|v| v.election_id != election_id);
        self.save_all(&votes).await
    }
}
