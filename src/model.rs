use std::collections::HashMap;

use chrono::{DateTime, offset::Utc};
use serde::{Deserialize, Serialize};

pub type Timestamp = DateTime<Utc>;

/// Derived from the election's time window on every read; never stored.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    Upcoming,
    Active,
    Completed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub course: String,
    pub position: String,
    pub platform: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Election {
    pub id: String,
    pub title: String,
    pub opens: Option<Timestamp>,
    pub deadline: Timestamp,
    pub positions: Vec<String>,
    pub candidates: Vec<Candidate>,
    pub created_at: Timestamp,
}

impl Election {
    pub fn status_at(&self, now: Timestamp) -> ElectionStatus {
        if let Some(opens) = self.opens {
            if now < opens {
                return ElectionStatus::Upcoming;
            }
        }
        if now < self.deadline {
            ElectionStatus::Active
        } else {
            ElectionStatus::Completed
        }
    }

    /// Candidates registered for one position, in registration order.
    pub fn candidates_for<'a>(&'a self, position: &'a str) -> impl Iterator<Item = &'a Candidate> {
        self.candidates.iter().filter(move |c| c.position == position)
    }
}

/// One cast ballot. Immutable once created; at most one per
/// (election, voter) pair.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    pub election_id: String,
    pub voter_id: String,
    /// position name -> candidate id
    pub votes: HashMap<String, String>,
    pub timestamp: Timestamp,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Clone, Debug))]
pub enum Identity {
    SrCode(String),
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Clone))]
#[serde(rename_all = "camelCase")]
pub struct CandidateSpec {
    pub name: String,
    pub course: String,
    pub position: String,
    pub platform: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Clone))]
#[serde(rename_all = "camelCase")]
pub struct PostElectionRequest {
    pub title: String,
    pub opens: Option<Timestamp>,
    pub deadline: Timestamp,
    pub positions: Vec<String>,
    pub candidates: Vec<CandidateSpec>,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Clone, Debug))]
pub struct PostElectionResponse {
    pub id: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutElectionRequest {
    pub title: String,
    pub opens: Option<Timestamp>,
    pub deadline: Timestamp,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSummary {
    pub id: String,
    pub title: String,
    pub deadline: Timestamp,
    pub status: ElectionStatus,
    pub total_votes: usize,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Debug))]
#[serde(rename_all = "camelCase")]
pub struct GetElectionResponse {
    pub election: Election,
    pub status: ElectionStatus,
    pub total_votes: usize,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Clone))]
#[serde(rename_all = "camelCase")]
pub struct CastBallotRequest {
    /// position name -> candidate id; must cover every declared position.
    pub votes: HashMap<String, String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HasVotedResponse {
    pub has_voted: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateCount {
    pub candidate_id: String,
    pub count: usize,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PositionResult {
    pub position: String,
    pub counts: Vec<CandidateCount>,
    /// Top candidate id, asserted only for completed elections with votes.
    pub winner: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Debug))]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
    pub election_id: String,
    pub title: String,
    pub status: ElectionStatus,
    pub total_votes: usize,
    pub positions: Vec<PositionResult>,
}
