use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::ballots::{BallotStore, CastVoteError};
use crate::elections::ElectionStore;
use crate::model::*;
use crate::store::{self, BlobStore, StoreError};
use crate::tally;
use crate::util;

#[cfg(test)]
use mockall::automock;

#[derive(Debug)]
pub enum PostElectionError {
    DuplicatePosition(String),
    DuplicateCandidate(String),
    PositionNotFound(String),
    Unexpected,
}

impl From<StoreError> for PostElectionError {
    fn from(e: StoreError) -> Self {
        store::log_store_error(&e);
        Self::Unexpected
    }
}

#[derive(Debug)]
pub enum GetElectionError {
    NotFound,
}

#[derive(Debug)]
pub enum PutElectionError {
    NotFound,
    Unexpected,
}

impl From<StoreError> for PutElectionError {
    fn from(e: StoreError) -> Self {
        store::log_store_error(&e);
        Self::Unexpected
    }
}

#[derive(Debug)]
pub enum DeleteElectionError {
    NotFound,
    Unexpected,
}

impl From<StoreError> for DeleteElectionError {
    fn from(e: StoreError) -> Self {
        store::log_store_error(&e);
        Self::Unexpected
    }
}

#[derive(Debug)]
pub enum PostCandidateError {
    ElectionNotFound,
    PositionNotFound(String),
    DuplicateCandidate(String),
    Unexpected,
}

impl From<StoreError> for PostCandidateError {
    fn from(e: StoreError) -> Self {
        store::log_store_error(&e);
        Self::Unexpected
    }
}

#[derive(Debug)]
pub enum DeleteCandidateError {
    ElectionNotFound,
    CandidateNotFound(String),
    Unexpected,
}

impl From<StoreError> for DeleteCandidateError {
    fn from(e: StoreError) -> Self {
        store::log_store_error(&e);
        Self::Unexpected
    }
}

#[derive(Debug)]
pub enum CastBallotError {
    ElectionNotFound,
    VotingClosed,
    MissingSelection(String),
    UnknownPosition(String),
    CandidateNotFound(String),
    DuplicateVote,
    Unexpected,
}

impl From<CastVoteError> for CastBallotError {
    fn from(e: CastVoteError) -> Self {
        match e {
            CastVoteError::DuplicateVote => Self::DuplicateVote,
            CastVoteError::Unexpected => Self::Unexpected,
        }
    }
}

#[derive(Debug)]
pub enum GetResultsError {
    NotFound,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ElectionOperationsT {
    async fn post_election(
        &self,
        request: &PostElectionRequest,
    ) -> Result<PostElectionResponse, PostElectionError>;
    async fn list_elections(&self) -> Vec<ElectionSummary>;
    async fn get_election(&self, id: &str) -> Result<GetElectionResponse, GetElectionError>;
    async fn put_election(
        &self,
        id: &str,
        request: &PutElectionRequest,
    ) -> Result<(), PutElectionError>;
    async fn delete_election(&self, id: &str) -> Result<(), DeleteElectionError>;
    async fn post_candidate(
        &self,
        election_id: &str,
        request: &CandidateSpec,
    ) -> Result<Candidate, PostCandidateError>;
    async fn delete_candidate(
        &self,
        election_id: &str,
        candidate_id: &str,
    ) -> Result<(), DeleteCandidateError>;
    async fn cast_ballot(
        &self,
        election_id: &str,
        voter: &Identity,
        request: &CastBallotRequest,
    ) -> Result<Vote, CastBallotError>;
    async fn has_voted(&self, election_id: &str, voter: &Identity) -> bool;
    async fn get_results(&self, election_id: &str) -> Result<ResultsResponse, GetResultsError>;
    async fn export_results_csv(&self, election_id: &str) -> Result<String, GetResultsError>;
}

#[derive(Clone)]
pub struct ElectionOperations {
    elections: ElectionStore,
    ballots: BallotStore,
}

impl ElectionOperations {
    pub fn new(store: Arc<dyn BlobStore>) -> ElectionOperations {
        ElectionOperations {
            elections: ElectionStore::new(store.clone()),
            ballots: BallotStore::new(store),
        }
    }
}

/// Every declared position must be covered by exactly one candidate
/// registered for that position; selections for undeclared positions are
/// rejected rather than silently dropped. The duplicate-vote invariant
/// itself lives in the ballot store.
fn validate_selections(
    election: &Election,
    selections: &HashMap<String, String>,
) -> Result<(), CastBallotError> {
    for position in &election.positions {
        let candidate_id = selections
            .get(position)
            .ok_or_else(|| CastBallotError::MissingSelection(position.clone()))?;
        let registered = election
            .candidates_for(position)
            .any(|c| &c.id == candidate_id);
        if !registered {
            return Err(CastBallotError::CandidateNotFound(candidate_id.clone()));
        }
    }
    for position in selections.keys() {
        if !election.positions.contains(position) {
            return Err(CastBallotError::UnknownPosition(position.clone()));
        }
    }
    Ok(())
}

#[async_trait]
impl ElectionOperationsT for ElectionOperations {
    async fn post_election(
        &self,
        request: &PostElectionRequest,
    ) -> Result<PostElectionResponse, PostElectionError> {
        if let Some(duplicate) = util::first_duplicate(request.positions.iter()) {
            return Err(PostElectionError::DuplicatePosition(duplicate.clone()));
        }
        for candidate in request.candidates.iter() {
            if !request.positions.contains(&candidate.position) {
                return Err(PostElectionError::PositionNotFound(candidate.position.clone()));
            }
        }
        if let Some((_, name)) =
            util::first_duplicate(request.candidates.iter().map(|c| (&c.position, &c.name)))
        {
            return Err(PostElectionError::DuplicateCandidate(name.clone()));
        }

        let election_id = util::new_id("election");
        let election = Election {
            id: election_id.clone(),
            title: request.title.clone(),
            opens: request.opens,
            deadline: request.deadline,
            positions: request.positions.clone(),
            candidates: request
                .candidates
                .iter()
                .map(|c| Candidate {
                    id: util::new_id("cand"),
                    name: c.name.clone(),
                    course: c.course.clone(),
                    position: c.position.clone(),
                    platform: c.platform.clone(),
                })
                .collect(),
            created_at: Utc::now(),
        };

        self.elections.insert(election).await?;

        Ok(PostElectionResponse { id: election_id })
    }

    async fn list_elections(&self) -> Vec<ElectionSummary> {
        let now = Utc::now();
        let mut summaries = Vec::new();
        for election in self.elections.list().await {
            let total_votes = self.ballots.get_total_votes(&election.id).await;
            summaries.push(ElectionSummary {
                status: election.status_at(now),
                id: election.id,
                title: election.title,
                deadline: election.deadline,
                total_votes,
            });
        }
        summaries
    }

    async fn get_election(&self, id: &str) -> Result<GetElectionResponse, GetElectionError> {
        let election = self
            .elections
            .find(id)
            .await
            .ok_or(GetElectionError::NotFound)?;
        let total_votes = self.ballots.get_total_votes(id).await;

        Ok(GetElectionResponse {
            status: election.status_at(Utc::now()),
            total_votes,
            election,
        })
    }

    async fn put_election(
        &self,
        id: &str,
        request: &PutElectionRequest,
    ) -> Result<(), PutElectionError> {
        let mut election = self
            .elections
            .find(id)
            .await
            .ok_or(PutElectionError::NotFound)?;

        election.title = request.title.clone();
        election.opens = request.opens;
        election.deadline = request.deadline;

        if !self.elections.replace(election).await? {
            return Err(PutElectionError::NotFound);
        }
        Ok(())
    }

    async fn delete_election(&self, id: &str) -> Result<(), DeleteElectionError> {
        if !self.elections.remove(id).await? {
            return Err(DeleteElectionError::NotFound);
        }
        // Votes never outlive their election.
        self.ballots.delete_election_votes(id).await?;
        Ok(())
    }

    async fn post_candidate(
        &self,
        election_id: &str,
        request: &CandidateSpec,
    ) -> Result<Candidate, PostCandidateError> {
        let mut election = self
            .elections
            .find(election_id)
            .await
            .ok_or(PostCandidateError::ElectionNotFound)?;

        if !election.positions.contains(&request.position) {
            return Err(PostCandidateError::PositionNotFound(request.position.clone()));
        }
        let duplicate = election
            .candidates_for(&request.position)
            .any(|c| c.name == request.name);
        if duplicate {
            return Err(PostCandidateError::DuplicateCandidate(request.name.clone()));
        }

        let candidate = Candidate {
            id: util::new_id("cand"),
            name: request.name.clone(),
            course: request.course.clone(),
            position: request.position.clone(),
            platform: request.platform.clone(),
        };
        election.candidates.push(candidate.clone());

        if !self.elections.replace(election).await? {
            return Err(PostCandidateError::ElectionNotFound);
        }
        Ok(candidate)
    }

    async fn delete_candidate(
        &self,
        election_id: &str,
        candidate_id: &str,
    ) -> Result<(), DeleteCandidateError> {
        let mut election = self
            .elections
            .find(election_id)
            .await
            .ok_or(DeleteCandidateError::ElectionNotFound)?;

        let before = election.candidates.len();
        election.candidates.retain(|c| c.id != candidate_id);
        if election.candidates.len() == before {
            return Err(DeleteCandidateError::CandidateNotFound(
                candidate_id.to_owned(),
            ));
        }

        // Existing votes for the removed candidate stay in the store;
        // the tally skips selections it can no longer resolve.
        if !self.elections.replace(election).await? {
            return Err(DeleteCandidateError::ElectionNotFound);
        }
        Ok(())
    }

    async fn cast_ballot(
        &self,
        election_id: &str,
        voter: &Identity,
        request: &CastBallotRequest,
    ) -> Result<Vote, CastBallotError> {
        let election = self
            .elections
            .find(election_id)
            .await
            .ok_or(CastBallotError::ElectionNotFound)?;

        if election.status_at(Utc::now()) != ElectionStatus::Active {
            return Err(CastBallotError::VotingClosed);
        }
        validate_selections(&election, &request.votes)?;

        let Identity::SrCode(voter_id) = voter;
        let vote = self
            .ballots
            .cast_vote(election_id, voter_id, request.votes.clone())
            .await?;
        Ok(vote)
    }

    async fn has_voted(&self, election_id: &str, voter: &Identity) -> bool {
        let Identity::SrCode(voter_id) = voter;
        self.ballots.has_voted(election_id, voter_id).await
    }

    async fn get_results(&self, election_id: &str) -> Result<ResultsResponse, GetResultsError> {
        let election = self
            .elections
            .find(election_id)
            .await
            .ok_or(GetResultsError::NotFound)?;

        let votes = self.ballots.get_election_votes(election_id).await;
        let status = election.status_at(Utc::now());
        let positions = tally::tally(&election, &votes)
            .into_iter()
            .map(|t| {
                // While voting is still open no winner is asserted, even
                // when one candidate leads.
                let winner = if status == ElectionStatus::Completed {
                    tally::leader(&t.counts).map(|c| c.candidate_id.clone())
                } else {
                    None
                };
                PositionResult {
                    position: t.position,
                    counts: t.counts,
                    winner,
                }
            })
            .collect();

        Ok(ResultsResponse {
            election_id: election.id,
            title: election.title,
            status,
            total_votes: votes.len(),
            positions,
        })
    }

    async fn export_results_csv(&self, election_id: &str) -> Result<String, GetResultsError> {
        let election = self
            .elections
            .find(election_id)
            .await
            .ok_or(GetResultsError::NotFound)?;
        let votes = self.ballots.get_election_votes(election_id).await;
        let tallies = tally::tally(&election, &votes);
        Ok(tally::results_csv(&election, &tallies))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::store::MemoryStore;

    use super::*;

    fn new_ops() -> ElectionOperations {
        ElectionOperations::new(Arc::new(MemoryStore::new()))
    }

    fn mock_candidate_spec(name: &str, position: &str) -> CandidateSpec {
        CandidateSpec {
            name: name.to_owned(),
            course: "BS Computer Science".to_owned(),
            position: position.to_owned(),
            platform: None,
        }
    }

    fn mock_request() -> PostElectionRequest {
        PostElectionRequest {
            title: "Student Council 2026".to_owned(),
            opens: None,
            deadline: Utc::now() + Duration::days(7),
            positions: vec!["President".to_owned(), "Secretary".to_owned()],
            candidates: vec![
                mock_candidate_spec("Ana Reyes", "President"),
                mock_candidate_spec("Ben Cruz", "President"),
                mock_candidate_spec("Carla Santos", "Secretary"),
            ],
        }
    }

    async fn post_mock_election(ops: &ElectionOperations) -> String {
        ops.post_election(&mock_request())
            .await
            .expect("Should post election")
            .id
    }

    async fn candidate_id(ops: &ElectionOperations, election_id: &str, name: &str) -> String {
        ops.get_election(election_id)
            .await
            .expect("Should get election")
            .election
            .candidates
            .into_iter()
            .find(|c| c.name == name)
            .expect("Candidate should exist")
            .id
    }

    async fn mock_ballot(ops: &ElectionOperations, election_id: &str, president: &str, secretary: &str) -> CastBallotRequest {
        let mut votes = HashMap::new();
        votes.insert(
            "President".to_owned(),
            candidate_id(ops, election_id, president).await,
        );
        votes.insert(
            "Secretary".to_owned(),
            candidate_id(ops, election_id, secretary).await,
        );
        CastBallotRequest { votes }
    }

    fn voter(sr_code: &str) -> Identity {
        Identity::SrCode(sr_code.to_owned())
    }

    #[tokio::test]
    async fn post_then_get_election() {
        let ops = new_ops();

        let election_id = post_mock_election(&ops).await;
        let response = ops.get_election(&election_id).await.unwrap();

        assert_eq!("Student Council 2026", response.election.title);
        assert_eq!(ElectionStatus::Active, response.status);
        assert_eq!(0, response.total_votes);
        assert_eq!(3, response.election.candidates.len());
        assert!(response.election.candidates.iter().all(|c| c.id.starts_with("cand_")));
    }

    #[tokio::test]
    async fn get_unknown_election() {
        let ops = new_ops();
        let error = ops.get_election("unknown-election").await.unwrap_err();
        match error {
            GetElectionError::NotFound => (),
        }
    }

    #[tokio::test]
    async fn duplicate_position_rejected() {
        let ops = new_ops();
        let mut request = mock_request();
        request.positions.push("President".to_owned());

        let error = ops.post_election(&request).await.unwrap_err();
        match error {
            PostElectionError::DuplicatePosition(p) => assert_eq!("President", p),
            _ => panic!("Expected DuplicatePosition, got {:?}", error),
        }
    }

    #[tokio::test]
    async fn candidate_for_undeclared_position_rejected() {
        let ops = new_ops();
        let mut request = mock_request();
        request
            .candidates
            .push(mock_candidate_spec("Dan Lim", "Treasurer"));

        let error = ops.post_election(&request).await.unwrap_err();
        match error {
            PostElectionError::PositionNotFound(p) => assert_eq!("Treasurer", p),
            _ => panic!("Expected PositionNotFound, got {:?}", error),
        }
    }

    #[tokio::test]
    async fn duplicate_candidate_name_rejected() {
        let ops = new_ops();
        let mut request = mock_request();
        request
            .candidates
            .push(mock_candidate_spec("Ana Reyes", "President"));

        let error = ops.post_election(&request).await.unwrap_err();
        match error {
            PostElectionError::DuplicateCandidate(name) => assert_eq!("Ana Reyes", name),
            _ => panic!("Expected DuplicateCandidate, got {:?}", error),
        }
    }

    #[tokio::test]
    async fn list_elections_reports_totals() {
        let ops = new_ops();
        let election_id = post_mock_election(&ops).await;
        let ballot = mock_ballot(&ops, &election_id, "Ana Reyes", "Carla Santos").await;
        ops.cast_ballot(&election_id, &voter("21-00001"), &ballot)
            .await
            .unwrap();

        let summaries = ops.list_elections().await;

        assert_eq!(1, summaries.len());
        assert_eq!(election_id, summaries[0].id);
        assert_eq!(ElectionStatus::Active, summaries[0].status);
        assert_eq!(1, summaries[0].total_votes);
    }

    mod cast_ballot {
        use super::*;

        #[tokio::test]
        async fn happy_path() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;
            let mock_voter = voter("21-00001");

            let ballot = mock_ballot(&ops, &election_id, "Ana Reyes", "Carla Santos").await;
            let vote = ops
                .cast_ballot(&election_id, &mock_voter, &ballot)
                .await
                .expect("cast ballot should succeed");

            assert_eq!(election_id, vote.election_id);
            assert_eq!("21-00001", vote.voter_id);
            assert!(ops.has_voted(&election_id, &mock_voter).await);
            assert_eq!(1, ops.get_election(&election_id).await.unwrap().total_votes);
        }

        #[tokio::test]
        async fn second_ballot_rejected() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;
            let mock_voter = voter("21-00001");

            let first = mock_ballot(&ops, &election_id, "Ana Reyes", "Carla Santos").await;
            ops.cast_ballot(&election_id, &mock_voter, &first)
                .await
                .expect("first ballot should succeed");

            // Different selections, same voter.
            let second = mock_ballot(&ops, &election_id, "Ben Cruz", "Carla Santos").await;
            let error = ops
                .cast_ballot(&election_id, &mock_voter, &second)
                .await
                .expect_err("second ballot should be rejected");
            match error {
                CastBallotError::DuplicateVote => (),
                _ => panic!("Expected DuplicateVote, got {:?}", error),
            }
            assert_eq!(1, ops.get_election(&election_id).await.unwrap().total_votes);
        }

        #[tokio::test]
        async fn missing_selection_rejected() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;

            let mut ballot = mock_ballot(&ops, &election_id, "Ana Reyes", "Carla Santos").await;
            ballot.votes.remove("Secretary");

            let error = ops
                .cast_ballot(&election_id, &voter("21-00001"), &ballot)
                .await
                .unwrap_err();
            match error {
                CastBallotError::MissingSelection(p) => assert_eq!("Secretary", p),
                _ => panic!("Expected MissingSelection, got {:?}", error),
            }
        }

        #[tokio::test]
        async fn undeclared_position_rejected() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;

            let mut ballot = mock_ballot(&ops, &election_id, "Ana Reyes", "Carla Santos").await;
            ballot
                .votes
                .insert("Treasurer".to_owned(), "cand_bogus".to_owned());

            let error = ops
                .cast_ballot(&election_id, &voter("21-00001"), &ballot)
                .await
                .unwrap_err();
            match error {
                CastBallotError::UnknownPosition(p) => assert_eq!("Treasurer", p),
                _ => panic!("Expected UnknownPosition, got {:?}", error),
            }
        }

        #[tokio::test]
        async fn cross_position_candidate_rejected() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;

            // A real candidate, but registered for President.
            let ana = candidate_id(&ops, &election_id, "Ana Reyes").await;
            let mut ballot = mock_ballot(&ops, &election_id, "Ana Reyes", "Carla Santos").await;
            ballot.votes.insert("Secretary".to_owned(), ana.clone());

            let error = ops
                .cast_ballot(&election_id, &voter("21-00001"), &ballot)
                .await
                .unwrap_err();
            match error {
                CastBallotError::CandidateNotFound(id) => assert_eq!(ana, id),
                _ => panic!("Expected CandidateNotFound, got {:?}", error),
            }
        }

        #[tokio::test]
        async fn closed_election_rejected() {
            let ops = new_ops();
            let mut request = mock_request();
            request.deadline = Utc::now() - Duration::hours(1);
            let election_id = ops.post_election(&request).await.unwrap().id;

            let ballot = mock_ballot(&ops, &election_id, "Ana Reyes", "Carla Santos").await;
            let error = ops
                .cast_ballot(&election_id, &voter("21-00001"), &ballot)
                .await
                .unwrap_err();
            match error {
                CastBallotError::VotingClosed => (),
                _ => panic!("Expected VotingClosed, got {:?}", error),
            }
        }

        #[tokio::test]
        async fn upcoming_election_rejected() {
            let ops = new_ops();
            let mut request = mock_request();
            request.opens = Some(Utc::now() + Duration::days(1));
            let election_id = ops.post_election(&request).await.unwrap().id;

            let ballot = mock_ballot(&ops, &election_id, "Ana Reyes", "Carla Santos").await;
            let error = ops
                .cast_ballot(&election_id, &voter("21-00001"), &ballot)
                .await
                .unwrap_err();
            match error {
                CastBallotError::VotingClosed => (),
                _ => panic!("Expected VotingClosed, got {:?}", error),
            }
        }

        #[tokio::test]
        async fn unknown_election_rejected() {
            let ops = new_ops();
            let ballot = CastBallotRequest {
                votes: HashMap::new(),
            };

            let error = ops
                .cast_ballot("unknown-election", &voter("21-00001"), &ballot)
                .await
                .unwrap_err();
            match error {
                CastBallotError::ElectionNotFound => (),
                _ => panic!("Expected ElectionNotFound, got {:?}", error),
            }
        }
    }

    #[tokio::test]
    async fn put_election_edits_definition() {
        let ops = new_ops();
        let election_id = post_mock_election(&ops).await;

        let new_deadline = Utc::now() + Duration::days(14);
        ops.put_election(
            &election_id,
            &PutElectionRequest {
                title: "Student Council 2026 (extended)".to_owned(),
                opens: None,
                deadline: new_deadline,
            },
        )
        .await
        .unwrap();

        let response = ops.get_election(&election_id).await.unwrap();
        assert_eq!("Student Council 2026 (extended)", response.election.title);
        assert_eq!(new_deadline, response.election.deadline);
    }

    #[tokio::test]
    async fn delete_election_cascades_to_votes() {
        let ops = new_ops();
        let election_id = post_mock_election(&ops).await;
        let mock_voter = voter("21-00001");
        let ballot = mock_ballot(&ops, &election_id, "Ana Reyes", "Carla Santos").await;
        ops.cast_ballot(&election_id, &mock_voter, &ballot)
            .await
            .unwrap();

        ops.delete_election(&election_id).await.unwrap();

        match ops.get_election(&election_id).await.unwrap_err() {
            GetElectionError::NotFound => (),
        }
        assert!(!ops.has_voted(&election_id, &mock_voter).await);

        let error = ops.delete_election(&election_id).await.unwrap_err();
        match error {
            DeleteElectionError::NotFound => (),
            _ => panic!("Expected NotFound, got {:?}", error),
        }
    }

    mod candidates {
        use super::*;

        #[tokio::test]
        async fn post_candidate_appends() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;

            let candidate = ops
                .post_candidate(&election_id, &mock_candidate_spec("Dan Lim", "Secretary"))
                .await
                .expect("post candidate should succeed");

            assert!(candidate.id.starts_with("cand_"));
            let election = ops.get_election(&election_id).await.unwrap().election;
            assert_eq!(4, election.candidates.len());
            assert_eq!("Dan Lim", election.candidates[3].name);
        }

        #[tokio::test]
        async fn post_candidate_rejects_unknown_position() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;

            let error = ops
                .post_candidate(&election_id, &mock_candidate_spec("Dan Lim", "Treasurer"))
                .await
                .unwrap_err();
            match error {
                PostCandidateError::PositionNotFound(p) => assert_eq!("Treasurer", p),
                _ => panic!("Expected PositionNotFound, got {:?}", error),
            }
        }

        #[tokio::test]
        async fn post_candidate_rejects_duplicate_name() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;

            let error = ops
                .post_candidate(&election_id, &mock_candidate_spec("Ana Reyes", "President"))
                .await
                .unwrap_err();
            match error {
                PostCandidateError::DuplicateCandidate(name) => assert_eq!("Ana Reyes", name),
                _ => panic!("Expected DuplicateCandidate, got {:?}", error),
            }
        }

        #[tokio::test]
        async fn delete_candidate_leaves_votes_tallyable() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;
            let ballot = mock_ballot(&ops, &election_id, "Ana Reyes", "Carla Santos").await;
            ops.cast_ballot(&election_id, &voter("21-00001"), &ballot)
                .await
                .unwrap();

            let ana = candidate_id(&ops, &election_id, "Ana Reyes").await;
            ops.delete_candidate(&election_id, &ana).await.unwrap();

            // The stored vote still references the removed candidate; the
            // tally must skip it without failing.
            let results = ops.get_results(&election_id).await.unwrap();
            assert_eq!(1, results.total_votes);
            let president = &results.positions[0];
            assert_eq!("President", president.position);
            assert!(president.counts.iter().all(|c| c.candidate_id != ana));
            assert!(president.counts.iter().all(|c| c.count == 0));
        }

        #[tokio::test]
        async fn delete_unknown_candidate() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;

            let error = ops
                .delete_candidate(&election_id, "cand_bogus")
                .await
                .unwrap_err();
            match error {
                DeleteCandidateError::CandidateNotFound(id) => assert_eq!("cand_bogus", id),
                _ => panic!("Expected CandidateNotFound, got {:?}", error),
            }
        }
    }

    mod results {
        use super::*;

        async fn post_votes(ops: &ElectionOperations, election_id: &str) {
            for &(sr_code, president) in &[
                ("21-00001", "Ana Reyes"),
                ("21-00002", "Ben Cruz"),
                ("21-00003", "Ana Reyes"),
            ] {
                let ballot = mock_ballot(ops, election_id, president, "Carla Santos").await;
                ops.cast_ballot(election_id, &voter(sr_code), &ballot)
                    .await
                    .expect("cast ballot should succeed");
            }
        }

        async fn close_election(ops: &ElectionOperations, election_id: &str) {
            ops.put_election(
                election_id,
                &PutElectionRequest {
                    title: "Student Council 2026".to_owned(),
                    opens: None,
                    deadline: Utc::now() - Duration::seconds(1),
                },
            )
            .await
            .expect("Should close election");
        }

        #[tokio::test]
        async fn active_election_has_no_winner() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;
            post_votes(&ops, &election_id).await;

            let results = ops.get_results(&election_id).await.unwrap();

            assert_eq!(ElectionStatus::Active, results.status);
            assert_eq!(3, results.total_votes);
            assert!(results.positions.iter().all(|p| p.winner.is_none()));
        }

        #[tokio::test]
        async fn completed_election_declares_winners() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;
            post_votes(&ops, &election_id).await;
            close_election(&ops, &election_id).await;

            let results = ops.get_results(&election_id).await.unwrap();
            assert_eq!(ElectionStatus::Completed, results.status);

            let ana = candidate_id(&ops, &election_id, "Ana Reyes").await;
            let ben = candidate_id(&ops, &election_id, "Ben Cruz").await;
            let carla = candidate_id(&ops, &election_id, "Carla Santos").await;

            let president = &results.positions[0];
            assert_eq!(
                vec![(ana.clone(), 2), (ben, 1)],
                president
                    .counts
                    .iter()
                    .map(|c| (c.candidate_id.clone(), c.count))
                    .collect::<Vec<_>>()
            );
            assert_eq!(Some(ana), president.winner);

            let secretary = &results.positions[1];
            assert_eq!(Some(carla), secretary.winner);
        }

        #[tokio::test]
        async fn completed_position_without_votes_has_no_winner() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;
            close_election(&ops, &election_id).await;

            let results = ops.get_results(&election_id).await.unwrap();

            assert_eq!(ElectionStatus::Completed, results.status);
            assert!(results.positions.iter().all(|p| p.winner.is_none()));
        }

        #[tokio::test]
        async fn csv_matches_tallies() {
            let ops = new_ops();
            let election_id = post_mock_election(&ops).await;
            post_votes(&ops, &election_id).await;

            let csv = ops.export_results_csv(&election_id).await.unwrap();
            let lines: Vec<&str> = csv.lines().collect();

            assert_eq!("Position,Candidate Name,Course,Votes", lines[0]);
            assert_eq!(
                "\"President\",\"Ana Reyes\",\"BS Computer Science\",2",
                lines[1]
            );
            assert_eq!(4, lines.len());
        }

        #[tokio::test]
        async fn unknown_election() {
            let ops = new_ops();
            match ops.get_results("unknown-election").await.unwrap_err() {
                GetResultsError::NotFound => (),
            }
        }
    }
}
