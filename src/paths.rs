use actix_web::{Error, FromRequest, HttpRequest, HttpResponse, Result, web};
use actix_web::dev::{Payload, PayloadStream};
use actix_web::web::{Data, Json, Path, ServiceConfig};
use std::future::{Ready, ready};

use crate::{
    model::*,
    operations::{
        CastBallotError, DeleteCandidateError, DeleteElectionError, ElectionOperationsT,
        GetElectionError, GetResultsError, PostCandidateError, PostElectionError,
        PutElectionError,
    },
};

pub const ELECTIONS_PATH: &str = "/elections";
pub const ELECTION_PATH: &str = "/elections/{election_id}";
pub const CANDIDATES_PATH: &str = "/elections/{election_id}/candidates";
pub const CANDIDATE_PATH: &str = "/elections/{election_id}/candidates/{candidate_id}";
pub const BALLOTS_PATH: &str = "/elections/{election_id}/ballots";
pub const BALLOT_STATUS_PATH: &str = "/elections/{election_id}/ballots/status";
pub const RESULTS_PATH: &str = "/elections/{election_id}/results";
pub const RESULTS_CSV_PATH: &str = "/elections/{election_id}/results.csv";

const SR_CODE_HEADER: &str = "SR-CODE";

impl FromRequest for Identity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;
    type Config = ();

    fn from_request(req: &HttpRequest, _: &mut Payload<PayloadStream>) -> Self::Future {
        let id = req.headers()
            .get(SR_CODE_HEADER)
            .ok_or_else(|| {
                let msg = format!("Missing header: {}", SR_CODE_HEADER);
                Error::from(HttpResponse::BadRequest().body(msg))
            }).and_then(|header_value|
                header_value
                    .to_str()
                    .map_err(|_| {
                        let msg = format!("Failed to handle header value for {}", SR_CODE_HEADER);
                        Error::from(HttpResponse::InternalServerError().body(msg))
                    })
            ).map(|sr_code| {
                Identity::SrCode(sr_code.to_string())
            });

        ready(id)
    }
}

pub async fn post_election_handler<A: 'static + ElectionOperationsT>(
    ops: Data<A>,
    body: Json<PostElectionRequest>) -> Result<Json<PostElectionResponse>>
{
    let Json(request_body) = body;
    let ok = ops.post_election(&request_body)
        .await
        .map_err(|e| match e {
            PostElectionError::DuplicatePosition(position) =>
                HttpResponse::BadRequest().body(
                    format!("Duplicate position: [{}]", position)
                ),
            PostElectionError::DuplicateCandidate(name) =>
                HttpResponse::BadRequest().body(
                    format!("Duplicate candidate name: [{}]", name)
                ),
            PostElectionError::PositionNotFound(position) =>
                HttpResponse::BadRequest().body(
                    format!("Candidate references undeclared position: [{}]", position)
                ),
            PostElectionError::Unexpected => HttpResponse::InternalServerError().finish(),
        })?;
    Ok(Json(ok))
}

pub async fn get_elections_handler<A: 'static + ElectionOperationsT>(
    ops: Data<A>) -> Result<Json<Vec<ElectionSummary>>>
{
    Ok(Json(ops.list_elections().await))
}

pub async fn get_election_handler<A: 'static + ElectionOperationsT>(
    ops: Data<A>,
    path: Path<String>) -> Result<Json<GetElectionResponse>>
{
    let election = ops.get_election(&path)
        .await
        .map_err(|e| match e {
            GetElectionError::NotFound =>
                HttpResponse::NotFound().finish(),
        })?;
    Ok(Json(election))
}

pub async fn put_election_handler<A: 'static + ElectionOperationsT>(
    ops: Data<A>,
    Path(election_id): Path<String>,
    body: Json<PutElectionRequest>) -> Result<HttpResponse>
{
    let Json(request_body) = body;
    ops.put_election(&election_id, &request_body)
        .await
        .map_err(|e| match e {
            PutElectionError::NotFound => HttpResponse::NotFound().finish(),
            PutElectionError::Unexpected => HttpResponse::InternalServerError().finish(),
        })?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete_election_handler<A: 'static + ElectionOperationsT>(
    ops: Data<A>,
    Path(election_id): Path<String>) -> Result<HttpResponse>
{
    ops.delete_election(&election_id)
        .await
        .map_err(|e| match e {
            DeleteElectionError::NotFound => HttpResponse::NotFound().finish(),
            DeleteElectionError::Unexpected => HttpResponse::InternalServerError().finish(),
        })?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn post_candidate_handler<A: 'static + ElectionOperationsT>(
    ops: Data<A>,
    Path(election_id): Path<String>,
    body: Json<CandidateSpec>,
) -> Result<Json<Candidate>> {
    let Json(candidate) = body;
    let created = ops.post_candidate(&election_id, &candidate)
        .await
        .map_err(|e| match e {
            PostCandidateError::ElectionNotFound => HttpResponse::NotFound().finish(),
            PostCandidateError::PositionNotFound(position) =>
                HttpResponse::BadRequest().body(
                    format!("No such position in this election: [{}]", position)
                ),
            PostCandidateError::DuplicateCandidate(_) => HttpResponse::Conflict().finish(),
            PostCandidateError::Unexpected => HttpResponse::InternalServerError().finish(),
        })?;

    Ok(Json(created))
}

pub async fn delete_candidate_handler<A: 'static + ElectionOperationsT>(
    ops: Data<A>,
    Path((election_id, candidate_id)): Path<(String, String)>) -> Result<HttpResponse>
{
    ops.delete_candidate(&election_id, &candidate_id)
        .await
        .map_err(|e| match e {
            DeleteCandidateError::ElectionNotFound => HttpResponse::NotFound().finish(),
            DeleteCandidateError::CandidateNotFound(_) => HttpResponse::NotFound().finish(),
            DeleteCandidateError::Unexpected => HttpResponse::InternalServerError().finish(),
        })?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn post_ballot_handler<A: 'static + ElectionOperationsT>(
    ops: Data<A>,
    Path(election_id): Path<String>,
    body: Json<CastBallotRequest>,
    voter: Identity) -> Result<Json<Vote>>
{
    let Json(request_body) = body;
    let vote = ops.cast_ballot(&election_id, &voter, &request_body)
        .await
        .map_err(|e| match e {
            CastBallotError::ElectionNotFound => HttpResponse::NotFound().finish(),
            CastBallotError::VotingClosed =>
                HttpResponse::Forbidden().body("Voting is closed for this election."),
            CastBallotError::DuplicateVote => HttpResponse::Conflict()
                .body("Voter has already cast a vote in this election."),
            CastBallotError::MissingSelection(position) => {
                let message = format!("Missing selection for position: [{}]", position);
                HttpResponse::BadRequest().body(message)
            }
            CastBallotError::UnknownPosition(position) => {
                let message = format!("Unknown position: [{}]", position);
                HttpResponse::BadRequest().body(message)
            }
            CastBallotError::CandidateNotFound(candidate_id) => {
                let message = format!("Invalid candidate: [{}]", candidate_id);
                HttpResponse::BadRequest().body(message)
            }
            CastBallotError::Unexpected => HttpResponse::InternalServerError().finish(),
        })?;
    Ok(Json(vote))
}

pub async fn get_ballot_status_handler<A: 'static + ElectionOperationsT>(
    ops: Data<A>,
    Path(election_id): Path<String>,
    voter: Identity) -> Result<Json<HasVotedResponse>>
{
    let has_voted = ops.has_voted(&election_id, &voter).await;
    Ok(Json(HasVotedResponse { has_voted }))
}

pub async fn get_results_handler<A: 'static + ElectionOperationsT>(
    ops: Data<A>,
    Path(election_id): Path<String>) -> Result<Json<ResultsResponse>>
{
    let results = ops.get_results(&election_id)
        .await
        .map_err(|e| match e {
            GetResultsError::NotFound => HttpResponse::NotFound().finish(),
        })?;
    Ok(Json(results))
}

pub async fn get_results_csv_handler<A: 'static + ElectionOperationsT>(
    ops: Data<A>,
    Path(election_id): Path<String>) -> Result<HttpResponse>
{
    let csv = ops.export_results_csv(&election_id)
        .await
        .map_err(|e| match e {
            GetResultsError::NotFound => HttpResponse::NotFound().finish(),
        })?;
    Ok(HttpResponse::Ok().content_type("text/csv").body(csv))
}

pub fn config<A: 'static + ElectionOperationsT>(cfg: &mut ServiceConfig) {
    cfg.route(ELECTIONS_PATH, web::post().to(post_election_handler::<A>))
        .route(ELECTIONS_PATH, web::get().to(get_elections_handler::<A>))
        .route(ELECTION_PATH, web::get().to(get_election_handler::<A>))
        .route(ELECTION_PATH, web::put().to(put_election_handler::<A>))
        .route(ELECTION_PATH, web::delete().to(delete_election_handler::<A>))
        .route(CANDIDATES_PATH, web::post().to(post_candidate_handler::<A>))
        .route(CANDIDATE_PATH, web::delete().to(delete_candidate_handler::<A>))
        .route(BALLOT_STATUS_PATH, web::get().to(get_ballot_status_handler::<A>))
        .route(BALLOTS_PATH, web::post().to(post_ballot_handler::<A>))
        .route(RESULTS_CSV_PATH, web::get().to(get_results_csv_handler::<A>))
        .route(RESULTS_PATH, web::get().to(get_results_handler::<A>));
}
