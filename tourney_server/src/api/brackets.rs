//! Bracket API handlers.
//!
//! # Examples
//!
//! Build a seeded bracket from four players:
//! ```bash
//! curl -X PUT http://localhost:5000/api/v1/tournaments/1/bracket \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"players": [{"name": "A", "seed": 1}, {"name": "B", "seed": 2},
//!                    {"name": "C", "seed": 3}, {"name": "D", "seed": 4}]}'
//! ```
//!
//! Submit the first match of the first round:
//! ```bash
//! curl -X POST http://localhost:5000/api/v1/tournaments/1/results \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"round": 0, "match_index": 0, "score1": 11, "score2": 3}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State, rejection::JsonRejection},
};
use tourney::BracketStore;
use tourney::bracket::{
    Advancement, BracketView, BuildOutcome, BuildRequest, RecordedResult, ResultSubmission,
};
use tourney::tournament::{BracketSnapshot, MatchStatus, TournamentId};

use super::AppState;
use super::error::ApiResult;
use super::middleware::Caller;
use super::request_id::RequestId;
use super::tournaments::json_body;
use crate::metrics;

/// Public bracket view: tournament, entries, rounds and champion.
///
/// A tournament without matches returns an empty `bracket` array.
pub async fn get_bracket<S: BracketStore>(
    State(state): State<AppState<S>>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<BracketView> {
    Ok(Json(state.brackets.get_bracket(tournament_id).await?))
}

/// Shape stored by the last successful build, `null` before the first one.
pub async fn get_snapshot<S: BracketStore>(
    State(state): State<AppState<S>>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Option<BracketSnapshot>> {
    Ok(Json(state.brackets.get_snapshot(tournament_id).await?))
}

/// Replace the tournament's bracket.
///
/// An empty `bracket` field builds the standard seeded layout from `players`.
///
/// # Errors
///
/// - `400 Bad Request`: Player count not a power of two, over the limit, or a malformed shape
/// - `403 Forbidden`: Caller does not own the tournament
/// - `404 Not Found`: No such tournament
pub async fn build_bracket<S: BracketStore>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    request_id: RequestId,
    Path(tournament_id): Path<TournamentId>,
    payload: Result<Json<BuildRequest>, JsonRejection>,
) -> ApiResult<BuildOutcome> {
    let request = json_body(payload)?;
    let outcome = state
        .brackets
        .build_bracket(tournament_id, caller.0, request)
        .await?;

    metrics::brackets_built_total(outcome.matches_created);
    tracing::info!(
        request_id = %request_id.as_str(),
        tournament_id = tournament_id,
        matches_created = outcome.matches_created,
        "Bracket built"
    );
    Ok(Json(outcome))
}

/// Record a match score and advance the winner.
///
/// `round` and `match_index` are zero-based.
///
/// # Errors
///
/// - `400 Bad Request`: Negative scores, a BYE match, or a missing match when placeholders are off
/// - `403 Forbidden`: Caller does not own the tournament
/// - `404 Not Found`: No such tournament
pub async fn submit_result<S: BracketStore>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    request_id: RequestId,
    Path(tournament_id): Path<TournamentId>,
    payload: Result<Json<ResultSubmission>, JsonRejection>,
) -> ApiResult<RecordedResult> {
    let submission = json_body(payload)?;
    let recorded = state
        .brackets
        .submit_result(tournament_id, caller.0, submission)
        .await?;

    metrics::results_recorded_total(recorded.status == MatchStatus::Completed);
    if let Some(Advancement::Placed { .. }) = recorded.advancement {
        metrics::winners_advanced_total();
    }
    tracing::info!(
        request_id = %request_id.as_str(),
        tournament_id = tournament_id,
        round = submission.round,
        match_index = submission.match_index,
        status = %recorded.status,
        "Match result recorded"
    );
    Ok(Json(recorded))
}
