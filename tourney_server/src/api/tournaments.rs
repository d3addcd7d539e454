//! Tournament management API handlers.
//!
//! Reading a single tournament is public; everything else requires a bearer
//! token and, for changes to an existing tournament, ownership of it.
//!
//! # Examples
//!
//! Create a tournament:
//! ```bash
//! curl -X POST http://localhost:5000/api/v1/tournaments \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Club Championship", "max_players": 8}'
//! ```
//!
//! Register a player:
//! ```bash
//! curl -X POST http://localhost:5000/api/v1/tournaments/1/entries \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"player_name": "Alice"}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tourney::BracketStore;
use tourney::tournament::{
    Entry, Tournament, TournamentConfig, TournamentDetails, TournamentId, TournamentUpdate,
};

use super::AppState;
use super::error::{ApiError, ApiResult};
use super::middleware::Caller;

#[derive(Debug, Deserialize)]
pub struct RegisterEntryRequest {
    pub player_name: String,
    /// Next free seed when omitted or zero
    #[serde(default)]
    pub seed_number: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ShareUrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Unwrap a JSON body, reporting malformed input in the error format
pub(super) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Create a tournament owned by the caller.
///
/// # Response
///
/// `201 Created` with the new tournament in `draft` status.
///
/// # Errors
///
/// - `400 Bad Request`: Missing name, bad limits or a name the caller already uses
pub async fn create_tournament<S: BracketStore>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<TournamentConfig>, JsonRejection>,
) -> Result<(StatusCode, Json<Tournament>), ApiError> {
    let config = json_body(payload)?;
    let tournament = state.tournaments.create_tournament(caller.0, config).await?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

/// List the caller's tournaments, newest first.
pub async fn list_tournaments<S: BracketStore>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Vec<Tournament>> {
    Ok(Json(state.tournaments.list_tournaments(caller.0).await?))
}

/// Get a tournament by id. Public.
pub async fn get_tournament<S: BracketStore>(
    State(state): State<AppState<S>>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    Ok(Json(state.tournaments.get_tournament(tournament_id).await?))
}

/// Get a tournament with its registered entries.
pub async fn get_details<S: BracketStore>(
    State(state): State<AppState<S>>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<TournamentDetails> {
    Ok(Json(state.tournaments.get_details(tournament_id).await?))
}

/// Replace name, description, player limit and entry fee.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid fields, name clash, or a limit below the registered count
/// - `403 Forbidden`: Caller does not own the tournament
/// - `404 Not Found`: No such tournament
pub async fn update_tournament<S: BracketStore>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    Path(tournament_id): Path<TournamentId>,
    payload: Result<Json<TournamentUpdate>, JsonRejection>,
) -> ApiResult<Tournament> {
    let update = json_body(payload)?;
    Ok(Json(
        state
            .tournaments
            .update_tournament(tournament_id, caller.0, update)
            .await?,
    ))
}

/// Soft-delete a tournament with its entries, matches, results and snapshot.
pub async fn delete_tournament<S: BracketStore>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<MessageResponse> {
    state
        .tournaments
        .delete_tournament(tournament_id, caller.0)
        .await?;
    Ok(Json(MessageResponse {
        message: "Tournament deleted successfully".to_string(),
    }))
}

pub async fn start_tournament<S: BracketStore>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    Ok(Json(
        state
            .tournaments
            .start_tournament(tournament_id, caller.0)
            .await?,
    ))
}

pub async fn end_tournament<S: BracketStore>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    Ok(Json(
        state
            .tournaments
            .end_tournament(tournament_id, caller.0)
            .await?,
    ))
}

pub async fn cancel_tournament<S: BracketStore>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    Ok(Json(
        state
            .tournaments
            .cancel_tournament(tournament_id, caller.0)
            .await?,
    ))
}

/// Link to the public bracket page.
pub async fn share_url<S: BracketStore>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<ShareUrlResponse> {
    let url = state.tournaments.share_url(tournament_id, caller.0).await?;
    Ok(Json(ShareUrlResponse { url }))
}

/// Register a player by name.
///
/// # Errors
///
/// - `400 Bad Request`: Reserved or duplicate name, negative seed, or a full tournament
pub async fn register_entry<S: BracketStore>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    Path(tournament_id): Path<TournamentId>,
    payload: Result<Json<RegisterEntryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Entry>), ApiError> {
    let request = json_body(payload)?;
    let entry = state
        .tournaments
        .register_entry(
            tournament_id,
            caller.0,
            &request.player_name,
            request.seed_number,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
