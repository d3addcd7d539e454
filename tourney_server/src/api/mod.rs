//! HTTP API for the bracket server.
//!
//! # Modules
//!
//! - [`tournaments`]: tournament records, status transitions, entries and share links
//! - [`brackets`]: bracket build, result submission and the public bracket view
//! - [`middleware`]: bearer token authentication for protected endpoints
//! - [`request_id`]: request correlation ids and request metrics
//! - [`error`]: JSON error responses
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health                                     - Health check (public)
//! GET    /api/v1/tournaments/{id}                    - Get tournament (public)
//! GET    /api/v1/tournaments/{id}/bracket            - Get bracket (public)
//! POST   /api/v1/tournaments                         - Create tournament (auth required)
//! GET    /api/v1/tournaments                         - List own tournaments (auth required)
//! GET    /api/v1/tournaments/{id}/details            - Tournament with entries (auth required)
//! PUT    /api/v1/tournaments/{id}                    - Update tournament (auth required)
//! DELETE /api/v1/tournaments/{id}                    - Delete tournament (auth required)
//! POST   /api/v1/tournaments/{id}/start              - Start tournament (auth required)
//! POST   /api/v1/tournaments/{id}/end                - End tournament (auth required)
//! POST   /api/v1/tournaments/{id}/cancel             - Cancel tournament (auth required)
//! POST   /api/v1/tournaments/{id}/share-url          - Share link (auth required)
//! POST   /api/v1/tournaments/{id}/entries            - Register player (auth required)
//! PUT    /api/v1/tournaments/{id}/bracket            - Build bracket (auth required)
//! GET    /api/v1/tournaments/{id}/snapshot           - Last built shape (auth required)
//! POST   /api/v1/tournaments/{id}/results            - Submit match result (auth required)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tourney::MemoryStore;
//! use tourney_server::api::{AppState, create_router};
//! use tourney_server::identity::TokenVerifier;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::new(
//!     Arc::new(MemoryStore::new()),
//!     TokenVerifier::new("a-shared-secret-of-at-least-32-chars"),
//! );
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod brackets;
pub mod error;
pub mod middleware;
pub mod request_id;
pub mod tournaments;

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use serde_json::json;
use tourney::{BracketManager, BracketStore, LedgerPolicy, TournamentManager};
use tower_http::cors::CorsLayer;

use crate::identity::TokenVerifier;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is a cheap handle.
pub struct AppState<S> {
    pub store: Arc<S>,
    pub tournaments: TournamentManager<S>,
    pub brackets: BracketManager<S>,
    pub verifier: Arc<TokenVerifier>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            tournaments: self.tournaments.clone(),
            brackets: self.brackets.clone(),
            verifier: self.verifier.clone(),
        }
    }
}

impl<S: BracketStore> AppState<S> {
    /// State with the default ledger policy and share link base
    pub fn new(store: Arc<S>, verifier: TokenVerifier) -> Self {
        Self {
            tournaments: TournamentManager::new(store.clone()),
            brackets: BracketManager::new(store.clone()),
            store,
            verifier: Arc::new(verifier),
        }
    }

    pub fn with_share_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.tournaments = self.tournaments.with_share_base_url(base_url);
        self
    }

    pub fn with_ledger_policy(mut self, policy: LedgerPolicy) -> Self {
        self.brackets = self.brackets.with_policy(policy);
        self
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router<S: BracketStore>(state: AppState<S>) -> Router {
    let v1_routes = create_v1_router(state.clone());

    Router::new()
        .route("/health", get(health_check::<S>))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router<S: BracketStore>(state: AppState<S>) -> Router<AppState<S>> {
    // Public routes (no authentication middleware)
    let public_routes = Router::new()
        .route(
            "/tournaments/{tournament_id}",
            get(tournaments::get_tournament::<S>),
        )
        .route(
            "/tournaments/{tournament_id}/bracket",
            get(brackets::get_bracket::<S>),
        );

    // Protected routes (require authentication middleware)
    let protected_routes = Router::new()
        .route(
            "/tournaments",
            post(tournaments::create_tournament::<S>).get(tournaments::list_tournaments::<S>),
        )
        .route(
            "/tournaments/{tournament_id}",
            put(tournaments::update_tournament::<S>).delete(tournaments::delete_tournament::<S>),
        )
        .route(
            "/tournaments/{tournament_id}/details",
            get(tournaments::get_details::<S>),
        )
        .route(
            "/tournaments/{tournament_id}/start",
            post(tournaments::start_tournament::<S>),
        )
        .route(
            "/tournaments/{tournament_id}/end",
            post(tournaments::end_tournament::<S>),
        )
        .route(
            "/tournaments/{tournament_id}/cancel",
            post(tournaments::cancel_tournament::<S>),
        )
        .route(
            "/tournaments/{tournament_id}/share-url",
            post(tournaments::share_url::<S>),
        )
        .route(
            "/tournaments/{tournament_id}/entries",
            post(tournaments::register_entry::<S>),
        )
        .route(
            "/tournaments/{tournament_id}/bracket",
            put(brackets::build_bracket::<S>),
        )
        .route(
            "/tournaments/{tournament_id}/snapshot",
            get(brackets::get_snapshot::<S>),
        )
        .route(
            "/tournaments/{tournament_id}/results",
            post(brackets::submit_result::<S>),
        )
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware::<S>,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:5000/health
/// # {"status":"healthy","database":true,"version":"0.1.0","timestamp":"2026-10-19T10:30:00Z"}
/// ```
async fn health_check<S: BracketStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    let db_healthy = match state.store.health_check().await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(error = %err, "Health check failed");
            false
        }
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
