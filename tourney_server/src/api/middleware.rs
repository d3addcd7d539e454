//! Authentication middleware for protected endpoints.
//!
//! The middleware validates the bearer token from the `Authorization` header
//! and injects the caller into request extensions for downstream handlers.
//!
//! # Extracting the caller
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use tourney_server::api::middleware::Caller;
//!
//! async fn protected_handler(Extension(caller): Extension<Caller>) -> String {
//!     format!("Authenticated as user {}", caller.0)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tourney::BracketStore;
use tourney::tournament::UserId;

use super::AppState;
use super::error::ApiError;
use crate::identity::IdentityError;
use crate::logging::log_security_event;

/// Authenticated caller of a protected endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

/// Validate the bearer token and inject [`Caller`].
///
/// # Behavior
///
/// - **Success**: Token valid → Injects `Caller` into request extensions → Calls next handler
/// - **Missing header / invalid format**: Returns `401 Unauthorized`
/// - **Invalid/expired token**: Returns `401 Unauthorized`
pub async fn auth_middleware<S: BracketStore>(
    State(state): State<AppState<S>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(IdentityError::MissingToken)?;

    match state.verifier.verify(token) {
        Ok(claims) => {
            request.extensions_mut().insert(Caller(claims.sub));
            Ok(next.run(request).await)
        }
        Err(err) => {
            log_security_event("invalid_token", &err.to_string());
            Err(err.into())
        }
    }
}
