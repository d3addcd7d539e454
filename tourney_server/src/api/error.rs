//! Mapping of domain errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tourney::TournamentError;

use crate::identity::IdentityError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by every handler
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }
}

impl From<TournamentError> for ApiError {
    fn from(err: TournamentError) -> Self {
        let status = match &err {
            TournamentError::Validation(_) => StatusCode::BAD_REQUEST,
            TournamentError::NotFound(_) => StatusCode::NOT_FOUND,
            TournamentError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            TournamentError::Database(_)
            | TournamentError::Serialization(_)
            | TournamentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if !err.is_client_error() {
            tracing::error!(error = %err, "Request failed");
        }

        Self {
            status,
            message: err.client_message(),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::MissingToken => Self::unauthorized(err.to_string()),
            IdentityError::InvalidToken(_) => Self::unauthorized("Invalid or expired token"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (TournamentError::validation("bad"), StatusCode::BAD_REQUEST),
            (TournamentError::NotFound(1), StatusCode::NOT_FOUND),
            (
                TournamentError::Unauthorized {
                    tournament_id: 1,
                    user_id: 2,
                },
                StatusCode::FORBIDDEN,
            ),
            (
                TournamentError::Storage("disk on fire".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_infrastructure_detail_is_hidden() {
        let err = ApiError::from(TournamentError::Storage("disk on fire".to_string()));
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err = ApiError::from(TournamentError::validation("Tournament is full"));
        assert_eq!(err.message, "Tournament is full");
    }
}
