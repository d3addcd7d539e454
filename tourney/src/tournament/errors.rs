//! Tournament error types.

use thiserror::Error;

use super::models::{TournamentId, UserId};

/// Tournament and bracket errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Malformed input, rejected before any write becomes visible
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Tournament missing or soft-deleted
    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),

    /// Caller does not own the tournament
    #[error("User {user_id} does not own tournament {tournament_id}")]
    Unauthorized {
        tournament_id: TournamentId,
        user_id: UserId,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Snapshot (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage backend failure that is not a driver error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TournamentError {
    /// Shorthand for a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        TournamentError::Validation(message.into())
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Infrastructure errors are collapsed into a generic message and ids are
    /// left out of ownership failures.
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_)
            | TournamentError::Serialization(_)
            | TournamentError::Storage(_) => "Internal server error".to_string(),
            TournamentError::NotFound(_) => "Tournament not found".to_string(),
            TournamentError::Unauthorized { .. } => {
                "Not authorized to modify this tournament".to_string()
            }
            TournamentError::Validation(message) => message.clone(),
        }
    }

    /// Errors the caller can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TournamentError::Validation(_)
                | TournamentError::NotFound(_)
                | TournamentError::Unauthorized { .. }
        )
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_infrastructure_detail() {
        let err = TournamentError::Storage("connection reset by peer".to_string());
        assert_eq!(err.client_message(), "Internal server error");
        assert!(!err.is_client_error());

        let err = TournamentError::Unauthorized {
            tournament_id: 4,
            user_id: 9,
        };
        assert!(!err.client_message().contains('9'));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_validation_message_is_passed_through() {
        let err = TournamentError::validation("Player count must be a power of two");
        assert_eq!(err.client_message(), "Player count must be a power of two");
    }
}
