//! Bearer token verification.
//!
//! Tokens are issued by a separate identity service and signed with a
//! shared HS256 secret. This server only checks them and reads the caller id.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tourney::tournament::UserId;

/// JWT claims for access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Caller id
    pub sub: UserId,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Access denied. Token is required.")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Verifies HS256 access tokens
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Decode `token`, checking its signature and expiry
    pub fn verify(&self, token: &str) -> Result<Claims, IdentityError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(IdentityError::MissingToken);
        }

        let token_data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test_secret_key_for_testing_only_0123456789";

    fn mint(secret: &str, sub: UserId, ttl: Duration) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token() {
        let verifier = TokenVerifier::new(SECRET);
        let claims = verifier
            .verify(&mint(SECRET, 42, Duration::minutes(15)))
            .unwrap();
        assert_eq!(claims.sub, 42);
    }

    #[test]
    fn test_wrong_secret() {
        let verifier = TokenVerifier::new(SECRET);
        let token = mint("another_secret_key_that_is_long_enough!!", 42, Duration::minutes(15));
        assert!(matches!(
            verifier.verify(&token),
            Err(IdentityError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        let verifier = TokenVerifier::new(SECRET);
        let token = mint(SECRET, 42, Duration::hours(-1));
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_empty_token() {
        let verifier = TokenVerifier::new(SECRET);
        assert!(matches!(
            verifier.verify("  "),
            Err(IdentityError::MissingToken)
        ));
        assert!(verifier.verify("not.a.jwt").is_err());
    }
}
