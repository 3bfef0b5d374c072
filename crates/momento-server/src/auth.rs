//! Bearer access tokens
//!
//! HS256 JWTs carrying the user ID. Tokens are issued by the CLI and checked
//! by the auth middleware, which then loads the user row.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use momento_core::AuthConfig;

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

/// Why a bearer token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Access token has expired")]
    Expired,
    #[error("Invalid access token")]
    Invalid,
}

/// Issue an access token for a user
pub fn issue_access_token(config: &AuthConfig, user_id: i64) -> anyhow::Result<String> {
    let now = Utc::now();
    let claims = Claims {
        user_id,
        iat: now.timestamp(),
        exp: (now + Duration::minutes(config.access_token_minutes)).timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;
    Ok(token)
}

/// Verify an access token's signature and expiry
pub fn verify_access_token(config: &AuthConfig, token: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let config = AuthConfig::new("secret");
        let token = issue_access_token(&config, 42).unwrap();
        let claims = verify_access_token(&config, &token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = issue_access_token(&AuthConfig::new("one"), 1).unwrap();
        let err = verify_access_token(&AuthConfig::new("two"), &token).unwrap_err();
        assert_eq!(err, TokenError::Invalid);
        assert_eq!(
            verify_access_token(&AuthConfig::new("one"), "not-a-jwt").unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn test_expired_token() {
        let mut config = AuthConfig::new("secret");
        config.access_token_minutes = -5;
        let token = issue_access_token(&config, 1).unwrap();
        assert_eq!(
            verify_access_token(&config, &token).unwrap_err(),
            TokenError::Expired
        );
        assert_eq!(TokenError::Expired.to_string(), "Access token has expired");
    }
}
