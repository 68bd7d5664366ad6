//! Session credentials: a short-lived access token carrying the role
//! claims, and a longer-lived refresh token carrying only the identity.

pub mod extract;

pub use extract::AuthUser;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::utils::error::AppError;

pub const ACCESS_TOKEN_HOURS: i64 = 1;
pub const REFRESH_TOKEN_DAYS: i64 = 7;

/// Access-token claims checked on every protected request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub username: String,
    pub user_type: String,
    pub filled: bool,
    pub exp: i64,
}

/// Refresh-token claims: identity only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub user_id: Uuid,
    pub exp: i64,
}

pub fn issue_access_token(
    config: &AuthConfig,
    user_id: Uuid,
    username: &str,
    user_type: &str,
    filled: bool,
) -> Result<String, AppError> {
    let claims = Claims {
        user_id,
        username: username.to_string(),
        user_type: user_type.to_string(),
        filled,
        exp: (Utc::now() + Duration::hours(ACCESS_TOKEN_HOURS)).timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn issue_refresh_token(config: &AuthConfig, user_id: Uuid) -> Result<String, AppError> {
    let claims = RefreshClaims {
        user_id,
        exp: (Utc::now() + Duration::days(REFRESH_TOKEN_DAYS)).timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify_access_token(config: &AuthConfig, token: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub fn verify_refresh_token(config: &AuthConfig, token: &str) -> Result<RefreshClaims, AppError> {
    let data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "unit-test-secret".to_string(),
            jwt_refresh_secret: "unit-test-refresh-secret".to_string(),
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let token =
            issue_access_token(&config, user_id, "alice@x.com", "iiit", false).unwrap();
        let claims = verify_access_token(&config, &token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.username, "alice@x.com");
        assert_eq!(claims.user_type, "iiit");
        assert!(!claims.filled);
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let token = issue_refresh_token(&config, user_id).unwrap();
        let claims = verify_refresh_token(&config, &token).unwrap();
        assert_eq!(claims.user_id, user_id);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let config = test_config();
        let refresh = issue_refresh_token(&config, Uuid::new_v4()).unwrap();
        assert!(verify_access_token(&config, &refresh).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let config = test_config();
        let token =
            issue_access_token(&config, Uuid::new_v4(), "a@x.com", "iiit", true).unwrap();

        let other = AuthConfig {
            jwt_secret: "different".to_string(),
            jwt_refresh_secret: "different".to_string(),
        };
        assert!(verify_access_token(&other, &token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(verify_access_token(&test_config(), "not-a-token").is_err());
    }
}
