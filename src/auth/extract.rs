use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::{verify_access_token, Claims};
use crate::state::AppState;
use crate::utils::error::AppError;

/// Authenticated caller, extracted from the `Authorization: Bearer` header.
/// Handlers take this as an argument and call the role guards.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn require_participant(&self) -> Result<(), AppError> {
        match self.0.user_type.as_str() {
            "iiit" | "non-iiit" => Ok(()),
            _ => Err(AppError::Forbidden(
                "Access denied. Not a participant.".to_string(),
            )),
        }
    }

    pub fn require_organizer(&self) -> Result<(), AppError> {
        if self.0.user_type == "organizer" {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Access denied. Not an organizer.".to_string(),
            ))
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.0.user_type == "admin" {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Access denied. Admins only.".to_string(),
            ))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::AuthError("No token provided".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::AuthError("Malformed authorization header".to_string()))?;

        let claims = verify_access_token(&state.config.auth, token)?;
        Ok(AuthUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn claims(user_type: &str) -> AuthUser {
        AuthUser(Claims {
            user_id: Uuid::new_v4(),
            username: "x@x.com".to_string(),
            user_type: user_type.to_string(),
            filled: true,
            exp: 0,
        })
    }

    #[test]
    fn test_role_guards() {
        assert!(claims("iiit").require_participant().is_ok());
        assert!(claims("non-iiit").require_participant().is_ok());
        assert!(claims("organizer").require_participant().is_err());

        assert!(claims("organizer").require_organizer().is_ok());
        assert!(claims("iiit").require_organizer().is_err());

        assert!(claims("admin").require_admin().is_ok());
        assert!(claims("organizer").require_admin().is_err());
    }
}
