use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{issue_access_token, issue_refresh_token, verify_refresh_token};
use crate::models::pass_reset::ResetPasswordRequest;
use crate::models::{Organizer, User};
use crate::services::captcha::require_captcha;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub email: String,
    pub password: String,
    pub user_type: String,
    pub turnstile_token: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<Response, AppError> {
    require_captcha(
        &state.http,
        &state.config.turnstile,
        body.turnstile_token.as_deref(),
    )
    .await?;

    if body.email.is_empty() || body.password.is_empty() {
        return Err(AppError::ValidationError(
            "Email/Username and password are required".to_string(),
        ));
    }
    if !matches!(body.user_type.as_str(), "iiit" | "non-iiit") {
        return Err(AppError::ValidationError("Invalid user type".to_string()));
    }

    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE username = $1")
        .bind(&body.email)
        .fetch_optional(&state.pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let password_hash = bcrypt::hash(&body.password, bcrypt::DEFAULT_COST)?;
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, password_hash, user_type)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(&body.email)
    .bind(&password_hash)
    .bind(&body.user_type)
    .fetch_one(&state.pool)
    .await?;

    let token = issue_access_token(
        &state.config.auth,
        user.id,
        &user.username,
        &user.user_type,
        user.filled,
    )?;
    let refresh_token = issue_refresh_token(&state.config.auth, user.id)?;

    Ok(created(
        json!({ "token": token, "refresh_token": refresh_token }),
        "Registration successful!",
    )
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
    pub user_type: String,
    pub turnstile_token: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Response, AppError> {
    // Admins authenticate through their own route; everyone else is
    // CAPTCHA-gated.
    if body.user_type != "admin" {
        require_captcha(
            &state.http,
            &state.config.turnstile,
            body.turnstile_token.as_deref(),
        )
        .await?;
    }

    if body.email.is_empty() || body.password.is_empty() {
        return Err(AppError::ValidationError(
            "Email/Username and password are required".to_string(),
        ));
    }

    let (user_id, username, user_type, filled, password_hash) = match body.user_type.as_str() {
        "participant" => {
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
                .bind(&body.email)
                .fetch_optional(&state.pool)
                .await?
                .ok_or_else(|| AppError::AuthError("Invalid credentials".to_string()))?;

            if !user.is_participant() {
                return Err(AppError::Forbidden(
                    "Access denied. Not a participant.".to_string(),
                ));
            }
            (
                user.id,
                user.username.clone(),
                user.user_type.clone(),
                user.filled,
                user.password_hash,
            )
        }
        "organizer" => {
            let organizer =
                sqlx::query_as::<_, Organizer>("SELECT * FROM organizers WHERE email = $1")
                    .bind(&body.email)
                    .fetch_optional(&state.pool)
                    .await?
                    .ok_or_else(|| AppError::AuthError("Invalid credentials".to_string()))?;

            if organizer.is_archived() {
                return Err(AppError::Forbidden(
                    "Account has been archived. Please contact an administrator.".to_string(),
                ));
            }
            (
                organizer.id,
                organizer.email.clone(),
                "organizer".to_string(),
                // Organizers have no onboarding step.
                true,
                organizer.password_hash,
            )
        }
        _ => return Err(AppError::ValidationError("Invalid user type".to_string())),
    };

    if !bcrypt::verify(&body.password, &password_hash)? {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = issue_access_token(&state.config.auth, user_id, &username, &user_type, filled)?;
    let refresh_token = issue_refresh_token(&state.config.auth, user_id)?;

    Ok(success(
        json!({ "token": token, "refresh_token": refresh_token }),
        "Login successful!",
    )
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginBody {
    pub username: String,
    pub password: String,
    pub turnstile_token: Option<String>,
}

/// Admin login verifies the seeded admin account through the same
/// credential-hash mechanism as every other role.
pub async fn admin_login(
    State(state): State<AppState>,
    Json(body): Json<AdminLoginBody>,
) -> Result<Response, AppError> {
    require_captcha(
        &state.http,
        &state.config.turnstile,
        body.turnstile_token.as_deref(),
    )
    .await?;

    let admin = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE username = $1 AND user_type = 'admin'",
    )
    .bind(&body.username)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::AuthError("Invalid admin credentials".to_string()))?;

    if !bcrypt::verify(&body.password, &admin.password_hash)? {
        return Err(AppError::AuthError("Invalid admin credentials".to_string()));
    }

    let token = issue_access_token(
        &state.config.auth,
        admin.id,
        &admin.username,
        "admin",
        true,
    )?;

    Ok(success(json!({ "token": token }), "Admin login successful!").into_response())
}

#[derive(Debug, Deserialize)]
pub struct RefreshBody {
    pub refresh_token: String,
}

/// Exchange a valid refresh token for a fresh access token. The identity
/// is resolved against both account stores, participants first.
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshBody>,
) -> Result<Response, AppError> {
    let claims = verify_refresh_token(&state.config.auth, &body.refresh_token)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(claims.user_id)
        .fetch_optional(&state.pool)
        .await?;

    let token = if let Some(user) = user {
        issue_access_token(
            &state.config.auth,
            user.id,
            &user.username,
            &user.user_type,
            user.filled,
        )?
    } else {
        let organizer = sqlx::query_as::<_, Organizer>("SELECT * FROM organizers WHERE id = $1")
            .bind(claims.user_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| AppError::AuthError("Invalid or expired token".to_string()))?;

        if organizer.is_archived() {
            return Err(AppError::Forbidden(
                "Account has been archived. Please contact an administrator.".to_string(),
            ));
        }
        issue_access_token(
            &state.config.auth,
            organizer.id,
            &organizer.email,
            "organizer",
            true,
        )?
    };

    Ok(success(json!({ "token": token }), "Token refreshed").into_response())
}

pub async fn reset_password_request(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Response, AppError> {
    if body.email.is_empty() || body.reason.is_empty() {
        return Err(AppError::ValidationError(
            "Email and reason are required".to_string(),
        ));
    }

    let organizer = sqlx::query_scalar::<_, Uuid>("SELECT id FROM organizers WHERE email = $1")
        .bind(&body.email)
        .fetch_optional(&state.pool)
        .await?;
    if organizer.is_none() {
        return Err(AppError::NotFound("Club/Organizer not found".to_string()));
    }

    let pending = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM pass_resets WHERE club_email = $1 AND status = 'Pending'",
    )
    .bind(&body.email)
    .fetch_optional(&state.pool)
    .await?;
    if pending.is_some() {
        return Err(AppError::ValidationError(
            "A password reset request is already pending for this email".to_string(),
        ));
    }

    sqlx::query("INSERT INTO pass_resets (club_email, reason) VALUES ($1, $2)")
        .bind(&body.email)
        .bind(&body.reason)
        .execute(&state.pool)
        .await?;

    Ok(empty_success("Password reset request submitted successfully").into_response())
}
