use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::organizer::CreateOrganizerRequest;
use crate::models::pass_reset::ResolvePassResetRequest;
use crate::models::{Organizer, OrganizerStatus, PassReset, PassResetStatus};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

pub async fn create_organizer(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateOrganizerRequest>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    if body.email.is_empty() || body.password.is_empty() {
        return Err(AppError::ValidationError(
            "Email and password are required".to_string(),
        ));
    }

    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM organizers WHERE email = $1")
        .bind(&body.email)
        .fetch_optional(&state.pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Organizer already exists".to_string()));
    }

    let password_hash = bcrypt::hash(&body.password, bcrypt::DEFAULT_COST)?;
    let organizer = sqlx::query_as::<_, Organizer>(
        "INSERT INTO organizers (email, password_hash, name, category, description, contact)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(&body.email)
    .bind(&password_hash)
    .bind(&body.name)
    .bind(&body.category)
    .bind(&body.description)
    .bind(&body.contact)
    .fetch_one(&state.pool)
    .await?;

    Ok(created(organizer, "Organizer created successfully!").into_response())
}

pub async fn list_organizers(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let organizers =
        sqlx::query_as::<_, Organizer>("SELECT * FROM organizers ORDER BY created_at DESC")
            .fetch_all(&state.pool)
            .await?;

    Ok(success(organizers, "Organizers fetched").into_response())
}

pub async fn delete_organizer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let deleted = sqlx::query_scalar::<_, Uuid>("DELETE FROM organizers WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    if deleted.is_none() {
        return Err(AppError::NotFound("Organizer not found".to_string()));
    }

    Ok(empty_success("Organizer deleted successfully").into_response())
}

#[derive(Debug, Deserialize)]
pub struct ArchiveBody {
    pub status: String,
}

pub async fn archive_organizer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ArchiveBody>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let status = OrganizerStatus::parse(&body.status)
        .ok_or_else(|| AppError::ValidationError("Invalid status value".to_string()))?;

    let organizer = sqlx::query_as::<_, Organizer>(
        "UPDATE organizers SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Organizer not found".to_string()))?;

    Ok(success(organizer, format!("Organizer successfully {status}")).into_response())
}

pub async fn list_password_resets(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let requests =
        sqlx::query_as::<_, PassReset>("SELECT * FROM pass_resets ORDER BY created_at DESC")
            .fetch_all(&state.pool)
            .await?;

    Ok(success(requests, "Password reset requests fetched").into_response())
}

pub async fn resolve_password_reset(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ResolvePassResetRequest>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let request = sqlx::query_as::<_, PassReset>("SELECT * FROM pass_resets WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Reset request not found".to_string()))?;

    let status = PassResetStatus::parse(&request.status).ok_or_else(|| {
        AppError::InternalServerError("Unknown password reset status".to_string())
    })?;
    if !status.can_process() {
        return Err(AppError::ValidationError(
            "Request is already processed".to_string(),
        ));
    }

    match body.action.as_str() {
        "Reject" => {
            sqlx::query("UPDATE pass_resets SET status = 'Rejected', updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&state.pool)
                .await?;
            Ok(empty_success("Request rejected successfully").into_response())
        }
        "Approve" => {
            let new_password = body.new_password.as_deref().ok_or_else(|| {
                AppError::ValidationError(
                    "Valid new password is required to approve".to_string(),
                )
            })?;

            apply_password_reset(&state, &request.club_email, new_password).await?;

            sqlx::query("UPDATE pass_resets SET status = 'Approved', updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&state.pool)
                .await?;
            Ok(empty_success("Password reset and request approved successfully").into_response())
        }
        _ => Err(AppError::ValidationError("Invalid action".to_string())),
    }
}

/// Single identity-resolution point for password resets: the login string
/// names an organizer, and occasionally a participant account under the
/// same email. Both get the new hash.
async fn apply_password_reset(
    state: &AppState,
    login: &str,
    new_password: &str,
) -> Result<(), AppError> {
    let organizer = sqlx::query_scalar::<_, Uuid>("SELECT id FROM organizers WHERE email = $1")
        .bind(login)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Club/Organizer could not be found".to_string()))?;

    let password_hash = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)?;

    sqlx::query("UPDATE organizers SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(organizer)
        .bind(&password_hash)
        .execute(&state.pool)
        .await?;

    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE username = $1")
        .bind(login)
        .bind(&password_hash)
        .execute(&state.pool)
        .await?;

    Ok(())
}
