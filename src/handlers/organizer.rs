use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::auth::AuthUser;
use crate::models::organizer::UpdateOrganizerProfileRequest;
use crate::models::Organizer;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    auth.require_organizer()?;

    let organizer = sqlx::query_as::<_, Organizer>("SELECT * FROM organizers WHERE id = $1")
        .bind(auth.0.user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Organizer not found".to_string()))?;

    Ok(success(organizer, "Profile fetched").into_response())
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateOrganizerProfileRequest>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;

    let organizer = sqlx::query_as::<_, Organizer>(
        "UPDATE organizers
         SET name = COALESCE($2, name),
             category = COALESCE($3, category),
             description = COALESCE($4, description),
             contact = COALESCE($5, contact),
             discord_webhook = COALESCE($6, discord_webhook),
             updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(auth.0.user_id)
    .bind(body.name)
    .bind(body.category)
    .bind(body.description)
    .bind(body.contact)
    .bind(body.discord_webhook)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Organizer not found".to_string()))?;

    Ok(success(organizer, "Profile updated successfully").into_response())
}
