use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{Ticket, TicketStatus};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// The event must exist in the published partition and belong to the
/// caller before any attendance operation proceeds.
async fn require_owned_event(
    state: &AppState,
    event_id: Uuid,
    organizer_id: Uuid,
) -> Result<(), AppError> {
    let owned = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM events WHERE id = $1 AND organizer_id = $2",
    )
    .bind(event_id)
    .bind(organizer_id)
    .fetch_optional(&state.pool)
    .await?;

    if owned.is_none() {
        return Err(AppError::NotFound(
            "Event not found or unauthorized".to_string(),
        ));
    }
    Ok(())
}

pub async fn attendance_list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;
    require_owned_event(&state, event_id, auth.0.user_id).await?;

    let tickets = sqlx::query_as::<_, Ticket>(
        "SELECT * FROM tickets WHERE event_id = $1 ORDER BY purchased_at DESC",
    )
    .bind(event_id)
    .fetch_all(&state.pool)
    .await?;

    let participant_ids: Vec<Uuid> = tickets.iter().map(|t| t.participant_id).collect();
    let users: Vec<(Uuid, String, String, String)> = sqlx::query_as(
        "SELECT id, username, first_name, last_name FROM users WHERE id = ANY($1)",
    )
    .bind(&participant_ids)
    .fetch_all(&state.pool)
    .await?;

    let listing: Vec<serde_json::Value> = tickets
        .iter()
        .map(|ticket| {
            let user = users
                .iter()
                .find(|(uid, _, _, _)| *uid == ticket.participant_id);
            let mut value = serde_json::to_value(ticket).unwrap_or_default();
            if let Some(object) = value.as_object_mut() {
                object.insert(
                    "participant".to_string(),
                    match user {
                        Some((id, username, first, last)) => json!({
                            "id": id,
                            "username": username,
                            "first_name": first,
                            "last_name": last,
                        }),
                        None => json!(null),
                    },
                );
            }
            value
        })
        .collect();

    Ok(success(listing, "Attendance list fetched").into_response())
}

#[derive(Debug, Deserialize)]
pub struct ScanBody {
    pub ticket_id: String,
}

pub async fn scan_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<Uuid>,
    Json(body): Json<ScanBody>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;

    if body.ticket_id.is_empty() {
        return Err(AppError::ValidationError("Ticket ID is required".to_string()));
    }
    require_owned_event(&state, event_id, auth.0.user_id).await?;

    let ticket = sqlx::query_as::<_, Ticket>(
        "SELECT * FROM tickets WHERE ticket_code = $1 AND event_id = $2",
    )
    .bind(&body.ticket_id)
    .bind(event_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Invalid ticket for this event.".to_string()))?;

    let status = TicketStatus::parse(&ticket.status)
        .ok_or_else(|| AppError::InternalServerError("Unknown ticket status".to_string()))?;
    if !status.can_mark_attendance() {
        return Err(AppError::ValidationError(format!(
            "Ticket status is {status}. Cannot mark attendance."
        )));
    }
    if ticket.attendance_marked {
        return Err(AppError::ValidationError(
            "Duplicate Scan: Attendance already marked.".to_string(),
        ));
    }

    let ticket = sqlx::query_as::<_, Ticket>(
        "UPDATE tickets
         SET attendance_marked = TRUE, attendance_at = now(), updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(ticket.id)
    .fetch_one(&state.pool)
    .await?;

    Ok(success(ticket, "Attendance marked successfully").into_response())
}

#[derive(Debug, Deserialize)]
pub struct ManualOverrideBody {
    pub ticket_id: String,
    pub override_reason: String,
    pub attendance_marked: bool,
}

/// Operator correction: sets the attendance flag regardless of ticket
/// status, always recording the audit reason.
pub async fn manual_override(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<Uuid>,
    Json(body): Json<ManualOverrideBody>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;

    if body.ticket_id.is_empty() {
        return Err(AppError::ValidationError(
            "ticket_id, override_reason, and attendance_marked are required".to_string(),
        ));
    }
    require_owned_event(&state, event_id, auth.0.user_id).await?;

    let ticket = sqlx::query_as::<_, Ticket>(
        "UPDATE tickets
         SET attendance_marked = $3,
             attendance_at = CASE WHEN $3 THEN now() ELSE NULL END,
             manual_override = TRUE,
             override_reason = $4,
             updated_at = now()
         WHERE ticket_code = $1 AND event_id = $2
         RETURNING *",
    )
    .bind(&body.ticket_id)
    .bind(event_id)
    .bind(body.attendance_marked)
    .bind(&body.override_reason)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    Ok(success(ticket, "Manual override applied successfully").into_response())
}
