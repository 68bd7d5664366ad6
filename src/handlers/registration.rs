use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::ticket::{MerchandiseSelection, RegisterRequest, TicketDetails};
use crate::models::{Event, EventStatus, EventType, Ticket, TicketStatus, User};
use crate::services::mailer::{send_ticket_confirmation, TicketEmail};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};
use crate::utils::ticket_code::{derive_ticket_code, QrPayload};

/// Shared issuance routine: direct registrations and team completions both
/// derive the code, encode the QR payload, and insert through here. The
/// unique (event, participant) index is the final guard against duplicates.
pub async fn issue_ticket<'e, E>(
    executor: E,
    event: &Event,
    organizer_name: &str,
    user: &User,
    team_id: Option<Uuid>,
    team_name: Option<String>,
    details: Option<TicketDetails>,
) -> Result<Ticket, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let ticket_code = derive_ticket_code(organizer_name, &event.name, &user.username);
    let qr_data = QrPayload {
        ticket_id: ticket_code.clone(),
        event_id: event.id,
        event_name: event.name.clone(),
        participant_id: user.id,
        participant_name: user.username.clone(),
    }
    .encode();
    let kind = if event.event_type == EventType::Merchandise.as_str() {
        "merchandise"
    } else {
        "normal"
    };

    sqlx::query_as::<_, Ticket>(
        "INSERT INTO tickets
             (ticket_code, event_id, participant_id, qr_data, kind, team_id, team_name, details)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(&ticket_code)
    .bind(event.id)
    .bind(user.id)
    .bind(&qr_data)
    .bind(kind)
    .bind(team_id)
    .bind(team_name)
    .bind(details.map(SqlJson))
    .fetch_one(executor)
    .await
    .map_err(map_duplicate_ticket)
}

fn map_duplicate_ticket(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return AppError::Conflict("You are already registered for this event.".to_string());
        }
    }
    AppError::DatabaseError(e)
}

pub async fn register(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<Uuid>,
    Json(body): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    let existing = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM tickets WHERE event_id = $1 AND participant_id = $2",
    )
    .bind(event_id)
    .bind(auth.0.user_id)
    .fetch_optional(&state.pool)
    .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "You are already registered for this event.".to_string(),
        ));
    }

    // Capacity check and insert run under a row lock on the event, so
    // concurrent registrations serialize per event.
    let mut tx = state.pool.begin().await?;

    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let status = EventStatus::parse(&event.status)
        .ok_or_else(|| AppError::InternalServerError("Unknown event status".to_string()))?;
    if !status.accepts_registration() {
        return Err(AppError::ValidationError(
            "Event is not open for registration.".to_string(),
        ));
    }
    let event_type = EventType::parse(&event.event_type)
        .ok_or_else(|| AppError::InternalServerError("Unknown event type".to_string()))?;

    let mut requested = 1;
    let details = match event_type {
        EventType::Merchandise => {
            let selection = body
                .merchandise_selections
                .clone()
                .unwrap_or(MerchandiseSelection {
                    size: None,
                    color: None,
                    variant: None,
                    quantity: 1,
                });
            requested = selection.quantity.max(1);

            let purchase_limit = event
                .details
                .0
                .merchandise()
                .map(|m| m.purchase_limit)
                .unwrap_or(1);
            if requested > purchase_limit {
                return Err(AppError::ValidationError(format!(
                    "You can only purchase up to {purchase_limit} items."
                )));
            }
            if !selection.is_complete() {
                return Err(AppError::ValidationError(
                    "Please select size and color.".to_string(),
                ));
            }

            Some(TicketDetails::Merchandise {
                selection: MerchandiseSelection {
                    quantity: requested,
                    ..selection
                },
            })
        }
        EventType::Normal => Some(TicketDetails::Form {
            answers: body.answers.clone().unwrap_or_default(),
        }),
        EventType::Hackathon => None,
    };

    if let Some(limit) = event.registration_limit {
        let sold: i64 = match event_type {
            // Cancelled tickets keep their consumed capacity: the sums and
            // counts deliberately ignore status.
            EventType::Merchandise => {
                sqlx::query_scalar(
                    "SELECT COALESCE(SUM(COALESCE((details->'selection'->>'quantity')::INT, 0)), 0)::BIGINT
                     FROM tickets WHERE event_id = $1",
                )
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?
            }
            _ => {
                sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE event_id = $1")
                    .bind(event_id)
                    .fetch_one(&mut *tx)
                    .await?
            }
        };
        crate::models::ticket::check_capacity(event_type, Some(limit), sold, requested)
            .map_err(AppError::ValidationError)?;
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth.0.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let organizer_name: String =
        sqlx::query_as::<_, (String, String)>("SELECT name, email FROM organizers WHERE id = $1")
            .bind(event.organizer_id)
            .fetch_optional(&mut *tx)
            .await?
            .map(|(name, email)| if name.is_empty() { email } else { name })
            .unwrap_or_default();

    let ticket = issue_ticket(
        &mut *tx,
        &event,
        &organizer_name,
        &user,
        None,
        body.team_name.clone(),
        details,
    )
    .await?;

    tx.commit().await?;

    // Confirmation email is best-effort and never blocks the response.
    tokio::spawn(send_ticket_confirmation(
        state.config.smtp.clone(),
        TicketEmail {
            to: user.username.clone(),
            event_name: event.name.clone(),
            event_type: event.event_type.clone(),
            organizer_name,
            ticket_code: ticket.ticket_code.clone(),
        },
    ));

    Ok(created(ticket, "Registration successful!").into_response())
}

pub async fn cancel_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(ticket_id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    let ticket = sqlx::query_as::<_, Ticket>(
        "SELECT * FROM tickets WHERE id = $1 AND participant_id = $2",
    )
    .bind(ticket_id)
    .bind(auth.0.user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    let status = TicketStatus::parse(&ticket.status)
        .ok_or_else(|| AppError::InternalServerError("Unknown ticket status".to_string()))?;
    if !status.can_cancel() {
        return Err(AppError::ValidationError(
            "Only registered tickets can be cancelled".to_string(),
        ));
    }

    // Consumed capacity is not restored on cancellation.
    let ticket = sqlx::query_as::<_, Ticket>(
        "UPDATE tickets SET status = 'Cancelled', updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(ticket.id)
    .fetch_one(&state.pool)
    .await?;

    Ok(success(ticket, "Ticket cancelled successfully").into_response())
}
