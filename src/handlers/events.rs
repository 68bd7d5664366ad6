use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::event::{
    parse_event_date, validate_patch, CreateEventRequest, UpdateEventRequest,
};
use crate::models::{DraftEvent, Event, EventDetails, EventStatus, EventType, Organizer, Ticket};
use crate::services::discord;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

fn parse_required_date(raw: &str, field: &str) -> Result<DateTime<Utc>, AppError> {
    parse_event_date(raw)
        .ok_or_else(|| AppError::ValidationError(format!("Invalid {field}, expected dd/mm/yyyy")))
}

fn parse_optional_date(
    raw: Option<&str>,
    field: &str,
) -> Result<Option<DateTime<Utc>>, AppError> {
    raw.map(|r| parse_required_date(r, field)).transpose()
}

pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateEventRequest>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;

    let event_type = EventType::parse(&body.event_type)
        .ok_or_else(|| AppError::ValidationError("Invalid event type".to_string()))?;
    let registration_deadline =
        parse_required_date(&body.registration_deadline, "registration deadline")?;
    let start_date = parse_required_date(&body.start_date, "start date")?;
    let end_date = parse_required_date(&body.end_date, "end date")?;

    let details = EventDetails::for_event_type(
        event_type,
        body.custom_fields.clone(),
        body.merchandise_details.clone(),
    );
    let fee = body.registration_fee.unwrap_or(Decimal::ZERO);
    let publish = body.action.as_deref() == Some("publish");

    if publish {
        let event = sqlx::query_as::<_, Event>(
            "INSERT INTO events
                 (organizer_id, name, description, event_type, eligibility,
                  registration_deadline, start_date, end_date,
                  registration_limit, registration_fee, tags, status, details)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'Published', $12)
             RETURNING *",
        )
        .bind(auth.0.user_id)
        .bind(&body.name)
        .bind(&body.description)
        .bind(event_type.as_str())
        .bind(&body.eligibility)
        .bind(registration_deadline)
        .bind(start_date)
        .bind(end_date)
        .bind(body.registration_limit)
        .bind(fee)
        .bind(&body.tags)
        .bind(SqlJson(details))
        .fetch_one(&state.pool)
        .await?;

        notify_webhook(&state, &event).await?;

        Ok(created(event, "Event published successfully!").into_response())
    } else {
        let draft = sqlx::query_as::<_, DraftEvent>(
            "INSERT INTO draft_events
                 (organizer_id, name, description, event_type, eligibility,
                  registration_deadline, start_date, end_date,
                  registration_limit, registration_fee, tags, status, details)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'Draft', $12)
             RETURNING *",
        )
        .bind(auth.0.user_id)
        .bind(&body.name)
        .bind(&body.description)
        .bind(event_type.as_str())
        .bind(&body.eligibility)
        .bind(registration_deadline)
        .bind(start_date)
        .bind(end_date)
        .bind(body.registration_limit)
        .bind(fee)
        .bind(&body.tags)
        .bind(SqlJson(details))
        .fetch_one(&state.pool)
        .await?;

        Ok(created(draft, "Event saved to draft successfully!").into_response())
    }
}

async fn notify_webhook(state: &AppState, event: &Event) -> Result<(), AppError> {
    let organizer = sqlx::query_as::<_, Organizer>("SELECT * FROM organizers WHERE id = $1")
        .bind(event.organizer_id)
        .fetch_optional(&state.pool)
        .await?;

    if let Some(organizer) = organizer {
        discord::notify_event_published(
            state.http.clone(),
            organizer.discord_webhook.clone(),
            event,
            organizer.display_name(),
        );
    }
    Ok(())
}

pub async fn list_events(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    auth.require_organizer()?;

    let drafts = sqlx::query_as::<_, DraftEvent>(
        "SELECT * FROM draft_events WHERE organizer_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.0.user_id)
    .fetch_all(&state.pool)
    .await?;

    let events = sqlx::query_as::<_, Event>(
        "SELECT * FROM events WHERE organizer_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.0.user_id)
    .fetch_all(&state.pool)
    .await?;

    let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
    let counts: Vec<(Uuid, i64)> = sqlx::query_as(
        "SELECT event_id,
                COALESCE(SUM(CASE WHEN kind = 'merchandise'
                                  THEN COALESCE((details->'selection'->>'quantity')::INT, 1)
                                  ELSE 1 END), 0)::BIGINT
         FROM tickets
         WHERE event_id = ANY($1) AND status IN ('Registered', 'Completed')
         GROUP BY event_id",
    )
    .bind(&event_ids)
    .fetch_all(&state.pool)
    .await?;

    let mut listing: Vec<serde_json::Value> = Vec::with_capacity(drafts.len() + events.len());
    for draft in &drafts {
        listing.push(serde_json::to_value(draft).unwrap_or_default());
    }
    for event in &events {
        let sold = counts
            .iter()
            .find(|(id, _)| *id == event.id)
            .map(|(_, sold)| *sold)
            .unwrap_or(0);
        let mut value = serde_json::to_value(event).unwrap_or_default();
        if let Some(object) = value.as_object_mut() {
            object.insert("registered_count".to_string(), json!(sold));
        }
        listing.push(value);
    }

    Ok(success(listing, "Events fetched").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;

    let draft = sqlx::query_as::<_, DraftEvent>(
        "SELECT * FROM draft_events WHERE id = $1 AND organizer_id = $2",
    )
    .bind(id)
    .bind(auth.0.user_id)
    .fetch_optional(&state.pool)
    .await?;
    if let Some(draft) = draft {
        return Ok(success(draft, "Event fetched").into_response());
    }

    let event =
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 AND organizer_id = $2")
            .bind(id)
            .bind(auth.0.user_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    Ok(success(event, "Event fetched").into_response())
}

/// Rebuild the type-specific payload when the patch touches it. The
/// branch follows the (possibly patched) event type; content from the
/// other branch is discarded.
fn patched_details(
    current_type: EventType,
    current: &EventDetails,
    patch: &UpdateEventRequest,
) -> Result<Option<EventDetails>, AppError> {
    let touches_details = patch.event_type.is_some()
        || patch.custom_fields.is_some()
        || patch.merchandise_details.is_some();
    if !touches_details {
        return Ok(None);
    }

    let effective_type = match &patch.event_type {
        Some(raw) => EventType::parse(raw)
            .ok_or_else(|| AppError::ValidationError("Invalid event type".to_string()))?,
        None => current_type,
    };

    let custom_fields = patch.custom_fields.clone().or_else(|| match current {
        EventDetails::Form { custom_fields } => Some(custom_fields.clone()),
        EventDetails::Merchandise { .. } => None,
    });
    let merchandise = patch.merchandise_details.clone().or_else(|| {
        current.merchandise().cloned()
    });

    Ok(Some(EventDetails::for_event_type(
        effective_type,
        custom_fields,
        merchandise,
    )))
}

pub async fn update_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateEventRequest>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;

    if let Some(raw) = &patch.status {
        if EventStatus::parse(raw).is_none() {
            return Err(AppError::ValidationError("Invalid status value".to_string()));
        }
    }

    let draft = sqlx::query_as::<_, DraftEvent>(
        "SELECT * FROM draft_events WHERE id = $1 AND organizer_id = $2",
    )
    .bind(id)
    .bind(auth.0.user_id)
    .fetch_optional(&state.pool)
    .await?;

    if let Some(draft) = draft {
        return update_draft(&state, draft, patch).await;
    }

    let event =
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 AND organizer_id = $2")
            .bind(id)
            .bind(auth.0.user_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    update_published(&state, event, patch).await
}

async fn update_draft(
    state: &AppState,
    draft: DraftEvent,
    patch: UpdateEventRequest,
) -> Result<Response, AppError> {
    let current_type = EventType::parse(&draft.event_type)
        .ok_or_else(|| AppError::InternalServerError("Unknown event type".to_string()))?;

    let registration_deadline = parse_optional_date(
        patch.registration_deadline.as_deref(),
        "registration deadline",
    )?;
    let start_date = parse_optional_date(patch.start_date.as_deref(), "start date")?;
    let end_date = parse_optional_date(patch.end_date.as_deref(), "end date")?;
    let details = patched_details(current_type, &draft.details.0, &patch)?;

    let publishing = patch.status.as_deref() == Some("Published");

    let mut tx = state.pool.begin().await?;

    sqlx::query(
        "UPDATE draft_events SET
             name = COALESCE($2, name),
             description = COALESCE($3, description),
             event_type = COALESCE($4, event_type),
             eligibility = COALESCE($5, eligibility),
             registration_deadline = COALESCE($6, registration_deadline),
             start_date = COALESCE($7, start_date),
             end_date = COALESCE($8, end_date),
             registration_limit = COALESCE($9, registration_limit),
             registration_fee = COALESCE($10, registration_fee),
             tags = COALESCE($11, tags),
             status = COALESCE($12, status),
             details = COALESCE($13, details),
             updated_at = now()
         WHERE id = $1",
    )
    .bind(draft.id)
    .bind(&patch.name)
    .bind(&patch.description)
    .bind(&patch.event_type)
    .bind(&patch.eligibility)
    .bind(registration_deadline)
    .bind(start_date)
    .bind(end_date)
    .bind(patch.registration_limit)
    .bind(patch.registration_fee)
    .bind(&patch.tags)
    .bind(if publishing { None } else { patch.status.clone() })
    .bind(details.map(SqlJson))
    .execute(&mut *tx)
    .await?;

    if publishing {
        // One-way move into the published partition, same identity.
        let event = sqlx::query_as::<_, Event>(
            "INSERT INTO events
                 (id, organizer_id, name, description, event_type, eligibility,
                  registration_deadline, start_date, end_date,
                  registration_limit, registration_fee, tags, status, details, created_at)
             SELECT id, organizer_id, name, description, event_type, eligibility,
                    registration_deadline, start_date, end_date,
                    registration_limit, registration_fee, tags, 'Published', details, created_at
             FROM draft_events WHERE id = $1
             RETURNING *",
        )
        .bind(draft.id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM draft_events WHERE id = $1")
            .bind(draft.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        notify_webhook(state, &event).await?;
        return Ok(empty_success("Event updated successfully").into_response());
    }

    tx.commit().await?;
    Ok(empty_success("Event updated successfully").into_response())
}

async fn update_published(
    state: &AppState,
    event: Event,
    patch: UpdateEventRequest,
) -> Result<Response, AppError> {
    let status = EventStatus::parse(&event.status)
        .ok_or_else(|| AppError::InternalServerError("Unknown event status".to_string()))?;

    validate_patch(
        status,
        &patch,
        event.registration_deadline,
        event.registration_limit,
    )
    .map_err(AppError::ValidationError)?;

    let registration_deadline = parse_optional_date(
        patch.registration_deadline.as_deref(),
        "registration deadline",
    )?;

    sqlx::query(
        "UPDATE events SET
             status = COALESCE($2, status),
             description = COALESCE($3, description),
             registration_deadline = COALESCE($4, registration_deadline),
             registration_limit = COALESCE($5, registration_limit),
             updated_at = now()
         WHERE id = $1",
    )
    .bind(event.id)
    .bind(&patch.status)
    .bind(&patch.description)
    .bind(registration_deadline)
    .bind(patch.registration_limit)
    .execute(&state.pool)
    .await?;

    Ok(empty_success("Event updated successfully").into_response())
}

pub async fn delete_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;

    let deleted = sqlx::query_scalar::<_, Uuid>(
        "DELETE FROM draft_events WHERE id = $1 AND organizer_id = $2 RETURNING id",
    )
    .bind(id)
    .bind(auth.0.user_id)
    .fetch_optional(&state.pool)
    .await?;
    if deleted.is_some() {
        return Ok(empty_success("Draft deleted successfully").into_response());
    }

    let published = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM events WHERE id = $1 AND organizer_id = $2",
    )
    .bind(id)
    .bind(auth.0.user_id)
    .fetch_optional(&state.pool)
    .await?;
    if published.is_some() {
        return Err(AppError::ValidationError(
            "Only draft events can be deleted".to_string(),
        ));
    }

    Err(AppError::NotFound("Event not found".to_string()))
}

pub async fn event_participants(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;

    // Resolve across both partitions; ownership gates access.
    let summary: Option<(Uuid, String, String, String, Decimal, Option<i32>)> = sqlx::query_as(
        "SELECT organizer_id, name, status, event_type, registration_fee, registration_limit
         FROM events WHERE id = $1
         UNION ALL
         SELECT organizer_id, name, status, event_type, registration_fee, registration_limit
         FROM draft_events WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;

    let (organizer_id, name, status, event_type, fee, limit) =
        summary.ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    if organizer_id != auth.0.user_id {
        return Err(AppError::Forbidden(
            "Access denied. Not your event.".to_string(),
        ));
    }

    let tickets = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE event_id = $1")
        .bind(id)
        .fetch_all(&state.pool)
        .await?;

    let participant_ids: Vec<Uuid> = tickets.iter().map(|t| t.participant_id).collect();
    let users: Vec<(Uuid, String, String, String)> = sqlx::query_as(
        "SELECT id, username, first_name, last_name FROM users WHERE id = ANY($1)",
    )
    .bind(&participant_ids)
    .fetch_all(&state.pool)
    .await?;

    let mut total_sales: i64 = 0;
    let mut total_revenue = Decimal::ZERO;
    let mut total_attended: i64 = 0;

    let participants: Vec<serde_json::Value> = tickets
        .iter()
        .map(|ticket| {
            let quantity = i64::from(
                ticket
                    .details
                    .as_ref()
                    .map(|d| d.0.quantity())
                    .unwrap_or(1),
            );
            if matches!(ticket.status.as_str(), "Registered" | "Completed") {
                total_sales += quantity;
                total_revenue += Decimal::from(quantity) * fee;
            }
            if ticket.status == "Completed" {
                total_attended += quantity;
            }

            let user = users.iter().find(|(uid, _, _, _)| *uid == ticket.participant_id);
            let participant_name = user
                .map(|(_, _, first, last)| format!("{first} {last}").trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown".to_string());
            let participant_email = user
                .map(|(_, username, _, _)| username.clone())
                .unwrap_or_else(|| "Unknown".to_string());

            json!({
                "id": ticket.id,
                "ticket_code": &ticket.ticket_code,
                "participant_name": participant_name,
                "participant_email": participant_email,
                "kind": &ticket.kind,
                "status": &ticket.status,
                "purchased_at": ticket.purchased_at,
                "team_name": &ticket.team_name,
                "details": &ticket.details,
            })
        })
        .collect();

    Ok(success(
        json!({
            "event_details": {
                "name": name,
                "status": status,
                "event_type": event_type,
                "registration_fee": fee,
                "registration_limit": limit,
            },
            "analytics": {
                "total_sales": total_sales,
                "total_revenue": total_revenue,
                "total_attended": total_attended,
            },
            "participants": participants,
        }),
        "Participants fetched",
    )
    .into_response())
}
