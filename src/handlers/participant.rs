use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::user::{ChangePasswordRequest, OnboardingRequest, UpdateProfileRequest};
use crate::models::{Event, Organizer, Ticket, User};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

pub async fn onboarding_data(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    let organizers: Vec<(String, String)> =
        sqlx::query_as("SELECT name, category FROM organizers")
            .fetch_all(&state.pool)
            .await?;

    let mut categories = BTreeSet::new();
    let mut clubs = Vec::new();
    for (name, category) in organizers {
        if !name.is_empty() {
            clubs.push(name);
        }
        for c in category.split(',') {
            let trimmed = c.trim();
            if !trimmed.is_empty() {
                categories.insert(trimmed.to_string());
            }
        }
    }

    Ok(success(
        json!({ "categories": categories, "clubs": clubs }),
        "Onboarding data fetched",
    )
    .into_response())
}

pub async fn complete_onboarding(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<OnboardingRequest>,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    sqlx::query(
        "UPDATE users
         SET interested_topics = $2, interested_clubs = $3, filled = TRUE, updated_at = now()
         WHERE id = $1",
    )
    .bind(auth.0.user_id)
    .bind(&body.topics)
    .bind(&body.clubs)
    .execute(&state.pool)
    .await?;

    Ok(empty_success("Onboarding completed successfully").into_response())
}

pub async fn list_clubs(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    let clubs = sqlx::query_as::<_, Organizer>("SELECT * FROM organizers ORDER BY name")
        .fetch_all(&state.pool)
        .await?;
    let followed: Vec<String> =
        sqlx::query_scalar("SELECT interested_clubs FROM users WHERE id = $1")
            .bind(auth.0.user_id)
            .fetch_optional(&state.pool)
            .await?
            .unwrap_or_default();

    Ok(success(
        json!({ "clubs": clubs, "followed_clubs": followed }),
        "Clubs fetched",
    )
    .into_response())
}

pub async fn toggle_club(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    let club_name: String = sqlx::query_scalar("SELECT name FROM organizers WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Club not found".to_string()))?;
    if club_name.is_empty() {
        return Err(AppError::ValidationError(
            "Club has no name set".to_string(),
        ));
    }

    let mut followed: Vec<String> =
        sqlx::query_scalar("SELECT interested_clubs FROM users WHERE id = $1")
            .bind(auth.0.user_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if followed.contains(&club_name) {
        followed.retain(|c| c != &club_name);
    } else {
        followed.push(club_name);
    }

    sqlx::query("UPDATE users SET interested_clubs = $2, updated_at = now() WHERE id = $1")
        .bind(auth.0.user_id)
        .bind(&followed)
        .execute(&state.pool)
        .await?;

    Ok(success(json!({ "followed_clubs": followed }), "Follow status updated").into_response())
}

pub async fn club_details(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    let club = sqlx::query_as::<_, Organizer>("SELECT * FROM organizers WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Club not found".to_string()))?;

    let events = sqlx::query_as::<_, Event>(
        "SELECT * FROM events WHERE organizer_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(json!({ "club": club, "events": events }), "Club details fetched").into_response())
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth.0.user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(success(user, "Profile fetched").into_response())
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    let user = sqlx::query_as::<_, User>(
        "UPDATE users
         SET first_name = COALESCE($2, first_name),
             last_name = COALESCE($3, last_name),
             contact_number = COALESCE($4, contact_number),
             college = COALESCE($5, college),
             interested_topics = COALESCE($6, interested_topics),
             interested_clubs = COALESCE($7, interested_clubs),
             updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(auth.0.user_id)
    .bind(body.first_name)
    .bind(body.last_name)
    .bind(body.contact_number)
    .bind(body.college)
    .bind(body.interested_topics)
    .bind(body.interested_clubs)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(success(user, "Profile updated successfully").into_response())
}

pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth.0.user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.username != body.email {
        return Err(AppError::ValidationError(
            "Email does not match your account".to_string(),
        ));
    }
    if !bcrypt::verify(&body.old_password, &user.password_hash)? {
        return Err(AppError::AuthError("Incorrect old password".to_string()));
    }

    let password_hash = bcrypt::hash(&body.new_password, bcrypt::DEFAULT_COST)?;
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(user.id)
        .bind(&password_hash)
        .execute(&state.pool)
        .await?;

    Ok(empty_success("Password changed successfully").into_response())
}

pub async fn list_events(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    let followed: Vec<String> =
        sqlx::query_scalar("SELECT interested_clubs FROM users WHERE id = $1")
            .bind(auth.0.user_id)
            .fetch_optional(&state.pool)
            .await?
            .unwrap_or_default();

    let events = sqlx::query_as::<_, Event>("SELECT * FROM events")
        .fetch_all(&state.pool)
        .await?;

    let organizer_ids: Vec<Uuid> = events.iter().map(|e| e.organizer_id).collect();
    let organizers: Vec<(Uuid, String, String)> =
        sqlx::query_as("SELECT id, name, category FROM organizers WHERE id = ANY($1)")
            .bind(&organizer_ids)
            .fetch_all(&state.pool)
            .await?;

    // Events from followed clubs first, then newest first.
    let mut listing: Vec<(bool, Event, Option<(String, String)>)> = events
        .into_iter()
        .map(|event| {
            let organizer = organizers
                .iter()
                .find(|(id, _, _)| *id == event.organizer_id)
                .map(|(_, name, category)| (name.clone(), category.clone()));
            let is_followed = organizer
                .as_ref()
                .is_some_and(|(name, _)| followed.contains(name));
            (is_followed, event, organizer)
        })
        .collect();
    listing.sort_by_key(|(is_followed, event, _)| (!is_followed, Reverse(event.created_at)));

    let payload: Vec<serde_json::Value> = listing
        .into_iter()
        .map(|(_, event, organizer)| {
            let mut value = serde_json::to_value(&event).unwrap_or_default();
            if let Some(object) = value.as_object_mut() {
                object.insert(
                    "organizer".to_string(),
                    organizer
                        .map(|(name, category)| json!({ "name": name, "category": category }))
                        .unwrap_or(json!(null)),
                );
            }
            value
        })
        .collect();

    Ok(success(payload, "Events fetched").into_response())
}

/// Participant-facing detail view. The view counter bumps on every read.
pub async fn get_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    let event = sqlx::query_as::<_, Event>(
        "UPDATE events SET views = views + 1 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let organizer: Option<(String, String, String, String)> = sqlx::query_as(
        "SELECT name, category, description, contact FROM organizers WHERE id = $1",
    )
    .bind(event.organizer_id)
    .fetch_optional(&state.pool)
    .await?;

    let mut value = serde_json::to_value(&event).unwrap_or_default();
    if let Some(object) = value.as_object_mut() {
        object.insert(
            "organizer".to_string(),
            organizer
                .map(|(name, category, description, contact)| {
                    json!({
                        "name": name,
                        "category": category,
                        "description": description,
                        "contact": contact,
                    })
                })
                .unwrap_or(json!(null)),
        );
    }

    Ok(success(value, "Event fetched").into_response())
}

pub async fn my_events(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    let tickets = sqlx::query_as::<_, Ticket>(
        "SELECT * FROM tickets WHERE participant_id = $1 ORDER BY purchased_at DESC",
    )
    .bind(auth.0.user_id)
    .fetch_all(&state.pool)
    .await?;

    let event_ids: Vec<Uuid> = tickets.iter().map(|t| t.event_id).collect();
    let events: Vec<(Uuid, String, Uuid)> =
        sqlx::query_as("SELECT id, name, organizer_id FROM events WHERE id = ANY($1)")
            .bind(&event_ids)
            .fetch_all(&state.pool)
            .await?;
    let organizer_ids: Vec<Uuid> = events.iter().map(|(_, _, org)| *org).collect();
    let organizers: Vec<(Uuid, String)> =
        sqlx::query_as("SELECT id, name FROM organizers WHERE id = ANY($1)")
            .bind(&organizer_ids)
            .fetch_all(&state.pool)
            .await?;

    let listing: Vec<serde_json::Value> = tickets
        .iter()
        .map(|ticket| {
            let event = events.iter().find(|(id, _, _)| *id == ticket.event_id);
            let organizer_name = event.and_then(|(_, _, org)| {
                organizers
                    .iter()
                    .find(|(id, _)| id == org)
                    .map(|(_, name)| name.clone())
            });
            let mut value = serde_json::to_value(ticket).unwrap_or_default();
            if let Some(object) = value.as_object_mut() {
                object.insert(
                    "event".to_string(),
                    event
                        .map(|(id, name, _)| {
                            json!({
                                "id": id,
                                "name": name,
                                "organizer_name": organizer_name,
                            })
                        })
                        .unwrap_or(json!(null)),
                );
            }
            value
        })
        .collect();

    Ok(success(listing, "Participation history fetched").into_response())
}
