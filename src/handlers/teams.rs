use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::handlers::registration::issue_ticket;
use crate::models::team::{generate_invite_code, is_complete, CreateTeamRequest, JoinTeamRequest};
use crate::models::{ChatMessage, Event, Team, User};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

const INVITE_CODE_ATTEMPTS: usize = 5;

async fn organizer_display_name(
    executor: impl sqlx::PgExecutor<'_>,
    organizer_id: Uuid,
) -> Result<String, AppError> {
    let name = sqlx::query_as::<_, (String, String)>(
        "SELECT name, email FROM organizers WHERE id = $1",
    )
    .bind(organizer_id)
    .fetch_optional(executor)
    .await?
    .map(|(name, email)| if name.is_empty() { email } else { name })
    .unwrap_or_default();
    Ok(name)
}

pub async fn create_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateTeamRequest>,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    if body.name.is_empty() {
        return Err(AppError::ValidationError(
            "Missing required fields".to_string(),
        ));
    }
    if body.size < 1 {
        return Err(AppError::ValidationError(
            "Team size must be at least 1".to_string(),
        ));
    }

    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(body.event_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    // Invite codes are random; the unique constraint arbitrates the rare
    // collision, so retry with a fresh code.
    let mut team: Option<Team> = None;
    for _ in 0..INVITE_CODE_ATTEMPTS {
        let invite_code = generate_invite_code();
        let result = sqlx::query_as::<_, Team>(
            "INSERT INTO teams (name, event_id, leader_id, size, invite_code, is_complete)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(&body.name)
        .bind(body.event_id)
        .bind(auth.0.user_id)
        .bind(body.size)
        .bind(&invite_code)
        .bind(body.size == 1)
        .fetch_one(&state.pool)
        .await;

        match result {
            Ok(inserted) => {
                team = Some(inserted);
                break;
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let team = team.ok_or_else(|| {
        AppError::InternalServerError("Could not allocate a unique invite code".to_string())
    })?;

    // The leader is the first accepted member.
    sqlx::query("INSERT INTO team_members (team_id, user_id, status) VALUES ($1, $2, 'accepted')")
        .bind(team.id)
        .bind(auth.0.user_id)
        .execute(&state.pool)
        .await?;

    // A solo team is complete at creation: issue the leader's ticket now.
    if team.is_complete {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(auth.0.user_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let organizer_name = organizer_display_name(&state.pool, event.organizer_id).await?;

        issue_ticket(
            &state.pool,
            &event,
            &organizer_name,
            &user,
            Some(team.id),
            Some(team.name.clone()),
            None,
        )
        .await?;
    }

    Ok(created(team, "Team created successfully").into_response())
}

pub async fn join_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<JoinTeamRequest>,
) -> Result<Response, AppError> {
    auth.require_participant()?;

    if body.invite_code.is_empty() {
        return Err(AppError::ValidationError(
            "Invite code is required".to_string(),
        ));
    }

    // The team row is locked for the whole join, so two participants
    // racing for the last slot serialize and the loser sees a full team.
    let mut tx = state.pool.begin().await?;

    let team = sqlx::query_as::<_, Team>(
        "SELECT * FROM teams WHERE invite_code = $1 FOR UPDATE",
    )
    .bind(body.invite_code.to_uppercase())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Invalid invite code".to_string()))?;

    if team.is_complete {
        return Err(AppError::ValidationError(
            "This team is already full".to_string(),
        ));
    }

    let already_member = sqlx::query_scalar::<_, Uuid>(
        "SELECT user_id FROM team_members WHERE team_id = $1 AND user_id = $2",
    )
    .bind(team.id)
    .bind(auth.0.user_id)
    .fetch_optional(&mut *tx)
    .await?;
    if already_member.is_some() {
        return Err(AppError::ValidationError(
            "You are already a member of this team".to_string(),
        ));
    }

    sqlx::query("INSERT INTO team_members (team_id, user_id, status) VALUES ($1, $2, 'accepted')")
        .bind(team.id)
        .bind(auth.0.user_id)
        .execute(&mut *tx)
        .await?;

    let member_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM team_members WHERE team_id = $1 AND status = 'accepted'",
    )
    .bind(team.id)
    .fetch_one(&mut *tx)
    .await?;

    let mut completed_team = team.clone();
    if is_complete(member_count, team.size) {
        completed_team = sqlx::query_as::<_, Team>(
            "UPDATE teams SET is_complete = TRUE, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(team.id)
        .fetch_one(&mut *tx)
        .await?;

        // Completion triggers one ticket per member, all in this
        // transaction: either the whole batch lands or the join fails.
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(team.event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        let organizer_name = organizer_display_name(&mut *tx, event.organizer_id).await?;

        let members = sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u
             JOIN team_members tm ON tm.user_id = u.id
             WHERE tm.team_id = $1",
        )
        .bind(team.id)
        .fetch_all(&mut *tx)
        .await?;

        for member in &members {
            issue_ticket(
                &mut *tx,
                &event,
                &organizer_name,
                member,
                Some(team.id),
                Some(team.name.clone()),
                None,
            )
            .await?;
        }
    }

    tx.commit().await?;

    Ok(success(completed_team, "Successfully joined team").into_response())
}

pub async fn my_teams(State(state): State<AppState>, auth: AuthUser) -> Result<Response, AppError> {
    let teams = sqlx::query_as::<_, Team>(
        "SELECT t.* FROM teams t
         JOIN team_members tm ON tm.team_id = t.id
         WHERE tm.user_id = $1
         ORDER BY t.created_at DESC",
    )
    .bind(auth.0.user_id)
    .fetch_all(&state.pool)
    .await?;

    let team_ids: Vec<Uuid> = teams.iter().map(|t| t.id).collect();
    let event_ids: Vec<Uuid> = teams.iter().map(|t| t.event_id).collect();

    let members: Vec<(Uuid, Uuid, String, String, String, String)> = sqlx::query_as(
        "SELECT tm.team_id, u.id, u.username, u.first_name, u.last_name, tm.status
         FROM team_members tm
         JOIN users u ON u.id = tm.user_id
         WHERE tm.team_id = ANY($1)
         ORDER BY tm.joined_at",
    )
    .bind(&team_ids)
    .fetch_all(&state.pool)
    .await?;

    let events: Vec<(Uuid, String, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
        "SELECT id, name, start_date, end_date FROM events WHERE id = ANY($1)",
    )
    .bind(&event_ids)
    .fetch_all(&state.pool)
    .await?;

    let listing: Vec<serde_json::Value> = teams
        .iter()
        .map(|team| {
            let team_members: Vec<serde_json::Value> = members
                .iter()
                .filter(|(team_id, ..)| *team_id == team.id)
                .map(|(_, user_id, username, first, last, status)| {
                    json!({
                        "user_id": user_id,
                        "username": username,
                        "first_name": first,
                        "last_name": last,
                        "status": status,
                    })
                })
                .collect();
            let leader = members
                .iter()
                .find(|(team_id, user_id, ..)| *team_id == team.id && *user_id == team.leader_id)
                .map(|(_, user_id, username, first, last, _)| {
                    json!({
                        "user_id": user_id,
                        "username": username,
                        "first_name": first,
                        "last_name": last,
                    })
                });
            let event = events
                .iter()
                .find(|(id, ..)| *id == team.event_id)
                .map(|(id, name, start_date, end_date)| {
                    json!({
                        "id": id,
                        "name": name,
                        "start_date": start_date,
                        "end_date": end_date,
                    })
                });

            let mut value = serde_json::to_value(team).unwrap_or_default();
            if let Some(object) = value.as_object_mut() {
                object.insert("members".to_string(), json!(team_members));
                object.insert("leader".to_string(), leader.unwrap_or(json!(null)));
                object.insert("event".to_string(), event.unwrap_or(json!(null)));
            }
            value
        })
        .collect();

    Ok(success(listing, "Teams fetched").into_response())
}

pub async fn team_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1")
        .bind(team_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))?;

    let is_member = sqlx::query_scalar::<_, Uuid>(
        "SELECT user_id FROM team_members WHERE team_id = $1 AND user_id = $2",
    )
    .bind(team.id)
    .bind(auth.0.user_id)
    .fetch_optional(&state.pool)
    .await?;
    if is_member.is_none() && team.leader_id != auth.0.user_id {
        return Err(AppError::Forbidden(
            "Not a member of this team".to_string(),
        ));
    }

    let messages = sqlx::query_as::<_, ChatMessage>(
        "SELECT * FROM chat_messages WHERE team_id = $1 ORDER BY created_at ASC",
    )
    .bind(team.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(messages, "Messages fetched").into_response())
}
