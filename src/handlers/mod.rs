pub mod admin;
pub mod attendance;
pub mod auth;
pub mod events;
pub mod organizer;
pub mod participant;
pub mod registration;
pub mod teams;

use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::utils::response::success;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "felicity-api",
    };

    success(payload, "Health check successful").into_response()
}
