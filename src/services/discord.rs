//! Best-effort Discord webhook notification fired when an event is
//! published. Runs detached so it never blocks or fails the publishing
//! response.

use serde_json::json;
use tracing::{error, info};

use crate::models::Event;

pub fn notify_event_published(
    http: reqwest::Client,
    webhook_url: String,
    event: &Event,
    organizer_name: &str,
) {
    if webhook_url.is_empty() {
        return;
    }

    let payload = json!({
        "content": format!("🎉 **New Event Published by {}!** 🎉", organizer_name),
        "embeds": [{
            "title": event.name,
            "description": event.description,
            "color": 3447003,
            "fields": [
                { "name": "Type", "value": event.event_type, "inline": true },
                { "name": "Start Date", "value": event.start_date.format("%d/%m/%Y").to_string(), "inline": true },
                { "name": "Registration Deadline", "value": event.registration_deadline.format("%d/%m/%Y").to_string(), "inline": true }
            ],
            "footer": { "text": "Felicity Event Management System" }
        }]
    });

    tokio::spawn(async move {
        match http.post(&webhook_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Discord notification sent successfully");
            }
            Ok(response) => {
                error!(status = %response.status(), "Discord webhook rejected the notification");
            }
            Err(e) => {
                error!(error = %e, "Failed to send Discord notification");
            }
        }
    });
}
