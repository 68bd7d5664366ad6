use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// A published event, visible to participants.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub name: String,
    pub description: String,
    pub event_type: String,
    pub eligibility: Option<String>,
    pub registration_deadline: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_limit: Option<i32>,
    pub registration_fee: Decimal,
    pub tags: Option<String>,
    pub status: String,
    pub views: i32,
    pub details: Json<EventDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A draft event. Same shape as [`Event`] minus the view counter; lives in
/// its own table until published.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DraftEvent {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub name: String,
    pub description: String,
    pub event_type: String,
    pub eligibility: Option<String>,
    pub registration_deadline: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_limit: Option<i32>,
    pub registration_fee: Decimal,
    pub tags: Option<String>,
    pub status: String,
    pub details: Json<EventDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Merchandise,
    Hackathon,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Normal => "normal",
            EventType::Merchandise => "merchandise",
            EventType::Hackathon => "hackathon",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(EventType::Normal),
            "merchandise" => Some(EventType::Merchandise),
            "hackathon" => Some(EventType::Hackathon),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Draft,
    Published,
    Ongoing,
    Completed,
    Closed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Draft => "Draft",
            EventStatus::Published => "Published",
            EventStatus::Ongoing => "Ongoing",
            EventStatus::Completed => "Completed",
            EventStatus::Closed => "Closed",
            EventStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Draft" => Some(EventStatus::Draft),
            "Published" => Some(EventStatus::Published),
            "Ongoing" => Some(EventStatus::Ongoing),
            "Completed" => Some(EventStatus::Completed),
            "Closed" => Some(EventStatus::Closed),
            "Cancelled" => Some(EventStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states reject every edit.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EventStatus::Closed | EventStatus::Completed | EventStatus::Cancelled
        )
    }

    pub fn accepts_registration(self) -> bool {
        matches!(self, EventStatus::Published | EventStatus::Ongoing)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific event payload. Normal and hackathon events carry a custom
/// registration form; merchandise events carry stock attributes. The variant
/// must agree with the event's type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetails {
    Form { custom_fields: Vec<CustomField> },
    Merchandise { merchandise: MerchandiseDetails },
}

impl EventDetails {
    pub fn matches_event_type(&self, event_type: EventType) -> bool {
        match self {
            EventDetails::Form { .. } => {
                matches!(event_type, EventType::Normal | EventType::Hackathon)
            }
            EventDetails::Merchandise { .. } => matches!(event_type, EventType::Merchandise),
        }
    }

    /// Build the payload branch selected by the event type, discarding
    /// whatever fields belong to the other branch.
    pub fn for_event_type(
        event_type: EventType,
        custom_fields: Option<Vec<CustomField>>,
        merchandise: Option<MerchandiseDetails>,
    ) -> Self {
        match event_type {
            EventType::Normal | EventType::Hackathon => EventDetails::Form {
                custom_fields: custom_fields.unwrap_or_default(),
            },
            EventType::Merchandise => EventDetails::Merchandise {
                merchandise: merchandise.unwrap_or_default(),
            },
        }
    }

    pub fn merchandise(&self) -> Option<&MerchandiseDetails> {
        match self {
            EventDetails::Merchandise { merchandise } => Some(merchandise),
            EventDetails::Form { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Dropdown,
    Checkbox,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MerchandiseDetails {
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(default = "default_purchase_limit")]
    pub purchase_limit: i32,
}

fn default_purchase_limit() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub description: String,
    pub event_type: String,
    pub eligibility: Option<String>,
    pub registration_deadline: String,
    pub start_date: String,
    pub end_date: String,
    pub registration_limit: Option<i32>,
    pub registration_fee: Option<Decimal>,
    pub tags: Option<String>,
    pub action: Option<String>,
    pub custom_fields: Option<Vec<CustomField>>,
    pub merchandise_details: Option<MerchandiseDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub event_type: Option<String>,
    pub eligibility: Option<String>,
    pub registration_deadline: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub registration_limit: Option<i32>,
    pub registration_fee: Option<Decimal>,
    pub tags: Option<String>,
    pub status: Option<String>,
    pub custom_fields: Option<Vec<CustomField>>,
    pub merchandise_details: Option<MerchandiseDetails>,
}

impl UpdateEventRequest {
    /// Names of the fields the caller actually supplied, for the
    /// status-gated allow-list checks.
    pub fn provided_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.event_type.is_some() {
            fields.push("event_type");
        }
        if self.eligibility.is_some() {
            fields.push("eligibility");
        }
        if self.registration_deadline.is_some() {
            fields.push("registration_deadline");
        }
        if self.start_date.is_some() {
            fields.push("start_date");
        }
        if self.end_date.is_some() {
            fields.push("end_date");
        }
        if self.registration_limit.is_some() {
            fields.push("registration_limit");
        }
        if self.registration_fee.is_some() {
            fields.push("registration_fee");
        }
        if self.tags.is_some() {
            fields.push("tags");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.custom_fields.is_some() {
            fields.push("custom_fields");
        }
        if self.merchandise_details.is_some() {
            fields.push("merchandise_details");
        }
        fields
    }
}

/// Lenient event date parse: `dd/mm/yyyy` first, RFC 3339 as fallback.
pub fn parse_event_date(input: &str) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = input.split('/').collect();
    if parts.len() == 3 {
        let day: u32 = parts[0].parse().ok()?;
        let month: u32 = parts[1].parse().ok()?;
        let year: i32 = parts[2].parse().ok()?;
        return Some(
            NaiveDate::from_ymd_opt(year, month, day)?
                .and_hms_opt(0, 0, 0)?
                .and_utc(),
        );
    }
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Enforce the status-gated edit rules on a published/draft event patch.
///
/// Terminal states are immutable; Ongoing accepts only a status change;
/// Published accepts {status, description, deadline (extend-only),
/// limit (increase-only)}; drafts accept anything.
pub fn validate_patch(
    status: EventStatus,
    patch: &UpdateEventRequest,
    current_deadline: DateTime<Utc>,
    current_limit: Option<i32>,
) -> Result<(), String> {
    if status.is_terminal() {
        return Err("Cannot edit an event in closed, completed, or cancelled status.".to_string());
    }

    let provided = patch.provided_fields();

    if status == EventStatus::Ongoing {
        if provided.iter().any(|f| *f != "status") {
            return Err(
                "Ongoing events can only have their status updated (e.g., to Completed or Closed)."
                    .to_string(),
            );
        }
        return Ok(());
    }

    if status == EventStatus::Published {
        const ALLOWED: [&str; 4] = [
            "status",
            "description",
            "registration_deadline",
            "registration_limit",
        ];
        if provided.iter().any(|f| !ALLOWED.contains(f)) {
            return Err(
                "Published events can only update description, deadline, limit, or status."
                    .to_string(),
            );
        }

        if let Some(raw) = &patch.registration_deadline {
            let new_deadline =
                parse_event_date(raw).ok_or_else(|| "Invalid registration deadline".to_string())?;
            if new_deadline < current_deadline {
                return Err(
                    "Registration deadline can only be extended, not shortened.".to_string()
                );
            }
        }

        if let (Some(new_limit), Some(current)) = (patch.registration_limit, current_limit) {
            if new_limit < current {
                return Err(
                    "Registration limit/stock can only be increased, not decreased.".to_string(),
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deadline() -> DateTime<Utc> {
        parse_event_date("10/06/2026").unwrap()
    }

    #[test]
    fn test_parse_event_date_formats() {
        let d = parse_event_date("25/12/2026").unwrap();
        assert_eq!(d.date_naive(), NaiveDate::from_ymd_opt(2026, 12, 25).unwrap());

        assert!(parse_event_date("2026-12-25T00:00:00Z").is_some());
        assert!(parse_event_date("31/02/2026").is_none());
        assert!(parse_event_date("not a date").is_none());
    }

    #[test]
    fn test_terminal_states_reject_all_edits() {
        for status in [
            EventStatus::Closed,
            EventStatus::Completed,
            EventStatus::Cancelled,
        ] {
            let patch = UpdateEventRequest {
                status: Some("Published".into()),
                ..Default::default()
            };
            assert!(validate_patch(status, &patch, deadline(), None).is_err());
        }
    }

    #[test]
    fn test_ongoing_allows_only_status() {
        let ok = UpdateEventRequest {
            status: Some("Completed".into()),
            ..Default::default()
        };
        assert!(validate_patch(EventStatus::Ongoing, &ok, deadline(), None).is_ok());

        let bad = UpdateEventRequest {
            status: Some("Completed".into()),
            description: Some("new".into()),
            ..Default::default()
        };
        assert!(validate_patch(EventStatus::Ongoing, &bad, deadline(), None).is_err());
    }

    #[test]
    fn test_published_rejects_fields_outside_allow_list() {
        let patch = UpdateEventRequest {
            name: Some("renamed".into()),
            ..Default::default()
        };
        assert!(validate_patch(EventStatus::Published, &patch, deadline(), None).is_err());
    }

    #[test]
    fn test_published_deadline_extend_only() {
        let extend = UpdateEventRequest {
            registration_deadline: Some("11/06/2026".into()),
            ..Default::default()
        };
        assert!(validate_patch(EventStatus::Published, &extend, deadline(), None).is_ok());

        let shorten = UpdateEventRequest {
            registration_deadline: Some("09/06/2026".into()),
            ..Default::default()
        };
        assert!(validate_patch(EventStatus::Published, &shorten, deadline(), None).is_err());
    }

    #[test]
    fn test_published_limit_increase_only() {
        let increase = UpdateEventRequest {
            registration_limit: Some(200),
            ..Default::default()
        };
        assert!(validate_patch(EventStatus::Published, &increase, deadline(), Some(100)).is_ok());

        let decrease = UpdateEventRequest {
            registration_limit: Some(50),
            ..Default::default()
        };
        assert!(validate_patch(EventStatus::Published, &decrease, deadline(), Some(100)).is_err());

        // No current limit: any value is an increase.
        assert!(validate_patch(EventStatus::Published, &decrease, deadline(), None).is_ok());
    }

    #[test]
    fn test_drafts_accept_free_edits() {
        let patch = UpdateEventRequest {
            name: Some("renamed".into()),
            registration_limit: Some(1),
            status: Some("Published".into()),
            ..Default::default()
        };
        assert!(validate_patch(EventStatus::Draft, &patch, deadline(), Some(100)).is_ok());
    }

    #[test]
    fn test_details_branch_must_match_type() {
        let form = EventDetails::Form {
            custom_fields: vec![],
        };
        assert!(form.matches_event_type(EventType::Normal));
        assert!(form.matches_event_type(EventType::Hackathon));
        assert!(!form.matches_event_type(EventType::Merchandise));

        let merch = EventDetails::Merchandise {
            merchandise: MerchandiseDetails::default(),
        };
        assert!(merch.matches_event_type(EventType::Merchandise));
        assert!(!merch.matches_event_type(EventType::Normal));
    }

    #[test]
    fn test_for_event_type_discards_other_branch() {
        let details = EventDetails::for_event_type(
            EventType::Merchandise,
            Some(vec![CustomField {
                label: "ignored".into(),
                field_type: FieldType::Text,
                required: false,
                options: vec![],
            }]),
            None,
        );
        assert_eq!(details.merchandise().unwrap().purchase_limit, 1);
    }

    #[test]
    fn test_details_serde_tagging() {
        let json = serde_json::to_value(EventDetails::Form {
            custom_fields: vec![],
        })
        .unwrap();
        assert_eq!(json["kind"], "form");

        let parsed: EventDetails = serde_json::from_value(serde_json::json!({
            "kind": "merchandise",
            "merchandise": { "sizes": ["M"], "colors": ["red"], "purchase_limit": 3 }
        }))
        .unwrap();
        assert_eq!(parsed.merchandise().unwrap().purchase_limit, 3);
    }
}
