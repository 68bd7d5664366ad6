use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::models::event::EventType;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_code: String,
    pub event_id: Uuid,
    pub participant_id: Uuid,
    pub qr_data: String,
    pub kind: String,
    pub status: String,
    pub team_id: Option<Uuid>,
    pub team_name: Option<String>,
    pub attendance_marked: bool,
    pub attendance_at: Option<DateTime<Utc>>,
    pub manual_override: bool,
    pub override_reason: Option<String>,
    pub details: Option<Json<TicketDetails>>,
    pub purchased_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Registered,
    Completed,
    Cancelled,
    Rejected,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Registered => "Registered",
            TicketStatus::Completed => "Completed",
            TicketStatus::Cancelled => "Cancelled",
            TicketStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Registered" => Some(TicketStatus::Registered),
            "Completed" => Some(TicketStatus::Completed),
            "Cancelled" => Some(TicketStatus::Cancelled),
            "Rejected" => Some(TicketStatus::Rejected),
            _ => None,
        }
    }

    /// Transitions are monotonic: only a Registered ticket moves anywhere,
    /// and Cancelled/Rejected are terminal.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        matches!(
            (self, next),
            (
                TicketStatus::Registered,
                TicketStatus::Completed | TicketStatus::Cancelled
            )
        )
    }

    pub fn can_cancel(self) -> bool {
        self.can_transition_to(TicketStatus::Cancelled)
    }

    /// Attendance is only scannable while the ticket is still Registered.
    pub fn can_mark_attendance(self) -> bool {
        self == TicketStatus::Registered
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific registration payload: form answers for normal/hackathon
/// tickets, the purchase selection for merchandise tickets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TicketDetails {
    Form { answers: BTreeMap<String, Value> },
    Merchandise { selection: MerchandiseSelection },
}

impl TicketDetails {
    pub fn quantity(&self) -> i32 {
        match self {
            TicketDetails::Form { .. } => 1,
            TicketDetails::Merchandise { selection } => selection.quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchandiseSelection {
    pub size: Option<String>,
    pub color: Option<String>,
    pub variant: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

impl MerchandiseSelection {
    /// Size and color are mandatory for a merchandise purchase.
    pub fn is_complete(&self) -> bool {
        self.size.as_deref().is_some_and(|s| !s.is_empty())
            && self.color.as_deref().is_some_and(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub team_name: Option<String>,
    pub answers: Option<BTreeMap<String, Value>>,
    pub merchandise_selections: Option<MerchandiseSelection>,
}

/// Capacity rule shared by registration paths. `sold` is the
/// quantity-weighted total for merchandise events and the plain ticket
/// count otherwise; a missing limit means unlimited.
pub fn check_capacity(
    event_type: EventType,
    limit: Option<i32>,
    sold: i64,
    requested: i32,
) -> Result<(), String> {
    let Some(limit) = limit else {
        return Ok(());
    };

    match event_type {
        EventType::Merchandise => {
            if sold + i64::from(requested) > i64::from(limit) {
                Err("Out of stock! Not enough items available.".to_string())
            } else {
                Ok(())
            }
        }
        _ => {
            if sold >= i64::from(limit) {
                Err("Registration limit reached".to_string())
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lattice() {
        use TicketStatus::*;

        assert!(Registered.can_transition_to(Completed));
        assert!(Registered.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Registered));
        assert!(!Rejected.can_transition_to(Completed));
    }

    #[test]
    fn test_only_registered_tickets_cancel_or_scan() {
        assert!(TicketStatus::Registered.can_cancel());
        assert!(TicketStatus::Registered.can_mark_attendance());
        for status in [
            TicketStatus::Completed,
            TicketStatus::Cancelled,
            TicketStatus::Rejected,
        ] {
            assert!(!status.can_cancel());
            assert!(!status.can_mark_attendance());
        }
    }

    #[test]
    fn test_capacity_unlimited_when_no_limit() {
        assert!(check_capacity(EventType::Normal, None, 10_000, 1).is_ok());
        assert!(check_capacity(EventType::Merchandise, None, 10_000, 5).is_ok());
    }

    #[test]
    fn test_capacity_counts_tickets_for_normal_events() {
        assert!(check_capacity(EventType::Normal, Some(2), 1, 1).is_ok());
        let err = check_capacity(EventType::Normal, Some(2), 2, 1).unwrap_err();
        assert_eq!(err, "Registration limit reached");
    }

    #[test]
    fn test_capacity_sums_quantities_for_merchandise() {
        assert!(check_capacity(EventType::Merchandise, Some(10), 7, 3).is_ok());
        let err = check_capacity(EventType::Merchandise, Some(10), 7, 4).unwrap_err();
        assert_eq!(err, "Out of stock! Not enough items available.");
    }

    #[test]
    fn test_merchandise_selection_requires_size_and_color() {
        let complete = MerchandiseSelection {
            size: Some("M".into()),
            color: Some("red".into()),
            variant: None,
            quantity: 1,
        };
        assert!(complete.is_complete());

        let missing_color = MerchandiseSelection {
            size: Some("M".into()),
            color: None,
            variant: None,
            quantity: 1,
        };
        assert!(!missing_color.is_complete());

        let empty_size = MerchandiseSelection {
            size: Some(String::new()),
            color: Some("red".into()),
            variant: None,
            quantity: 1,
        };
        assert!(!empty_size.is_complete());
    }

    #[test]
    fn test_details_quantity() {
        let form = TicketDetails::Form {
            answers: BTreeMap::new(),
        };
        assert_eq!(form.quantity(), 1);

        let merch = TicketDetails::Merchandise {
            selection: MerchandiseSelection {
                size: Some("M".into()),
                color: Some("red".into()),
                variant: None,
                quantity: 4,
            },
        };
        assert_eq!(merch.quantity(), 4);
    }
}
