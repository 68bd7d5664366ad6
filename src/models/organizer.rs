use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organizer {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub contact: String,
    pub discord_webhook: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organizer {
    /// Display name used in notifications and ticket codes, falling back
    /// to the login email when no name has been set.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }

    pub fn is_archived(&self) -> bool {
        self.status == OrganizerStatus::Archived.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizerStatus {
    Active,
    Archived,
}

impl OrganizerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrganizerStatus::Active => "active",
            OrganizerStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(OrganizerStatus::Active),
            "archived" => Some(OrganizerStatus::Archived),
            _ => None,
        }
    }
}

impl fmt::Display for OrganizerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganizerRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contact: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrganizerProfileRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub contact: Option<String>,
    pub discord_webhook: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [OrganizerStatus::Active, OrganizerStatus::Archived] {
            assert_eq!(OrganizerStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrganizerStatus::parse("deleted"), None);
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut org = Organizer {
            id: Uuid::new_v4(),
            email: "club@x.com".into(),
            password_hash: "h".into(),
            name: String::new(),
            category: String::new(),
            description: String::new(),
            contact: String::new(),
            discord_webhook: String::new(),
            status: "active".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(org.display_name(), "club@x.com");
        org.name = "Coding Club".into();
        assert_eq!(org.display_name(), "Coding Club");
    }
}
