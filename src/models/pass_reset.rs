use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PassReset {
    pub id: Uuid,
    pub club_email: String,
    pub reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassResetStatus {
    Pending,
    Approved,
    Rejected,
}

impl PassResetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PassResetStatus::Pending => "Pending",
            PassResetStatus::Approved => "Approved",
            PassResetStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(PassResetStatus::Pending),
            "Approved" => Some(PassResetStatus::Approved),
            "Rejected" => Some(PassResetStatus::Rejected),
            _ => None,
        }
    }

    /// Only pending requests may be approved or rejected; processing is
    /// one-shot.
    pub fn can_process(self) -> bool {
        self == PassResetStatus::Pending
    }
}

impl fmt::Display for PassResetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolvePassResetRequest {
    pub action: String,
    pub new_password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_requests_process() {
        assert!(PassResetStatus::Pending.can_process());
        assert!(!PassResetStatus::Approved.can_process());
        assert!(!PassResetStatus::Rejected.can_process());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            PassResetStatus::Pending,
            PassResetStatus::Approved,
            PassResetStatus::Rejected,
        ] {
            assert_eq!(PassResetStatus::parse(status.as_str()), Some(status));
        }
    }
}
