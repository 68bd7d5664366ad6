use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const INVITE_CODE_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub event_id: Uuid,
    pub leader_id: Uuid,
    pub size: i32,
    pub invite_code: String,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeamMember {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    pub event_id: Uuid,
    pub size: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinTeamRequest {
    pub invite_code: String,
}

/// Short shareable token granting team membership. Uppercased so codes
/// survive being read out loud.
pub fn generate_invite_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LEN)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect()
}

/// A team completes exactly when its accepted member count reaches the
/// target size.
pub fn is_complete(member_count: i64, size: i32) -> bool {
    member_count >= i64::from(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_code_shape() {
        for _ in 0..50 {
            let code = generate_invite_code();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_invite_codes_vary() {
        let codes: std::collections::HashSet<String> =
            (0..20).map(|_| generate_invite_code()).collect();
        // 36^6 possibilities; 20 draws colliding down to 1 would mean a
        // broken generator.
        assert!(codes.len() > 1);
    }

    #[test]
    fn test_completion_threshold() {
        assert!(!is_complete(0, 2));
        assert!(!is_complete(1, 2));
        assert!(is_complete(2, 2));
        assert!(is_complete(1, 1));
    }
}
