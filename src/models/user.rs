use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Participant account. The seeded admin account is also a `users` row,
/// distinguished by `user_type = "admin"`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub user_type: String,
    pub interested_topics: Vec<String>,
    pub interested_clubs: Vec<String>,
    pub filled: bool,
    pub first_name: String,
    pub last_name: String,
    pub contact_number: String,
    pub college: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_participant(&self) -> bool {
        matches!(self.user_type.as_str(), "iiit" | "non-iiit")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact_number: Option<String>,
    pub college: Option<String>,
    pub interested_topics: Option<Vec<String>>,
    pub interested_clubs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub email: String,
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnboardingRequest {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub clubs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_type(user_type: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice@x.com".into(),
            password_hash: "hash".into(),
            user_type: user_type.into(),
            interested_topics: vec![],
            interested_clubs: vec![],
            filled: false,
            first_name: String::new(),
            last_name: String::new(),
            contact_number: String::new(),
            college: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_participant_classification() {
        assert!(user_with_type("iiit").is_participant());
        assert!(user_with_type("non-iiit").is_participant());
        assert!(!user_with_type("admin").is_participant());
        assert!(!user_with_type("organizer").is_participant());
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let json = serde_json::to_value(user_with_type("iiit")).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("username").is_some());
    }
}
