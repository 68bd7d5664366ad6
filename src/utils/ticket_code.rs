//! Ticket code derivation and QR payload encoding.
//!
//! A ticket code is `{OrganizerName}{EventName}_{username}` with every
//! non-alphanumeric character stripped from the two name parts. The
//! underscore keeps the username extractable during attendance scanning.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Strip everything outside `[A-Za-z0-9]`. Empty or missing names
/// collapse to `"Unknown"` so a code is always derivable.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned
    }
}

pub fn derive_ticket_code(organizer_name: &str, event_name: &str, username: &str) -> String {
    format!(
        "{}{}_{}",
        sanitize_name(organizer_name),
        sanitize_name(event_name),
        username
    )
}

/// The structured payload encoded into the scannable code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrPayload {
    pub ticket_id: String,
    pub event_id: Uuid,
    pub event_name: String,
    pub participant_id: Uuid,
    pub participant_name: String,
}

impl QrPayload {
    pub fn encode(&self) -> String {
        // Serialization of a plain struct with string/uuid fields cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_non_alphanumerics() {
        assert_eq!(sanitize_name("Coding Club!"), "CodingClub");
        assert_eq!(sanitize_name("Hack-a-thon 2026"), "Hackathon2026");
        assert_eq!(sanitize_name("ACM"), "ACM");
    }

    #[test]
    fn test_sanitize_falls_back_to_unknown() {
        assert_eq!(sanitize_name(""), "Unknown");
        assert_eq!(sanitize_name("!!! ***"), "Unknown");
    }

    #[test]
    fn test_derivation_keeps_username_verbatim() {
        let code = derive_ticket_code("Coding Club", "Intro to Rust", "alice@iiit.ac.in");
        assert_eq!(code, "CodingClubIntrotoRust_alice@iiit.ac.in");
    }

    #[test]
    fn test_distinct_participants_get_distinct_codes() {
        let a = derive_ticket_code("Club", "Event", "alice@x.com");
        let b = derive_ticket_code("Club", "Event", "bob@x.com");
        assert_ne!(a, b);
    }

    #[test]
    fn test_qr_payload_round_trip() {
        let payload = QrPayload {
            ticket_id: "ClubEvent_alice@x.com".to_string(),
            event_id: Uuid::new_v4(),
            event_name: "Event".to_string(),
            participant_id: Uuid::new_v4(),
            participant_name: "alice@x.com".to_string(),
        };
        let encoded = payload.encode();
        let decoded: QrPayload = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.ticket_id, payload.ticket_id);
        assert_eq!(decoded.event_id, payload.event_id);
    }
}
