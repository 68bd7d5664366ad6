//! Team chat relay: an explicit subscription registry mapping team ids to
//! broadcast channels, plus the websocket handler that bridges connections
//! into it. Rooms are in-memory only; messages persist through the chat
//! log, live subscriptions do not survive a restart.

pub mod socket;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::models::ChatMessage;

const ROOM_CAPACITY: usize = 64;

/// Messages a client may send over the websocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinTeam {
        team_id: Uuid,
    },
    SendMessage {
        team_id: Uuid,
        sender_id: Uuid,
        sender_name: String,
        text: String,
    },
    Typing {
        team_id: Uuid,
        sender_name: String,
    },
}

/// Messages fanned out to room subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    ReceiveMessage { message: ChatMessage },
    UserTyping { team_id: Uuid, sender_name: String },
}

/// A fan-out unit. `origin` carries the sending connection's id for events
/// that must not echo back to their sender (typing notices); persisted
/// messages go to everyone, including the sender.
#[derive(Debug, Clone)]
pub struct RoomEvent {
    pub origin: Option<Uuid>,
    pub event: ServerEvent,
}

#[derive(Clone, Default)]
pub struct ChatRegistry {
    rooms: Arc<RwLock<HashMap<Uuid, broadcast::Sender<RoomEvent>>>>,
}

impl ChatRegistry {
    /// Join the room for `team_id`, creating it on first subscription.
    pub async fn subscribe(&self, team_id: Uuid) -> broadcast::Receiver<RoomEvent> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(team_id)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Best-effort fan-out; a room with no subscribers is a no-op.
    pub async fn publish(&self, team_id: Uuid, event: RoomEvent) {
        let rooms = self.rooms.read().await;
        if let Some(tx) = rooms.get(&team_id) {
            let _ = tx.send(event);
        }
    }

    /// Drop the room when the last subscriber has disconnected.
    pub async fn prune(&self, team_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(tx) = rooms.get(&team_id) {
            if tx.receiver_count() == 0 {
                rooms.remove(&team_id);
            }
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(team_id: Uuid, text: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            team_id,
            sender_id: Uuid::new_v4(),
            sender_name: "alice".to_string(),
            body: text.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let registry = ChatRegistry::default();
        let team_id = Uuid::new_v4();

        let mut a = registry.subscribe(team_id).await;
        let mut b = registry.subscribe(team_id).await;

        registry
            .publish(
                team_id,
                RoomEvent {
                    origin: None,
                    event: ServerEvent::ReceiveMessage {
                        message: message(team_id, "hello"),
                    },
                },
            )
            .await;

        for rx in [&mut a, &mut b] {
            match rx.recv().await.unwrap().event {
                ServerEvent::ReceiveMessage { message } => assert_eq!(message.body, "hello"),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_rooms_are_isolated_by_team() {
        let registry = ChatRegistry::default();
        let team_a = Uuid::new_v4();
        let team_b = Uuid::new_v4();

        let mut a = registry.subscribe(team_a).await;
        let _b = registry.subscribe(team_b).await;

        registry
            .publish(
                team_b,
                RoomEvent {
                    origin: None,
                    event: ServerEvent::UserTyping {
                        team_id: team_b,
                        sender_name: "bob".to_string(),
                    },
                },
            )
            .await;

        assert!(matches!(
            a.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_publish_to_unknown_room_is_noop() {
        let registry = ChatRegistry::default();
        registry
            .publish(
                Uuid::new_v4(),
                RoomEvent {
                    origin: None,
                    event: ServerEvent::UserTyping {
                        team_id: Uuid::new_v4(),
                        sender_name: "ghost".to_string(),
                    },
                },
            )
            .await;
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_prune_removes_empty_rooms() {
        let registry = ChatRegistry::default();
        let team_id = Uuid::new_v4();

        let rx = registry.subscribe(team_id).await;
        assert_eq!(registry.room_count().await, 1);

        // Still subscribed: prune keeps the room.
        registry.prune(team_id).await;
        assert_eq!(registry.room_count().await, 1);

        drop(rx);
        registry.prune(team_id).await;
        assert_eq!(registry.room_count().await, 0);
    }

    #[test]
    fn test_wire_event_names() {
        let json = serde_json::to_value(ClientEvent::JoinTeam {
            team_id: Uuid::new_v4(),
        })
        .unwrap();
        assert_eq!(json["type"], "join_team");

        let json = serde_json::to_value(ServerEvent::UserTyping {
            team_id: Uuid::new_v4(),
            sender_name: "a".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "user_typing");

        let parsed: ClientEvent = serde_json::from_value(serde_json::json!({
            "type": "typing",
            "team_id": Uuid::new_v4(),
            "sender_name": "a"
        }))
        .unwrap();
        assert!(matches!(parsed, ClientEvent::Typing { .. }));
    }
}
