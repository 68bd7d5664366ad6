use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::chat::{ClientEvent, RoomEvent, ServerEvent};
use crate::models::ChatMessage;
use crate::state::AppState;

const OUTBOUND_BUFFER: usize = 32;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn = %conn_id, "Chat connection established");

    let (sender, mut receiver) = socket.split();

    // All room forwarders funnel through one writer task, since the sink
    // half of the socket cannot be shared.
    let (out_tx, out_rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);
    let writer = tokio::spawn(write_loop(sender, out_rx));

    let mut joined_rooms: Vec<Uuid> = Vec::new();
    let mut forwarders: Vec<JoinHandle<()>> = Vec::new();

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(ClientEvent::JoinTeam { team_id }) => {
                    if joined_rooms.contains(&team_id) {
                        continue;
                    }
                    let rx = state.chat.subscribe(team_id).await;
                    forwarders.push(tokio::spawn(forward_room(rx, out_tx.clone(), conn_id)));
                    joined_rooms.push(team_id);
                    debug!(conn = %conn_id, team = %team_id, "Joined team room");
                }
                Ok(ClientEvent::SendMessage {
                    team_id,
                    sender_id,
                    sender_name,
                    text,
                }) => match persist_message(&state, team_id, sender_id, &sender_name, &text).await
                {
                    Ok(message) => {
                        state
                            .chat
                            .publish(
                                team_id,
                                RoomEvent {
                                    origin: None,
                                    event: ServerEvent::ReceiveMessage { message },
                                },
                            )
                            .await;
                    }
                    Err(e) => {
                        error!(error = ?e, team = %team_id, "Failed to persist chat message");
                    }
                },
                Ok(ClientEvent::Typing {
                    team_id,
                    sender_name,
                }) => {
                    // Transient: not persisted, and never echoed back.
                    state
                        .chat
                        .publish(
                            team_id,
                            RoomEvent {
                                origin: Some(conn_id),
                                event: ServerEvent::UserTyping {
                                    team_id,
                                    sender_name,
                                },
                            },
                        )
                        .await;
                }
                Err(e) => {
                    warn!(conn = %conn_id, error = %e, "Unparseable chat message");
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    for task in forwarders {
        task.abort();
    }
    writer.abort();
    for team_id in joined_rooms {
        state.chat.prune(team_id).await;
    }
    info!(conn = %conn_id, "Chat connection closed");
}

async fn write_loop(mut sender: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Message>) {
    while let Some(message) = rx.recv().await {
        if sender.send(message).await.is_err() {
            break;
        }
    }
}

async fn forward_room(
    mut rx: broadcast::Receiver<RoomEvent>,
    out: mpsc::Sender<Message>,
    conn_id: Uuid,
) {
    loop {
        match rx.recv().await {
            Ok(room_event) => {
                if room_event.origin == Some(conn_id) {
                    continue;
                }
                let json = match serde_json::to_string(&room_event.event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(error = %e, "Failed to serialize chat event");
                        continue;
                    }
                };
                if out.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Chat subscriber lagged, messages dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn persist_message(
    state: &AppState,
    team_id: Uuid,
    sender_id: Uuid,
    sender_name: &str,
    text: &str,
) -> Result<ChatMessage, sqlx::Error> {
    sqlx::query_as::<_, ChatMessage>(
        "INSERT INTO chat_messages (team_id, sender_id, sender_name, body)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(team_id)
    .bind(sender_id)
    .bind(sender_name)
    .bind(text)
    .fetch_one(&state.pool)
    .await
}
