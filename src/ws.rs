//! WebSocket push endpoint: periodic snapshot/trade updates plus ping/pong.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::AppState;

/// Upgrades the connection and hands it off to [`handle_socket`].
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientMessage {
    Ping,
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut updates = state.snapshot.subscribe();

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Ok(update) = update else {
                    warn!("push broadcast lagged or closed; ending stream");
                    break;
                };
                let payload = serde_json::to_string(&update).expect("PushUpdate is always serializable");
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if socket.send(Message::Text(reply_to(&text).into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "websocket receive error");
                        break;
                    }
                }
            }
        }
    }
}

fn reply_to(text: &str) -> String {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ping) => ServerMessage::Pong,
        Err(_) if looks_like_json(text) => ServerMessage::Error {
            message: "Unknown message type".to_string(),
        },
        Err(_) => ServerMessage::Error {
            message: "Invalid JSON".to_string(),
        },
    };
    serde_json::to_string(&message).expect("ServerMessage is always serializable")
}

fn looks_like_json(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text).is_ok()
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ServerMessage {
    Pong,
    Error { message: String },
}
