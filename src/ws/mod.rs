pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one WebSocket connection.
///
/// A connection belongs to at most one session group at a time, and
/// only `entered_game` / `leave_game` move it in and out of a group. A
/// dropped transport does not touch session state.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let welcome = ServerMessage::Welcome {
        protocol: "1.0".to_string(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if let Ok(msg) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    // The broadcast subscription of the session this connection entered
    let mut group_rx: Option<broadcast::Receiver<ServerMessage>> = None;

    loop {
        tokio::select! {
            // Fan-out from the session group, if we entered one
            group_msg = async {
                match &mut group_rx {
                    Some(rx) => rx.recv().await.ok(),
                    None => {
                        // Not in a group: wait forever
                        std::future::pending::<Option<ServerMessage>>().await
                    }
                }
            } => {
                if let Some(msg) = group_msg {
                    if let Ok(json) = serde_json::to_string(&msg) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }

            // Inbound client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => msg,
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                let error = ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                };
                                if let Ok(json) = serde_json::to_string(&error) {
                                    let _ = sender.send(Message::Text(json.into())).await;
                                }
                                continue;
                            }
                        };

                        // Group membership changes are connection-local,
                        // handled here; everything else is dispatched.
                        let response = match client_msg {
                            ClientMessage::EnteredGame { game_id, user_id } => {
                                // Subscribe before loading the catch-up
                                // snapshot: a transition broadcast in
                                // between is then buffered, not lost.
                                let rx = state.subscribe(&game_id).await;
                                match state.session_snapshot(&game_id).await {
                                    Ok(snapshot) => {
                                        tracing::info!(%game_id, %user_id, "connection entered game");
                                        group_rx = Some(rx);
                                        Some(snapshot)
                                    }
                                    Err(e) => Some(ServerMessage::Error {
                                        code: e.code().to_string(),
                                        msg: e.to_string(),
                                    }),
                                }
                            }
                            ClientMessage::LeaveGame { game_id, user_id } => {
                                let response =
                                    handlers::handle_leave(&state, &game_id, &user_id).await;
                                group_rx = None;
                                response
                            }
                            other => handlers::handle_message(other, &state).await,
                        };

                        if let Some(response) = response {
                            if let Ok(json) = serde_json::to_string(&response) {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    tracing::error!("Failed to send response");
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!("WebSocket connection closed");
}
