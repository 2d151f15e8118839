//! `WebSocket` handler for the live incident feed.
//!
//! Clients connect to `GET /ws`, receive a one-time `connected` greeting,
//! and from then on get every broadcast envelope their channel filter
//! covers. Sending a `subscribe` control frame replaces the filter; a
//! connection that never subscribes receives everything. Unparseable
//! inbound frames are ignored so one confused client cannot take its own
//! feed down.
//!
//! The outbound side drains the connection's bounded queue in the
//! broadcast registry; if this client stops reading, the registry drops
//! new messages for it alone and everyone else is unaffected.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use groundwatch_types::{ClientMessage, ServerMessage};
use tracing::debug;

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and join the
/// live feed.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_feed(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Run one connection: greet, then pump broadcasts out and control
/// frames in until either side closes.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let (id, mut feed) = state.broadcaster.register().await;
    debug!(connection = %id, "live feed client connected");

    if let Ok(greeting) = serde_json::to_string(&ServerMessage::Connected {
        message: "WebSocket connected".to_owned(),
    }) && socket.send(Message::Text(greeting.into())).await.is_err()
    {
        debug!(connection = %id, "live feed client left before the greeting");
        state.broadcaster.unregister(id).await;
        return;
    }

    loop {
        tokio::select! {
            // A broadcast envelope queued for this connection.
            outbound = feed.recv() => {
                let Some(json) = outbound else {
                    debug!(connection = %id, "broadcast queue closed, dropping socket");
                    break;
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    debug!(connection = %id, "live feed client disconnected (send failed)");
                    break;
                }
            }
            // A frame from the client.
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Subscribe { channels }) => {
                                if !state.broadcaster.subscribe(id, channels).await {
                                    break;
                                }
                            }
                            Err(e) => {
                                debug!(connection = %id, error = %e, "ignoring unparseable client frame");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(connection = %id, "live feed client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(connection = %id, error = %e, "websocket error");
                        break;
                    }
                    // Binary and pong frames carry nothing for us.
                    _ => {}
                }
            }
        }
    }

    state.broadcaster.unregister(id).await;
}
