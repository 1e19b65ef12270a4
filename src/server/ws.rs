//! WebSocket transport adapter
//!
//! Translates wire frames into hub dispatch calls and forwards hub broadcasts
//! back out. All protocol decisions live in the hub; this module only moves
//! messages across the socket.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use tokio::sync::broadcast;

use crate::hub::{ClientMessage, ServerMessage};

use super::AppState;

/// `GET /ws` upgrade handler
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

/// Serve one dashboard connection until it closes
async fn handle_socket(mut socket: WebSocket, addr: SocketAddr, state: AppState) {
    let (connection, mut events) = state.hub.register_connection();
    tracing::info!(connection = %connection, peer = %addr, "Client connected");

    // Greeting: current configuration, so the client can size its controls.
    let config = state.public_config().await;
    if send(&mut socket, &ServerMessage::Config { config })
        .await
        .is_err()
    {
        state.hub.on_disconnect(connection).await;
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let reply = match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => state.hub.dispatch(connection, addr, message).await,
                        Err(e) => {
                            tracing::debug!(connection = %connection, error = %e, "Malformed message");
                            Some(ServerMessage::Error {
                                message: format!("malformed message: {e}"),
                            })
                        }
                    };
                    if let Some(message) = reply {
                        if send(&mut socket, &message).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // ping/pong/binary: nothing to do
                Some(Err(_)) => break,
            },
            event = events.recv() => match event {
                Ok(message) => {
                    if send(&mut socket, &message).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Slow consumer; it catches up with the next snapshot.
                    tracing::debug!(connection = %connection, skipped, "Broadcast receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    state.hub.on_disconnect(connection).await;
    tracing::info!(connection = %connection, peer = %addr, "Client disconnected");
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).map_err(axum::Error::new)?;
    socket.send(Message::Text(text)).await
}
