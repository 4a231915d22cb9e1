//! WebSocket handling for availability subscribers.
//!
//! Subscribers are read-only: on connect they get a baseline full snapshot
//! from a direct store read, then every state change arrives through the
//! broadcast hub. Incoming frames are logged and ignored.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::app::App;

use super::connections::ConnectionManager;
use super::messages::ServerMessage;

/// Buffer size for per-connection message channel.
const CONNECTION_CHANNEL_BUFFER: usize = 256;

/// Combined state for WebSocket handlers.
pub struct WsState {
    pub app: Arc<App>,
    pub connections: Arc<ConnectionManager>,
}

/// WebSocket upgrade handler - entry point for new subscribers.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let connection_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<Utf8Bytes>(CONNECTION_CHANNEL_BUFFER);

    state.connections.register(connection_id, tx.clone()).await;
    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    // Forward payloads from the channel to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    send_baseline_snapshot(&state, connection_id, &tx).await;

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                tracing::debug!(connection_id = %connection_id, message = %text, "Ignoring subscriber message");
            }
            Ok(Message::Close(_)) => {
                tracing::info!(connection_id = %connection_id, "WebSocket closed by client");
                break;
            }
            Err(e) => {
                tracing::error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    state.connections.unregister(connection_id).await;
    send_task.abort();
    tracing::info!(connection_id = %connection_id, "WebSocket connection terminated");
}

/// Push the baseline full snapshot to a freshly subscribed connection.
///
/// Reads the store directly rather than through the cache so subscribe-time
/// latency never stacks behind a cache repopulation. A connection racing a
/// concurrent publish may see baseline and update in either order; both are
/// full snapshots, so the later one always wins on the client.
async fn send_baseline_snapshot(
    state: &WsState,
    connection_id: Uuid,
    tx: &mpsc::Sender<Utf8Bytes>,
) {
    let message = match state.app.store.list_slots_with_unit_names().await {
        Ok(slots) => ServerMessage::Snapshot(slots),
        Err(e) => {
            tracing::error!(connection_id = %connection_id, error = %e, "Failed to fetch initial slots");
            ServerMessage::Error {
                message: "Failed to fetch initial slots".to_string(),
            }
        }
    };

    match serde_json::to_string(&message) {
        Ok(json) => {
            if tx.try_send(Utf8Bytes::from(json)).is_err() {
                tracing::warn!(connection_id = %connection_id, "Failed to queue baseline snapshot");
            }
        }
        Err(e) => {
            tracing::error!(connection_id = %connection_id, error = %e, "Failed to serialize baseline snapshot");
        }
    }
}
