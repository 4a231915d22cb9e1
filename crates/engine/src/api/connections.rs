//! Connection management for WebSocket subscribers.
//!
//! The broadcast hub: tracks every live subscriber's sender half and fans
//! state changes out to all of them. One instance is constructed at server
//! start and injected into both the booking path and the subscription
//! endpoint; there is no other broadcast state.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::ws::Utf8Bytes;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use slotcast_domain::AvailableSlot;

use crate::infrastructure::ports::BroadcastPort;

use super::messages::ServerMessage;

/// Manages all active WebSocket connections.
pub struct ConnectionManager {
    /// Map of connection_id -> sender half of the per-connection channel.
    /// The RwLock serializes fan-out against subscribe/disconnect, which is
    /// also what gives broadcasts a consistent order across subscribers.
    connections: RwLock<HashMap<Uuid, mpsc::Sender<Utf8Bytes>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    pub async fn register(&self, connection_id: Uuid, sender: mpsc::Sender<Utf8Bytes>) {
        let mut connections = self.connections.write().await;
        connections.insert(connection_id, sender);
        tracing::debug!(connection_id = %connection_id, "Connection registered");
    }

    /// Unregister a connection. Idempotent; called on disconnect or error.
    pub async fn unregister(&self, connection_id: Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(&connection_id).is_some() {
            tracing::debug!(connection_id = %connection_id, "Connection unregistered");
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Serialize a message once and fan it out to every live connection.
    ///
    /// Best-effort, at-most-once: a connection whose channel is full or
    /// closed is skipped; its own disconnect handler will unregister it.
    pub async fn broadcast(&self, message: &ServerMessage) {
        let payload = match serde_json::to_string(message) {
            Ok(json) => Utf8Bytes::from(json),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize broadcast payload");
                return;
            }
        };

        let connections = self.connections.read().await;
        for (connection_id, sender) in connections.iter() {
            if let Err(e) = sender.try_send(payload.clone()) {
                tracing::warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to broadcast message, skipping connection"
                );
            }
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BroadcastPort for ConnectionManager {
    async fn publish_snapshot(&self, snapshot: &[AvailableSlot]) {
        self.broadcast(&ServerMessage::Snapshot(snapshot.to_vec()))
            .await;
    }
}
