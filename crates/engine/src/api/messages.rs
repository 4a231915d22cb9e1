//! Messages pushed to WebSocket subscribers.

use serde::Serialize;

use slotcast_domain::AvailableSlot;

/// Server-to-subscriber payloads. Every `Snapshot` is the full current slot
/// list, never a delta, so a client can always reconcile by trusting the
/// latest payload it received.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Snapshot(Vec<AvailableSlot>),
    Error { message: String },
}
