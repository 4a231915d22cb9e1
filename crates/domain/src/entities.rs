//! Slot and availability types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{SlotId, UnitId};
use crate::slot_time::SlotTime;

/// Contact details attached to a slot when it is booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// A slot row joined with its unit's display name.
///
/// This is the materialized form served to readers and broadcast to
/// subscribers. The store is authoritative; a collection of these is only a
/// derived view of it.
///
/// Invariant: the holder fields are `Some` if and only if `is_booked` is
/// true. The only write path that sets either side is the conditional
/// booking update, which sets all of them in one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub id: SlotId,
    pub unit_id: UnitId,
    pub unit_name: String,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub is_booked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// The full current list of slots, as cached and broadcast.
pub type Snapshot = Vec<AvailableSlot>;
