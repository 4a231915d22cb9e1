//! Outbound port traits for external collaborators.
//!
//! The store, the mail relay, the broadcast fan-out, and the wall clock are
//! all injected as `Arc<dyn Port>` so use cases can be tested against mocks.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use slotcast_domain::{AvailableSlot, Holder, SlotId, SlotTime, UnitId};

/// Failures surfaced by the slot store.
///
/// `Clone` because a single failed fetch may be observed by every caller
/// coalesced onto it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The operation exceeded its bounded timeout. The outcome of a write
    /// is unknown; callers must re-query before retrying.
    #[error("Store operation timed out")]
    Timeout,

    /// The backing store rejected the operation or is unreachable.
    #[error("Store error: {0}")]
    Database(String),
}

/// Durable CRUD over slot and unit rows.
///
/// Transactional guarantees are delegated to the backing store; the engine
/// relies on single-statement atomicity only (see `book_slot_if_free`).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SlotStorePort: Send + Sync {
    /// All slot rows joined with their unit's display name, in
    /// (date, time, unit) order.
    async fn list_slots_with_unit_names(&self) -> Result<Vec<AvailableSlot>, StoreError>;

    async fn slot_exists(&self, id: SlotId) -> Result<bool, StoreError>;

    /// Atomically transition a slot to booked with the holder attached,
    /// conditioned on the slot being unbooked. Returns the affected-row
    /// count: 1 on success, 0 when the slot was already booked.
    async fn book_slot_if_free(&self, id: SlotId, holder: &Holder) -> Result<u64, StoreError>;

    async fn list_unit_ids(&self) -> Result<Vec<UnitId>, StoreError>;

    async fn count_slots(&self, date: NaiveDate, unit_id: UnitId) -> Result<i64, StoreError>;

    /// Insert one unbooked slot row. A no-op when the (unit, date, time)
    /// row already exists, so provisioning is idempotent per row.
    async fn insert_slot(
        &self,
        time: SlotTime,
        date: NaiveDate,
        unit_id: UnitId,
    ) -> Result<(), StoreError>;

    /// Delete every slot dated strictly before `from` or strictly after
    /// `to`. Returns the deleted-row count.
    async fn delete_slots_outside(&self, from: NaiveDate, to: NaiveDate)
        -> Result<u64, StoreError>;

    /// Delete duplicate rows per (date, time, unit), keeping the lowest id.
    async fn delete_duplicate_slots(&self) -> Result<u64, StoreError>;
}

/// Failures from the confirmation mail relay. Never propagated into a
/// booking outcome.
#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Mail relay error: {0}")]
    Relay(String),
}

/// Outbound confirmation delivery, invoked fire-and-forget after a booking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailerPort: Send + Sync {
    async fn send_confirmation(&self, holder: &Holder) -> Result<(), MailerError>;
}

/// Best-effort, at-most-once fan-out of the current slot list to every live
/// subscriber. Per-connection failures are absorbed by the implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BroadcastPort: Send + Sync {
    async fn publish_snapshot(&self, snapshot: &[AvailableSlot]);
}

/// Injected wall clock so lifecycle runs can be pinned in tests.
#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
