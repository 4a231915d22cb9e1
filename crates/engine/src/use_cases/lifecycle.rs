//! Slot lifecycle: rolling-window provisioning and retention cleanup.
//!
//! Both run at process start (provisioning failure is fatal there, cleanup
//! failure is not) and may be re-run periodically. Cleanup matches rows by
//! date range and duplication key only, never by booked status, so it cannot
//! race a concurrent booking.

use std::sync::Arc;

use chrono::Days;

use slotcast_domain::SlotTime;

use crate::infrastructure::ports::{ClockPort, SlotStorePort, StoreError};

/// Ensures the next `days` calendar dates have slots for every unit.
pub struct ProvisionWindow {
    store: Arc<dyn SlotStorePort>,
    clock: Arc<dyn ClockPort>,
    days: u64,
}

impl ProvisionWindow {
    pub fn new(store: Arc<dyn SlotStorePort>, clock: Arc<dyn ClockPort>, days: u64) -> Self {
        Self { store, clock, days }
    }

    /// Provision the window. Idempotent: the per-(unit, date) count check is
    /// a fast path, and the inserts themselves are no-ops for rows that
    /// already exist, so a partially provisioned day heals on the next run.
    ///
    /// Returns the number of insert statements issued.
    pub async fn execute(&self) -> Result<u64, StoreError> {
        let units = self.store.list_unit_ids().await?;
        if units.is_empty() {
            tracing::warn!("No units in the store, skipping slot provisioning");
            return Ok(0);
        }

        let today = self.clock.now().date_naive();
        let mut inserted = 0u64;
        for offset in 0..self.days {
            let date = today + Days::new(offset);
            for &unit_id in &units {
                if self.store.count_slots(date, unit_id).await? >= SlotTime::all().len() as i64 {
                    continue;
                }
                for &time in SlotTime::all() {
                    self.store.insert_slot(time, date, unit_id).await?;
                    inserted += 1;
                }
            }
        }

        tracing::info!(days = self.days, inserted, "Provisioned slot window");
        Ok(inserted)
    }
}

/// Counts reported by a cleanup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupStats {
    pub outside_window: u64,
    pub duplicates: u64,
}

/// Prunes slots outside the rolling window and duplicate rows.
pub struct CleanupSlots {
    store: Arc<dyn SlotStorePort>,
    clock: Arc<dyn ClockPort>,
    days: u64,
}

impl CleanupSlots {
    pub fn new(store: Arc<dyn SlotStorePort>, clock: Arc<dyn ClockPort>, days: u64) -> Self {
        Self { store, clock, days }
    }

    /// Delete rows dated strictly before today or strictly after the window
    /// end, then sweep duplicates keeping the lowest id per key.
    pub async fn execute(&self) -> Result<CleanupStats, StoreError> {
        let today = self.clock.now().date_naive();
        let window_end = today + Days::new(self.days);

        let outside_window = self.store.delete_slots_outside(today, window_end).await?;
        let duplicates = self.store.delete_duplicate_slots().await?;

        tracing::info!(outside_window, duplicates, "Cleaned up slot rows");
        Ok(CleanupStats {
            outside_window,
            duplicates,
        })
    }
}
