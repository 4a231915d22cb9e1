//! Availability read use case.

use std::sync::Arc;

use slotcast_domain::Snapshot;

use crate::infrastructure::cache::AvailabilityCache;
use crate::infrastructure::ports::StoreError;

/// Serves the current availability snapshot through the cache.
pub struct GetAvailability {
    cache: Arc<AvailabilityCache>,
}

impl GetAvailability {
    pub fn new(cache: Arc<AvailabilityCache>) -> Self {
        Self { cache }
    }

    pub async fn execute(&self) -> Result<Arc<Snapshot>, StoreError> {
        self.cache.get().await
    }
}
