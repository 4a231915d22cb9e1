//! Application assembly: wires ports, the cache, and the use cases.

use std::sync::Arc;
use std::time::Duration;

use crate::infrastructure::cache::AvailabilityCache;
use crate::infrastructure::ports::{BroadcastPort, ClockPort, MailerPort, SlotStorePort};
use crate::use_cases::{BookSlot, CleanupSlots, GetAvailability, ProvisionWindow};

/// Tunables read once at startup.
#[derive(Debug, Clone, Copy)]
pub struct AppConfig {
    /// How long a cached availability snapshot stays fresh.
    pub cache_ttl: Duration,
    /// Length of the rolling provisioning window, in days.
    pub provision_days: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(600),
            provision_days: 7,
        }
    }
}

/// All use cases, behind one handle for the HTTP layer.
pub struct UseCases {
    pub availability: GetAvailability,
    pub book: BookSlot,
    pub provision: ProvisionWindow,
    pub cleanup: CleanupSlots,
}

/// Shared application state.
pub struct App {
    pub store: Arc<dyn SlotStorePort>,
    pub cache: Arc<AvailabilityCache>,
    pub broadcast: Arc<dyn BroadcastPort>,
    pub use_cases: UseCases,
}

impl App {
    pub fn new(
        store: Arc<dyn SlotStorePort>,
        mailer: Arc<dyn MailerPort>,
        broadcast: Arc<dyn BroadcastPort>,
        clock: Arc<dyn ClockPort>,
        config: AppConfig,
    ) -> Self {
        let cache = Arc::new(AvailabilityCache::new(store.clone(), config.cache_ttl));
        let use_cases = UseCases {
            availability: GetAvailability::new(cache.clone()),
            book: BookSlot::new(
                store.clone(),
                cache.clone(),
                broadcast.clone(),
                mailer,
            ),
            provision: ProvisionWindow::new(store.clone(), clock.clone(), config.provision_days),
            cleanup: CleanupSlots::new(store.clone(), clock, config.provision_days),
        };
        Self {
            store,
            cache,
            broadcast,
            use_cases,
        }
    }
}
