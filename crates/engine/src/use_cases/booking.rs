//! Book slot use case.
//!
//! Applies the single free-to-booked transition: validate, check existence,
//! conditionally update, then refresh the cache and fan the new state out.

use std::sync::Arc;

use validator::Validate;

use slotcast_domain::BookingRequest;

use crate::infrastructure::cache::AvailabilityCache;
use crate::infrastructure::ports::{BroadcastPort, MailerPort, SlotStorePort, StoreError};

/// Booking outcomes a caller can distinguish.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// Request fields missing or malformed; rejected before any store call.
    #[error("Invalid booking request: {0}")]
    Validation(String),

    /// The referenced slot does not exist.
    #[error("Slot not found")]
    NotFound,

    /// The conditional update matched zero rows: someone got there first.
    #[error("Slot already booked")]
    AlreadyBooked,

    /// The booking write timed out; the outcome is unknown. Re-query slot
    /// state before retrying.
    #[error("Booking outcome unknown: store operation timed out")]
    Unknown,

    /// The backing store failed outright.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Booking coordinator.
pub struct BookSlot {
    store: Arc<dyn SlotStorePort>,
    cache: Arc<AvailabilityCache>,
    broadcast: Arc<dyn BroadcastPort>,
    mailer: Arc<dyn MailerPort>,
}

impl BookSlot {
    pub fn new(
        store: Arc<dyn SlotStorePort>,
        cache: Arc<AvailabilityCache>,
        broadcast: Arc<dyn BroadcastPort>,
        mailer: Arc<dyn MailerPort>,
    ) -> Self {
        Self {
            store,
            cache,
            broadcast,
            mailer,
        }
    }

    /// Execute a booking.
    ///
    /// Guarantees: a slot transitions from unbooked to booked at most once,
    /// and no partial state (booked flag without holder data, or vice versa)
    /// is ever observable — the transition is a single conditional UPDATE.
    pub async fn execute(&self, request: BookingRequest) -> Result<(), BookingError> {
        request
            .validate()
            .map_err(|e| BookingError::Validation(e.to_string()))?;

        if !self.store.slot_exists(request.slot_id).await? {
            return Err(BookingError::NotFound);
        }

        let holder = request.holder();
        let affected = self
            .store
            .book_slot_if_free(request.slot_id, &holder)
            .await
            .map_err(|e| match e {
                StoreError::Timeout => BookingError::Unknown,
                other => BookingError::Store(other),
            })?;
        if affected == 0 {
            return Err(BookingError::AlreadyBooked);
        }

        tracing::info!(slot_id = %request.slot_id, unit_id = %request.unit_id, "Slot booked");

        // Refresh the cache with the post-write state and fan it out. The
        // booking is already durable at this point: a refresh failure only
        // degrades the caches, so drop them and keep the success.
        match self.store.list_slots_with_unit_names().await {
            Ok(slots) => {
                let snapshot = self.cache.invalidate(slots);
                self.broadcast.publish_snapshot(&snapshot).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Post-booking refresh failed, dropping cached snapshot");
                self.cache.clear();
            }
        }

        // Fire-and-forget confirmation; failure never rolls the booking back.
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_confirmation(&holder).await {
                tracing::warn!(error = %e, "Booking confirmation email failed");
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use mockall::predicate::eq;

    use slotcast_domain::{SlotId, UnitId};

    use crate::infrastructure::ports::{
        MailerError, MockBroadcastPort, MockMailerPort, MockSlotStorePort,
    };

    fn request() -> BookingRequest {
        BookingRequest {
            slot_id: SlotId::from_i64(1),
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "555-0100".to_string(),
            unit_id: UnitId::from_i64(2),
        }
    }

    struct Harness {
        store: MockSlotStorePort,
        broadcast: MockBroadcastPort,
        mailer: MockMailerPort,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: MockSlotStorePort::new(),
                broadcast: MockBroadcastPort::new(),
                mailer: MockMailerPort::new(),
            }
        }

        fn build(self) -> BookSlot {
            let store = Arc::new(self.store);
            let cache = Arc::new(AvailabilityCache::new(
                store.clone(),
                Duration::from_secs(600),
            ));
            BookSlot::new(store, cache, Arc::new(self.broadcast), Arc::new(self.mailer))
        }
    }

    #[tokio::test]
    async fn successful_booking_refreshes_and_broadcasts() {
        let mut h = Harness::new();
        h.store
            .expect_slot_exists()
            .with(eq(SlotId::from_i64(1)))
            .times(1)
            .returning(|_| Ok(true));
        h.store
            .expect_book_slot_if_free()
            .times(1)
            .returning(|_, _| Ok(1));
        h.store
            .expect_list_slots_with_unit_names()
            .times(1)
            .returning(|| Ok(vec![]));
        h.broadcast.expect_publish_snapshot().times(1).return_const(());
        h.mailer
            .expect_send_confirmation()
            .returning(|_| Ok(()));

        let book = h.build();
        assert!(book.execute(request()).await.is_ok());
        // Let the spawned mail task run before the mock is dropped.
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn validation_rejects_before_any_store_call() {
        let mut h = Harness::new();
        h.store.expect_slot_exists().times(0);
        h.store.expect_book_slot_if_free().times(0);
        h.broadcast.expect_publish_snapshot().times(0);

        let book = h.build();
        let mut invalid = request();
        invalid.email = "nope".to_string();
        let result = book.execute(invalid).await;
        assert!(matches!(result, Err(BookingError::Validation(_))));
    }

    #[tokio::test]
    async fn missing_slot_is_not_found_with_no_mutation_or_broadcast() {
        let mut h = Harness::new();
        h.store.expect_slot_exists().times(1).returning(|_| Ok(false));
        h.store.expect_book_slot_if_free().times(0);
        h.broadcast.expect_publish_snapshot().times(0);

        let book = h.build();
        let result = book.execute(request()).await;
        assert!(matches!(result, Err(BookingError::NotFound)));
    }

    #[tokio::test]
    async fn zero_affected_rows_is_already_booked() {
        let mut h = Harness::new();
        h.store.expect_slot_exists().times(1).returning(|_| Ok(true));
        h.store
            .expect_book_slot_if_free()
            .times(1)
            .returning(|_, _| Ok(0));
        h.broadcast.expect_publish_snapshot().times(0);

        let book = h.build();
        let result = book.execute(request()).await;
        assert!(matches!(result, Err(BookingError::AlreadyBooked)));
    }

    #[tokio::test]
    async fn timed_out_write_is_unknown_outcome() {
        let mut h = Harness::new();
        h.store.expect_slot_exists().times(1).returning(|_| Ok(true));
        h.store
            .expect_book_slot_if_free()
            .times(1)
            .returning(|_, _| Err(StoreError::Timeout));
        h.broadcast.expect_publish_snapshot().times(0);

        let book = h.build();
        let result = book.execute(request()).await;
        assert!(matches!(result, Err(BookingError::Unknown)));
    }

    #[tokio::test]
    async fn mail_failure_does_not_fail_the_booking() {
        let mut h = Harness::new();
        h.store.expect_slot_exists().times(1).returning(|_| Ok(true));
        h.store
            .expect_book_slot_if_free()
            .times(1)
            .returning(|_, _| Ok(1));
        h.store
            .expect_list_slots_with_unit_names()
            .times(1)
            .returning(|| Ok(vec![]));
        h.broadcast.expect_publish_snapshot().times(1).return_const(());
        h.mailer
            .expect_send_confirmation()
            .returning(|_| Err(MailerError::Relay("relay returned 500".to_string())));

        let book = h.build();
        assert!(book.execute(request()).await.is_ok());
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn refresh_failure_keeps_the_booking_and_drops_the_cache() {
        let mut h = Harness::new();
        h.store.expect_slot_exists().times(1).returning(|_| Ok(true));
        h.store
            .expect_book_slot_if_free()
            .times(1)
            .returning(|_, _| Ok(1));
        h.store
            .expect_list_slots_with_unit_names()
            .times(1)
            .returning(|| Err(StoreError::Database("gone".to_string())));
        h.broadcast.expect_publish_snapshot().times(0);
        h.mailer.expect_send_confirmation().returning(|_| Ok(()));

        let book = h.build();
        assert!(book.execute(request()).await.is_ok());
        tokio::task::yield_now().await;
    }
}
