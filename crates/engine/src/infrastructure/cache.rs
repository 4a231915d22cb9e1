//! TTL availability cache with stampede coalescing.
//!
//! Holds the last known full snapshot of slots behind an `Arc`, so
//! `invalidate` is an atomic swap and concurrent readers never observe a
//! half-updated value. Cache-miss readers rendezvous on a single shared
//! in-flight fetch instead of each issuing a store query; cache-hit reads
//! never wait behind a refresh.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures_util::future::{BoxFuture, FutureExt, Shared};

use slotcast_domain::Snapshot;

use super::ports::{SlotStorePort, StoreError};

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Snapshot>, StoreError>>>;

struct CachedSnapshot {
    value: Arc<Snapshot>,
    fetched_at: Instant,
}

struct CacheState {
    cached: Option<CachedSnapshot>,
    in_flight: Option<SharedFetch>,
    /// Bumped on every invalidation so a slower in-flight fetch cannot
    /// clobber a newer write-driven snapshot.
    generation: u64,
}

/// The single-value availability cache.
pub struct AvailabilityCache {
    store: Arc<dyn SlotStorePort>,
    ttl: Duration,
    state: Arc<Mutex<CacheState>>,
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AvailabilityCache {
    pub fn new(store: Arc<dyn SlotStorePort>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            state: Arc::new(Mutex::new(CacheState {
                cached: None,
                in_flight: None,
                generation: 0,
            })),
        }
    }

    /// Current snapshot; repopulates from the store when empty or expired.
    ///
    /// If the store fails and a prior snapshot exists, that snapshot is
    /// served stale with a warning; the error only surfaces when there is
    /// nothing to fall back on.
    pub async fn get(&self) -> Result<Arc<Snapshot>, StoreError> {
        let fetch = {
            let mut state = lock(&self.state);
            if let Some(cached) = &state.cached {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Ok(cached.value.clone());
                }
            }
            match &state.in_flight {
                Some(existing) => existing.clone(),
                None => {
                    let fetch = Self::start_fetch(
                        self.store.clone(),
                        self.state.clone(),
                        state.generation,
                    );
                    state.in_flight = Some(fetch.clone());
                    fetch
                }
            }
        };
        fetch.await
    }

    /// Replace the cached snapshot immediately and reset the freshness
    /// timer. Used after a write to close the read-after-write gap.
    pub fn invalidate(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        self.replace(snapshot, Instant::now())
    }

    /// Drop the cached snapshot so the next read repopulates from the
    /// store. Used when a post-write refresh could not be completed.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.generation = state.generation.wrapping_add(1);
        state.in_flight = None;
        state.cached = None;
    }

    fn replace(&self, snapshot: Snapshot, fetched_at: Instant) -> Arc<Snapshot> {
        let value = Arc::new(snapshot);
        let mut state = lock(&self.state);
        state.generation = state.generation.wrapping_add(1);
        state.in_flight = None;
        state.cached = Some(CachedSnapshot {
            value: value.clone(),
            fetched_at,
        });
        value
    }

    /// Install a snapshot with an explicit timestamp (tests only).
    #[cfg(test)]
    fn replace_at(&self, snapshot: Snapshot, fetched_at: Instant) -> Arc<Snapshot> {
        self.replace(snapshot, fetched_at)
    }

    fn start_fetch(
        store: Arc<dyn SlotStorePort>,
        state: Arc<Mutex<CacheState>>,
        generation: u64,
    ) -> SharedFetch {
        async move {
            let result = store.list_slots_with_unit_names().await;
            let mut guard = lock(&state);
            // A newer invalidation supersedes this fetch; leave the state
            // untouched and just hand waiters the fetched value.
            let current = guard.generation == generation;
            if current {
                guard.in_flight = None;
            }
            match result {
                Ok(slots) => {
                    let value = Arc::new(slots);
                    if current {
                        guard.cached = Some(CachedSnapshot {
                            value: value.clone(),
                            fetched_at: Instant::now(),
                        });
                    }
                    Ok(value)
                }
                Err(e) => match &guard.cached {
                    Some(cached) => {
                        tracing::warn!(error = %e, "Slot store read failed, serving stale snapshot");
                        Ok(cached.value.clone())
                    }
                    None => Err(e),
                },
            }
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tokio::sync::Notify;

    use slotcast_domain::{AvailableSlot, Holder, SlotId, SlotTime, UnitId};

    use crate::infrastructure::ports::MockSlotStorePort;

    fn slot(id: i64) -> AvailableSlot {
        AvailableSlot {
            id: SlotId::from_i64(id),
            unit_id: UnitId::from_i64(1),
            unit_name: "Chair 1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 9, 1).expect("date"),
            time: SlotTime::T0900,
            is_booked: false,
            name: None,
            email: None,
            phone: None,
        }
    }

    /// Store stub whose list call blocks until released, counting calls.
    struct GatedStore {
        calls: AtomicUsize,
        gate: Notify,
    }

    impl GatedStore {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl SlotStorePort for GatedStore {
        async fn list_slots_with_unit_names(&self) -> Result<Vec<AvailableSlot>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(vec![slot(1)])
        }

        async fn slot_exists(&self, _id: SlotId) -> Result<bool, StoreError> {
            unimplemented!("not exercised")
        }

        async fn book_slot_if_free(
            &self,
            _id: SlotId,
            _holder: &Holder,
        ) -> Result<u64, StoreError> {
            unimplemented!("not exercised")
        }

        async fn list_unit_ids(&self) -> Result<Vec<UnitId>, StoreError> {
            unimplemented!("not exercised")
        }

        async fn count_slots(&self, _date: NaiveDate, _unit_id: UnitId) -> Result<i64, StoreError> {
            unimplemented!("not exercised")
        }

        async fn insert_slot(
            &self,
            _time: SlotTime,
            _date: NaiveDate,
            _unit_id: UnitId,
        ) -> Result<(), StoreError> {
            unimplemented!("not exercised")
        }

        async fn delete_slots_outside(
            &self,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<u64, StoreError> {
            unimplemented!("not exercised")
        }

        async fn delete_duplicate_slots(&self) -> Result<u64, StoreError> {
            unimplemented!("not exercised")
        }
    }

    #[tokio::test]
    async fn empty_cache_populates_from_store() {
        let mut store = MockSlotStorePort::new();
        store
            .expect_list_slots_with_unit_names()
            .times(1)
            .returning(|| Ok(vec![slot(1)]));
        let cache = AvailabilityCache::new(Arc::new(store), Duration::from_secs(600));

        let snapshot = cache.get().await.expect("populate");
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn fresh_value_is_served_without_store_calls() {
        let mut store = MockSlotStorePort::new();
        store
            .expect_list_slots_with_unit_names()
            .times(1)
            .returning(|| Ok(vec![slot(1)]));
        let cache = AvailabilityCache::new(Arc::new(store), Duration::from_secs(600));

        let first = cache.get().await.expect("populate");
        let second = cache.get().await.expect("hit");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn expired_value_triggers_repopulation() {
        let mut store = MockSlotStorePort::new();
        store
            .expect_list_slots_with_unit_names()
            .times(1)
            .returning(|| Ok(vec![slot(2)]));
        let ttl = Duration::from_secs(600);
        let cache = AvailabilityCache::new(Arc::new(store), ttl);
        cache.replace_at(vec![slot(1)], Instant::now() - ttl - Duration::from_secs(1));

        let snapshot = cache.get().await.expect("refresh");
        assert_eq!(snapshot[0].id, SlotId::from_i64(2));
    }

    #[tokio::test]
    async fn concurrent_misses_coalesce_onto_one_fetch() {
        let store = Arc::new(GatedStore::new());
        let cache = Arc::new(AvailabilityCache::new(
            store.clone(),
            Duration::from_secs(600),
        ));

        let mut waiters = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            waiters.push(tokio::spawn(async move { cache.get().await }));
        }
        // Let every waiter reach the shared fetch before releasing it.
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
        store.gate.notify_waiters();

        for waiter in waiters {
            let snapshot = waiter.await.expect("join").expect("get");
            assert_eq!(snapshot.len(), 1);
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn store_failure_serves_stale_snapshot() {
        let mut store = MockSlotStorePort::new();
        store
            .expect_list_slots_with_unit_names()
            .returning(|| Err(StoreError::Database("connection reset".to_string())));
        let ttl = Duration::from_secs(600);
        let cache = AvailabilityCache::new(Arc::new(store), ttl);
        cache.replace_at(vec![slot(1)], Instant::now() - ttl - Duration::from_secs(1));

        let snapshot = cache.get().await.expect("stale serve");
        assert_eq!(snapshot[0].id, SlotId::from_i64(1));
    }

    #[tokio::test]
    async fn store_failure_with_empty_cache_surfaces_error() {
        let mut store = MockSlotStorePort::new();
        store
            .expect_list_slots_with_unit_names()
            .returning(|| Err(StoreError::Timeout));
        let cache = AvailabilityCache::new(Arc::new(store), Duration::from_secs(600));

        assert_eq!(cache.get().await, Err(StoreError::Timeout));
    }

    #[tokio::test]
    async fn invalidate_replaces_value_and_resets_ttl() {
        let store = MockSlotStorePort::new();
        let cache = AvailabilityCache::new(Arc::new(store), Duration::from_secs(600));

        cache.invalidate(vec![slot(3)]);
        let snapshot = cache.get().await.expect("hit");
        assert_eq!(snapshot[0].id, SlotId::from_i64(3));
    }

    #[tokio::test]
    async fn invalidate_supersedes_in_flight_fetch() {
        let store = Arc::new(GatedStore::new());
        let cache = Arc::new(AvailabilityCache::new(
            store.clone(),
            Duration::from_secs(600),
        ));

        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get().await })
        };
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }

        // A booking lands while the fetch is still in the store.
        let mut booked = slot(9);
        booked.is_booked = true;
        cache.invalidate(vec![booked]);
        store.gate.notify_waiters();
        waiter.await.expect("join").expect("get");

        // The stale fetch result must not clobber the invalidated value.
        let snapshot = cache.get().await.expect("hit");
        assert_eq!(snapshot[0].id, SlotId::from_i64(9));
        assert!(snapshot[0].is_booked);
    }

    #[tokio::test]
    async fn clear_forces_repopulation() {
        let mut store = MockSlotStorePort::new();
        store
            .expect_list_slots_with_unit_names()
            .times(1)
            .returning(|| Ok(vec![slot(5)]));
        let cache = AvailabilityCache::new(Arc::new(store), Duration::from_secs(600));
        cache.invalidate(vec![slot(1)]);

        cache.clear();
        let snapshot = cache.get().await.expect("repopulate");
        assert_eq!(snapshot[0].id, SlotId::from_i64(5));
    }
}
