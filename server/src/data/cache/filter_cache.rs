//! Filter definition cache
//!
//! Caches the flat rows fetched for one set of filter ids. The key is the
//! sorted, de-duplicated id set, so the key space is every id combination a
//! client has asked for. Any write to a persisted filter therefore clears the
//! whole cache instead of trying to find every key containing that id.
//!
//! Expiry is decided in `get` from the entry's insertion time. The background
//! sweep only reclaims memory from entries that are already unreachable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::clock::{Clock, SystemClock};
use crate::data::filters::FilterRow;

/// Cached rows with insertion time
#[derive(Debug, Clone)]
struct CacheEntry {
    rows: Arc<Vec<FilterRow>>,
    inserted_at: Instant,
}

/// TTL-bounded cache from filter id sets to fetched definition rows
#[derive(Debug)]
pub struct FilterCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    sweep_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl FilterCache {
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self::with_clock(ttl, sweep_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, sweep_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            sweep_interval,
            clock,
        }
    }

    /// Canonical key for an id set: ascending, de-duplicated, comma-joined
    pub fn key(filter_ids: &[i64]) -> String {
        let mut ids = filter_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Rows cached for this id set, unless missing or older than the TTL
    pub fn get(&self, filter_ids: &[i64]) -> Option<Arc<Vec<FilterRow>>> {
        let key = Self::key(filter_ids);
        let entry = self.entries.get(&key)?;
        if self.is_expired(&entry, self.clock.now()) {
            tracing::trace!(key = %key, "Filter cache entry expired");
            return None;
        }
        Some(Arc::clone(&entry.rows))
    }

    /// Store rows for this id set, stamped with the current time
    pub fn set(&self, filter_ids: &[i64], rows: Arc<Vec<FilterRow>>) {
        let entry = CacheEntry {
            rows,
            inserted_at: self.clock.now(),
        };
        self.entries.insert(Self::key(filter_ids), entry);
    }

    /// Drop every entry; called on any filter create, update or delete
    pub fn invalidate_all(&self) {
        let count = self.entries.len();
        self.entries.clear();
        tracing::debug!(entries = count, "Filter cache invalidated");
    }

    /// Remove entries past their TTL, returning how many were removed
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry, now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) >= self.ttl
    }

    /// Start the periodic sweep, stopping when shutdown is signalled
    pub fn start_sweep_task(self: &Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cache.sweep_interval);
            // First tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("Filter cache sweep task shutting down");
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        let removed = cache.sweep_expired();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = cache.len(), "Swept expired filter cache entries");
                        }
                    }
                }
            }
        })
    }
}
