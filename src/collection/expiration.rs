//! Concurrent map with per-entry time-to-live and a ticker-driven sweeper.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::timer::{Ticker, TimerScheduler};

/// Sweep interval used when none is given.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

struct Entry<V> {
    value: V,
    /// `None` for entries inserted without a time-to-live.
    deadline: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }
}

/// A concurrent key-value map whose entries can carry a time-to-live.
///
/// Expiry is enforced twice over: reads lazily drop an entry found past its
/// deadline, and a background ticker registered with the given scheduler
/// periodically sweeps expired entries so untouched keys do not pile up.
///
/// Values are returned by clone; the map never hands out references into its
/// guarded storage.
pub struct ExpirationMap<K, V> {
    entries: Arc<RwLock<HashMap<K, Entry<V>>>>,
    sweeper: Ticker,
}

impl<K, V> ExpirationMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a map sweeping every five minutes.
    pub fn new(scheduler: &dyn TimerScheduler) -> Self {
        Self::with_sweep_interval(scheduler, DEFAULT_SWEEP_INTERVAL)
    }

    /// Create a map with an explicit sweep interval.
    ///
    /// # Panics
    ///
    /// Panics on a zero interval (see [`TimerScheduler::set_ticker`]).
    pub fn with_sweep_interval(scheduler: &dyn TimerScheduler, interval: Duration) -> Self {
        let entries: Arc<RwLock<HashMap<K, Entry<V>>>> = Arc::new(RwLock::new(HashMap::new()));
        let sweep_entries = Arc::clone(&entries);
        let sweeper = scheduler.set_ticker(
            interval,
            Arc::new(move || {
                let now = Instant::now();
                sweep_entries.write().retain(|_, entry| !entry.is_expired(now));
            }),
        );
        Self { entries, sweeper }
    }

    /// Insert a permanent entry, replacing any previous value for the key.
    pub fn insert(&self, key: K, value: V) {
        self.entries.write().insert(
            key,
            Entry {
                value,
                deadline: None,
            },
        );
    }

    /// Insert an entry that expires after `ttl`. Zero `ttl` is a no-op.
    pub fn insert_expiring(&self, key: K, value: V, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        self.entries.write().insert(
            key,
            Entry {
                value,
                deadline: Some(Instant::now() + ttl),
            },
        );
    }

    /// Look up a key, dropping the entry if it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        {
            let entries = self.entries.read();
            let entry = entries.get(key)?;
            if !entry.is_expired(Instant::now()) {
                return Some(entry.value.clone());
            }
        }
        // Expired: upgrade to a write lock and evict. Re-checked because
        // another thread may have replaced the entry in between.
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.is_expired(Instant::now())) {
            entries.remove(key);
        }
        None
    }

    /// Remove an entry, returning its value if it was present and live.
    pub fn remove(&self, key: &K) -> Option<V> {
        let entry = self.entries.write().remove(key)?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        Some(entry.value)
    }

    /// Whether a live entry exists for the key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Snapshot of the currently live keys.
    pub fn keys(&self) -> Vec<K> {
        let now = Instant::now();
        self.entries
            .read()
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of stored entries, including not-yet-swept expired ones.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the map stores no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Stop the background sweeper. The map stays usable; expired entries
    /// are then only evicted lazily on access.
    pub fn destroy(&self) {
        self.sweeper.stop();
    }
}

impl<K, V> Drop for ExpirationMap<K, V> {
    fn drop(&mut self) {
        self.sweeper.stop();
    }
}

impl<K, V> std::fmt::Debug for ExpirationMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirationMap")
            .field("len", &self.entries.read().len())
            .finish()
    }
}
