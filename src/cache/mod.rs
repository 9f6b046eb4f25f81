mod key;

pub use key::{derive_key, CacheKey};

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            max_entries: 100,
            sweep_interval: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    feedback: String,
    created_at: Instant,
    expires_at: Instant,
    // Insertion order, breaks created_at ties when evicting.
    seq: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Default)]
struct Slots {
    entries: HashMap<CacheKey, CacheEntry>,
    next_seq: u64,
}

impl Slots {
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before - self.entries.len()
    }

    fn evict_oldest(&mut self) -> Option<CacheKey> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| (e.created_at, e.seq))
            .map(|(k, _)| *k)?;
        self.entries.remove(&oldest);
        Some(oldest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub max_entries: usize,
    pub ttl_secs: u64,
}

/// Bounded, time-expiring store of generated feedback text.
///
/// Expired entries are dropped lazily on `get`, opportunistically when a full
/// store needs room, and by the optional background sweeper. When the store
/// is full and nothing has expired, the entry inserted first is evicted.
#[derive(Debug)]
pub struct FeedbackCache {
    slots: Mutex<Slots>,
    ttl: Duration,
    max_entries: usize,
}

impl FeedbackCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            ttl: config.ttl,
            max_entries: config.max_entries.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        // No operation leaves the map half-updated, so a poisoned lock is still usable.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let now = Instant::now();
        let mut slots = self.lock();
        let entry = slots.entries.get(key)?;
        if !entry.is_expired(now) {
            return Some(entry.feedback.clone());
        }
        slots.entries.remove(key);
        debug!(%key, "dropped expired feedback entry");
        None
    }

    pub fn put(&self, key: CacheKey, feedback: String) {
        let now = Instant::now();
        let mut slots = self.lock();

        if !slots.entries.contains_key(&key) && slots.entries.len() >= self.max_entries {
            let swept = slots.sweep(now);
            if swept > 0 {
                debug!(swept, "swept expired entries to make room");
            }
            if slots.entries.len() >= self.max_entries {
                if let Some(evicted) = slots.evict_oldest() {
                    debug!(key = %evicted, "evicted oldest feedback entry");
                }
            }
        }

        let seq = slots.next_seq;
        slots.next_seq += 1;
        slots.entries.insert(
            key,
            CacheEntry {
                feedback,
                created_at: now,
                expires_at: now + self.ttl,
                seq,
            },
        );
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        self.lock().sweep(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let slots = self.lock();
        let expired_entries = slots.entries.values().filter(|e| e.is_expired(now)).count();
        CacheStats {
            total_entries: slots.entries.len(),
            valid_entries: slots.entries.len() - expired_entries,
            expired_entries,
            max_entries: self.max_entries,
            ttl_secs: self.ttl.as_secs(),
        }
    }

    /// Starts a task that sweeps expired entries every `every`. The task stops
    /// when the returned handle is stopped or dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> SweeperHandle {
        let cache = Arc::clone(self);
        let every = every.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let swept = cache.sweep_expired();
                if swept > 0 {
                    debug!(swept, "periodic cache sweep");
                }
            }
        });
        SweeperHandle { task: Some(task) }
    }
}

pub struct SweeperHandle {
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    pub fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
