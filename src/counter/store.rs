// src/counter/store.rs
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::clock::{SharedClock, SystemClock};
use crate::error::StoreError;

/// Key-value store with atomic per-key increments.
///
/// Implementations must make `increment` linearizable per key; no multi-key
/// transactions are ever requested.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn increment(&self, key: &str) -> Result<u64, StoreError>;
    async fn get(&self, key: &str) -> Result<Option<u64>, StoreError>;
    async fn set_expiry(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: u64,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |t| now < t)
    }
}

/// Process-local counter store.
///
/// An expired entry reads as absent and is dropped when touched. Keys nobody reads
/// again (yesterday's daily buckets) are swept once the map doubles past its last
/// swept size, so memory tracks the live key set.
pub struct InMemoryCounterStore {
    inner: Mutex<Entries>,
    clock: SharedClock,
    min_sweep: usize,
}

struct Entries {
    map: HashMap<String, Entry>,
    sweep_at: usize,
}

const MIN_SWEEP_AT: usize = 1024;

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self::with_sweep_threshold(clock, MIN_SWEEP_AT)
    }

    /// Like `with_clock`, sweeping expired keys once `min_sweep` keys are held.
    pub fn with_sweep_threshold(clock: SharedClock, min_sweep: usize) -> Self {
        let min_sweep = min_sweep.max(1);
        Self {
            inner: Mutex::new(Entries {
                map: HashMap::new(),
                sweep_at: min_sweep,
            }),
            clock,
            min_sweep,
        }
    }

    /// Number of keys currently held, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("counter store mutex poisoned").map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired key now. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.inner.lock().expect("counter store mutex poisoned");
        self.sweep(&mut entries, now)
    }

    fn sweep(&self, entries: &mut Entries, now: DateTime<Utc>) -> usize {
        let before = entries.map.len();
        entries.map.retain(|_, e| e.is_live(now));
        entries.sweep_at = entries.map.len().saturating_mul(2).max(self.min_sweep);
        before - entries.map.len()
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let mut entries = self.inner.lock().expect("counter store mutex poisoned");
        if !entries.map.contains_key(key) && entries.map.len() >= entries.sweep_at {
            let removed = self.sweep(&mut entries, now);
            debug!(target: "counter", removed, held = entries.map.len(), "swept expired counters");
        }
        let entry = entries.map.entry(key.to_string()).or_insert(Entry {
            value: 0,
            expires_at: None,
        });
        if !entry.is_live(now) {
            *entry = Entry {
                value: 0,
                expires_at: None,
            };
        }
        entry.value = entry.value.saturating_add(1);
        Ok(entry.value)
    }

    async fn get(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let now = self.clock.now();
        let mut entries = self.inner.lock().expect("counter store mutex poisoned");
        match entries.map.get(key) {
            Some(e) if e.is_live(now) => Ok(Some(e.value)),
            Some(_) => {
                entries.map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_expiry(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut entries = self.inner.lock().expect("counter store mutex poisoned");
        if let Some(e) = entries.map.get_mut(key) {
            // A TTL past the representable range means the key never expires.
            e.expires_at = i64::try_from(ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|ttl| now.checked_add_signed(ttl));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
