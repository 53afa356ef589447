// src/counter/mod.rs
//! View counters: a lifetime counter and a daily bucket per article, backed by a
//! shared `CounterStore`, with background flushes to the durable article record.
//!
//! Nothing in here returns an error to the view-tracking caller. Store failures are
//! logged, counted, and turned into "previous known value" (writes) or 0 (reads).

pub mod flush;
pub mod redis_store;
pub mod store;

use chrono::NaiveDate;
use metrics::counter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::clock::SharedClock;
use crate::error::StoreError;
use crate::model::ArticleId;
use flush::FlushExecutor;
use store::CounterStore;

pub const DEFAULT_DAILY_TTL_SECS: u64 = 24 * 60 * 60;

/// Articles whose last counter value is kept for outage answers.
const LAST_KNOWN_CAP: usize = 100_000;

pub fn lifetime_key(article_id: ArticleId) -> String {
    format!("news:viewcount:{article_id}")
}

pub fn daily_key(article_id: ArticleId, date: NaiveDate) -> String {
    format!("news:daily:viewcount:{article_id}:{}", date.format("%Y-%m-%d"))
}

pub struct CounterCache {
    store: Arc<dyn CounterStore>,
    clock: SharedClock,
    daily_ttl_secs: u64,
    flush: Option<FlushExecutor>,
    /// At most `last_known_cap` articles; an arbitrary one is evicted past that.
    last_known: Mutex<HashMap<ArticleId, u64>>,
    last_known_cap: usize,
    /// Daily buckets whose expiry could not be set yet, per article.
    unarmed: Mutex<HashMap<ArticleId, Vec<String>>>,
}

impl CounterCache {
    pub fn new(store: Arc<dyn CounterStore>, clock: SharedClock, daily_ttl_secs: u64) -> Self {
        Self {
            store,
            clock,
            daily_ttl_secs,
            flush: None,
            last_known: Mutex::new(HashMap::new()),
            last_known_cap: LAST_KNOWN_CAP,
            unarmed: Mutex::new(HashMap::new()),
        }
    }

    /// Attach the background flush pool. Without one, counts live only in the store.
    pub fn with_flush(mut self, flush: FlushExecutor) -> Self {
        self.flush = Some(flush);
        self
    }

    pub fn flush_executor(&self) -> Option<&FlushExecutor> {
        self.flush.as_ref()
    }

    /// Count one view. Returns the new lifetime value, or the last value seen for
    /// this article (0 if none) when the store is down.
    pub async fn increment(&self, article_id: ArticleId) -> u64 {
        counter!("views_recorded_total").increment(1);

        let lifetime = match self.store.increment(&lifetime_key(article_id)).await {
            Ok(v) => {
                self.remember(article_id, v);
                v
            }
            Err(e) => {
                self.store_error("increment", article_id, &e);
                return self.last_known(article_id);
            }
        };

        let day = daily_key(article_id, self.clock.now().date_naive());
        let mut to_arm = self.take_unarmed(article_id);
        match self.store.increment(&day).await {
            // First write of the bucket fixes its expiry; later writes never extend it.
            Ok(1) if !to_arm.contains(&day) => to_arm.push(day),
            Ok(_) => {}
            Err(e) => self.store_error("increment_daily", article_id, &e),
        }
        for key in to_arm {
            if let Err(e) = self.store.set_expiry(&key, self.daily_ttl_secs).await {
                self.store_error("set_expiry", article_id, &e);
                self.unarmed
                    .lock()
                    .expect("unarmed mutex poisoned")
                    .entry(article_id)
                    .or_default()
                    .push(key);
            }
        }

        if let Some(flush) = &self.flush {
            flush.submit(article_id);
        }
        debug!(target: "counter", article_id, lifetime, "view recorded");
        lifetime
    }

    /// Lifetime views; 0 when absent or unreadable.
    pub async fn read(&self, article_id: ArticleId) -> u64 {
        match self.store.get(&lifetime_key(article_id)).await {
            Ok(Some(v)) => {
                self.remember(article_id, v);
                v
            }
            Ok(None) => 0,
            Err(e) => {
                self.store_error("read", article_id, &e);
                0
            }
        }
    }

    /// Views in the UTC day `date`; 0 when absent, expired or unreadable.
    pub async fn read_daily(&self, article_id: ArticleId, date: NaiveDate) -> u64 {
        match self.store.get(&daily_key(article_id, date)).await {
            Ok(v) => v.unwrap_or(0),
            Err(e) => {
                self.store_error("read_daily", article_id, &e);
                0
            }
        }
    }

    /// Views in the current UTC day.
    pub async fn read_today(&self, article_id: ArticleId) -> u64 {
        let today = self.clock.now().date_naive();
        self.read_daily(article_id, today).await
    }

    /// Drain pending flushes. Safe to call more than once.
    pub async fn shutdown(&self) {
        if let Some(flush) = &self.flush {
            flush.shutdown().await;
        }
    }

    fn take_unarmed(&self, article_id: ArticleId) -> Vec<String> {
        self.unarmed
            .lock()
            .expect("unarmed mutex poisoned")
            .remove(&article_id)
            .unwrap_or_default()
    }

    fn remember(&self, article_id: ArticleId, value: u64) {
        let mut m = self.last_known.lock().expect("last_known mutex poisoned");
        if m.len() >= self.last_known_cap && !m.contains_key(&article_id) {
            if let Some(evict) = m.keys().next().copied() {
                m.remove(&evict);
            }
        }
        let slot = m.entry(article_id).or_insert(0);
        *slot = (*slot).max(value);
    }

    fn last_known(&self, article_id: ArticleId) -> u64 {
        self.last_known
            .lock()
            .expect("last_known mutex poisoned")
            .get(&article_id)
            .copied()
            .unwrap_or(0)
    }

    fn store_error(&self, op: &'static str, article_id: ArticleId, e: &StoreError) {
        counter!("counter_store_errors_total", "op" => op).increment(1);
        warn!(target: "counter", store = self.store.name(), op, article_id, error = %e, "counter store error");
    }
}
