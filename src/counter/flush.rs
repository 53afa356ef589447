// src/counter/flush.rs
//! Background flush of lifetime view counters into the durable article record.
//!
//! A fixed pool of tokio workers drains a bounded queue. Submission never waits:
//! a full queue drops the job (the next view of that article schedules another one).
//! Writes are last-writer-wins overwrites, so duplicate or reordered jobs are harmless.
//! A failed flush is not requeued; the next view of the article flushes the then
//! current value.

use anyhow::Result;
use metrics::{counter, gauge};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::lifetime_key;
use super::store::CounterStore;
use crate::model::ArticleId;

#[async_trait::async_trait]
pub trait DurableArticleStore: Send + Sync {
    /// Overwrite the stored view count of one article.
    async fn persist_view_count(&self, article_id: ArticleId, count: u64) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct FlushConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            queue_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FlushJob {
    article_id: ArticleId,
}

pub struct FlushExecutor {
    tx: Mutex<Option<mpsc::Sender<FlushJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    depth: Arc<AtomicUsize>,
    dropped: AtomicU64,
    failures: Arc<AtomicU64>,
}

impl FlushExecutor {
    /// Spawn the worker pool. Must be called inside a tokio runtime.
    pub fn spawn(
        cfg: FlushConfig,
        store: Arc<dyn CounterStore>,
        durable: Arc<dyn DurableArticleStore>,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<FlushJob>(cfg.queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let depth = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicU64::new(0));

        let workers = (0..cfg.workers.max(1))
            .map(|worker| {
                let rx = rx.clone();
                let store = store.clone();
                let durable = durable.clone();
                let depth = depth.clone();
                let failures = failures.clone();
                tokio::spawn(async move {
                    loop {
                        // Only the receive is serialized; processing runs in parallel.
                        let job = { rx.lock().await.recv().await };
                        let Some(job) = job else { break };
                        let left = depth.fetch_sub(1, Ordering::AcqRel).saturating_sub(1);
                        gauge!("flush_queue_depth").set(left as f64);
                        if !flush_one(worker, job, store.as_ref(), durable.as_ref()).await {
                            failures.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    debug!(target: "counter", worker, "flush worker stopped");
                })
            })
            .collect();

        Self {
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            depth,
            dropped: AtomicU64::new(0),
            failures,
        }
    }

    /// Fire-and-forget. Returns whether the job was queued.
    pub fn submit(&self, article_id: ArticleId) -> bool {
        let tx = match self.tx.lock().expect("flush sender mutex poisoned").as_ref() {
            Some(tx) => tx.clone(),
            None => return false,
        };

        self.depth.fetch_add(1, Ordering::AcqRel);
        match tx.try_send(FlushJob { article_id }) {
            Ok(()) => {
                gauge!("flush_queue_depth").set(self.queue_depth() as f64);
                true
            }
            Err(e) => {
                self.depth.fetch_sub(1, Ordering::AcqRel);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                counter!("flush_dropped_total").increment(1);
                warn!(target: "counter", article_id, error = %e, "flush queue rejected job");
                false
            }
        }
    }

    /// Jobs queued but not yet picked up by a worker.
    pub fn queue_depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Jobs rejected because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Jobs whose read or write failed.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Close the queue and wait until every queued job has been processed.
    pub async fn shutdown(&self) {
        drop(self.tx.lock().expect("flush sender mutex poisoned").take());
        let handles = std::mem::take(&mut *self.workers.lock().expect("flush workers mutex poisoned"));
        for h in handles {
            if let Err(e) = h.await {
                warn!(target: "counter", error = %e, "flush worker panicked");
            }
        }
    }
}

/// Returns false when the job failed.
async fn flush_one(
    worker: usize,
    job: FlushJob,
    store: &dyn CounterStore,
    durable: &dyn DurableArticleStore,
) -> bool {
    counter!("flush_jobs_total").increment(1);
    let key = lifetime_key(job.article_id);

    // Read at flush time: whatever is current wins.
    let value = match store.get(&key).await {
        Ok(Some(v)) => v,
        Ok(None) => return true,
        Err(e) => {
            counter!("flush_failures_total").increment(1);
            warn!(target: "counter", worker, article_id = job.article_id, error = %e, "flush read failed");
            return false;
        }
    };

    match durable.persist_view_count(job.article_id, value).await {
        Ok(()) => {
            debug!(target: "counter", worker, article_id = job.article_id, value, "flushed");
            true
        }
        Err(e) => {
            counter!("flush_failures_total").increment(1);
            warn!(target: "counter", worker, article_id = job.article_id, error = ?e, "flush write failed");
            false
        }
    }
}

// --- In-memory durable store (tests / demo binary) ---
#[derive(Default)]
pub struct InMemoryDurableStore {
    counts: Mutex<HashMap<ArticleId, u64>>,
    writes: AtomicU64,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view_count(&self, article_id: ArticleId) -> Option<u64> {
        self.counts
            .lock()
            .expect("durable store mutex poisoned")
            .get(&article_id)
            .copied()
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl DurableArticleStore for InMemoryDurableStore {
    async fn persist_view_count(&self, article_id: ArticleId, count: u64) -> Result<()> {
        self.counts
            .lock()
            .expect("durable store mutex poisoned")
            .insert(article_id, count);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::store::InMemoryCounterStore;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Semaphore;

    /// Blocks every write until a permit is released.
    struct GatedStore {
        gate: Arc<Semaphore>,
        inner: InMemoryDurableStore,
    }

    #[async_trait::async_trait]
    impl DurableArticleStore for GatedStore {
        async fn persist_view_count(&self, article_id: ArticleId, count: u64) -> Result<()> {
            let _permit = self.gate.acquire().await?;
            self.inner.persist_view_count(article_id, count).await
        }
    }

    /// Rejects the first write, then behaves.
    struct FailsOnceStore {
        failed: AtomicBool,
        inner: InMemoryDurableStore,
    }

    #[async_trait::async_trait]
    impl DurableArticleStore for FailsOnceStore {
        async fn persist_view_count(&self, article_id: ArticleId, count: u64) -> Result<()> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                anyhow::bail!("article table locked");
            }
            self.inner.persist_view_count(article_id, count).await
        }
    }

    #[tokio::test]
    async fn failed_flush_is_caught_up_by_the_next_view() {
        let store = Arc::new(InMemoryCounterStore::new());
        let durable = Arc::new(FailsOnceStore {
            failed: AtomicBool::new(false),
            inner: InMemoryDurableStore::new(),
        });
        let ex = FlushExecutor::spawn(
            FlushConfig {
                workers: 1,
                queue_capacity: 16,
            },
            store.clone(),
            durable.clone(),
        );

        store.increment(&lifetime_key(4)).await.unwrap();
        assert!(ex.submit(4));
        store.increment(&lifetime_key(4)).await.unwrap();
        assert!(ex.submit(4));
        ex.shutdown().await;

        assert_eq!(ex.failures(), 1);
        assert_eq!(durable.inner.view_count(4), Some(2));
        assert_eq!(durable.inner.writes(), 1);
    }

    #[tokio::test]
    async fn flushes_current_value_and_drains_on_shutdown() {
        let store = Arc::new(InMemoryCounterStore::new());
        let durable = Arc::new(InMemoryDurableStore::new());
        for _ in 0..5 {
            store.increment(&lifetime_key(9)).await.unwrap();
        }
        let ex = FlushExecutor::spawn(FlushConfig::default(), store.clone(), durable.clone());
        assert!(ex.submit(9));
        ex.shutdown().await;

        assert_eq!(durable.view_count(9), Some(5));
        assert_eq!(ex.queue_depth(), 0);
        assert!(!ex.submit(9), "closed executor must reject jobs");
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let store = Arc::new(InMemoryCounterStore::new());
        store.increment(&lifetime_key(1)).await.unwrap();
        let gate = Arc::new(Semaphore::new(0));
        let durable = Arc::new(GatedStore {
            gate: gate.clone(),
            inner: InMemoryDurableStore::new(),
        });
        let ex = FlushExecutor::spawn(
            FlushConfig {
                workers: 1,
                queue_capacity: 2,
            },
            store,
            durable.clone(),
        );

        let mut accepted = 0;
        for _ in 0..10 {
            if ex.submit(1) {
                accepted += 1;
            }
            tokio::task::yield_now().await;
        }
        // One job may be held by the blocked worker; the queue holds at most two more.
        assert!(accepted <= 3, "accepted {accepted}");
        assert!(ex.queue_depth() <= 2);
        assert_eq!(ex.dropped(), 10 - accepted as u64);

        gate.add_permits(100);
        ex.shutdown().await;
        assert_eq!(durable.inner.view_count(1), Some(1));
        assert_eq!(durable.inner.writes(), accepted as u64);
    }
}
