//! Metric descriptions and the Prometheus `/metrics` route.

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Register help text for every metric the engine emits. Idempotent.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("views_recorded_total", "View events received.");
        describe_counter!(
            "counter_store_errors_total",
            "Counter store operations that failed (label: op)."
        );
        describe_counter!("flush_jobs_total", "Flush jobs picked up by a worker.");
        describe_counter!(
            "flush_failures_total",
            "Flush jobs that failed to read or persist."
        );
        describe_counter!(
            "flush_dropped_total",
            "Flush jobs rejected because the queue was full or closed."
        );
        describe_gauge!("flush_queue_depth", "Flush jobs waiting in the queue.");
        describe_counter!(
            "recommend_fallback_total",
            "Recommendation fallbacks taken (label: path)."
        );
        describe_counter!(
            "trending_default_total",
            "Trending queries answered with default keywords."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("installing prometheus recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
