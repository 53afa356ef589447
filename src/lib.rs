// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod category;
pub mod clock;
pub mod config;
pub mod counter;
pub mod diversify;
pub mod engine;
pub mod error;
pub mod keywords;
pub mod metrics;
pub mod model;
pub mod providers;
pub mod recommend;
pub mod scoring;
pub mod trending;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::category::Category;
pub use crate::config::EngineConfig;
pub use crate::engine::{EngineDeps, NewsEngine};
pub use crate::model::{PageRequest, RankedPage, RankedResult, TrendingKeyword};

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::counter::redis_store::RedisCounterStore;
use crate::counter::store::CounterStore;
use crate::providers::{
    HttpNewsProvider, HttpProfileProvider, InMemoryNewsProvider, InMemoryProfileProvider,
    NewsProvider, ProfileProvider,
};

/// Wire the engine from configuration.
///
/// Redis is optional: if it cannot be reached at startup the engine runs on
/// process-local counters and says so in the log. Provider URLs select the HTTP
/// adapters; without them articles come from `fixtures_path` (or nothing).
pub async fn build_engine(cfg: &EngineConfig) -> Result<NewsEngine> {
    let mut deps = EngineDeps::empty();

    if let Some(url) = cfg.redis_url.as_deref() {
        match RedisCounterStore::connect(url, cfg.redis_connect_timeout()).await {
            Ok(store) => {
                info!("counter store: redis");
                deps.store = Arc::new(store) as Arc<dyn CounterStore>;
            }
            Err(e) => warn!(error = %e, "redis unavailable at startup; using in-memory counters"),
        }
    }

    deps.news = match (&cfg.news_api_url, &cfg.fixtures_path) {
        (Some(url), _) => {
            Arc::new(HttpNewsProvider::new(url.clone(), cfg.provider_timeout())?) as Arc<dyn NewsProvider>
        }
        (None, Some(path)) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading article fixtures from {}", path.display()))?;
            let p = InMemoryNewsProvider::from_json(&raw)
                .with_context(|| format!("parsing article fixtures {}", path.display()))?;
            Arc::new(p)
        }
        (None, None) => Arc::new(InMemoryNewsProvider::default()),
    };

    deps.profiles = match &cfg.profile_api_url {
        Some(url) => Arc::new(HttpProfileProvider::new(url.clone(), cfg.provider_timeout())?)
            as Arc<dyn ProfileProvider>,
        None => Arc::new(InMemoryProfileProvider::new()),
    };

    info!(
        news = deps.news.name(),
        profiles = deps.profiles.name(),
        store = deps.store.name(),
        "engine wired"
    );
    Ok(NewsEngine::new(cfg, deps))
}
