//! # News engine
//! One handle over counters, trending, scoring and recommendations.
//! Every operation here returns a value, never an error: degraded paths are
//! handled (and logged) inside the components.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::category::Category;
use crate::clock::{SharedClock, SystemClock};
use crate::config::EngineConfig;
use crate::counter::flush::{DurableArticleStore, FlushExecutor, InMemoryDurableStore};
use crate::counter::store::{CounterStore, InMemoryCounterStore};
use crate::counter::CounterCache;
use crate::model::{ArticleId, PageRequest, RankedPage, TrendingKeyword, UserId};
use crate::providers::{
    InMemoryNewsProvider, InMemoryProfileProvider, NewsProvider, ProfileProvider,
};
use crate::recommend::Recommender;
use crate::scoring::ScoringEngine;
use crate::trending::TrendingAggregator;

/// External collaborators the engine is wired to.
pub struct EngineDeps {
    pub store: Arc<dyn CounterStore>,
    pub durable: Arc<dyn DurableArticleStore>,
    pub news: Arc<dyn NewsProvider>,
    pub profiles: Arc<dyn ProfileProvider>,
    pub clock: SharedClock,
}

impl EngineDeps {
    /// Process-local stores and the given providers, on the wall clock.
    pub fn in_memory(news: Arc<dyn NewsProvider>, profiles: Arc<dyn ProfileProvider>) -> Self {
        Self {
            store: Arc::new(InMemoryCounterStore::new()),
            durable: Arc::new(InMemoryDurableStore::new()),
            news,
            profiles,
            clock: Arc::new(SystemClock),
        }
    }

    /// No articles, no profiles.
    pub fn empty() -> Self {
        Self::in_memory(
            Arc::new(InMemoryNewsProvider::default()),
            Arc::new(InMemoryProfileProvider::new()),
        )
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }
}

pub struct NewsEngine {
    counters: Arc<CounterCache>,
    trending: TrendingAggregator,
    recommender: Recommender,
    clock: SharedClock,
}

impl NewsEngine {
    /// Wire everything up. Spawns the flush workers, so call inside a tokio runtime.
    pub fn new(cfg: &EngineConfig, deps: EngineDeps) -> Self {
        let flush = FlushExecutor::spawn(cfg.flush(), deps.store.clone(), deps.durable);
        let counters = Arc::new(
            CounterCache::new(deps.store, deps.clock.clone(), cfg.daily_ttl_secs).with_flush(flush),
        );
        let scoring = Arc::new(ScoringEngine::new(counters.clone(), deps.clock.clone()));
        let trending = TrendingAggregator::new(
            deps.news.clone(),
            deps.clock.clone(),
            cfg.provider_timeout(),
            cfg.trending(),
        );
        let recommender = Recommender::new(deps.news, deps.profiles, scoring, cfg.recommend());

        Self {
            counters,
            trending,
            recommender,
            clock: deps.clock,
        }
    }

    pub async fn record_view(&self, article_id: ArticleId) -> u64 {
        self.counters.increment(article_id).await
    }

    pub async fn view_count(&self, article_id: ArticleId) -> u64 {
        self.counters.read(article_id).await
    }

    /// Today's (UTC) bucket.
    pub async fn daily_view_count(&self, article_id: ArticleId) -> u64 {
        self.counters.read_today(article_id).await
    }

    pub async fn daily_view_count_on(&self, article_id: ArticleId, date: NaiveDate) -> u64 {
        self.counters.read_daily(article_id, date).await
    }

    pub async fn trending_keywords(&self, window_hours: u32, limit: usize) -> Vec<TrendingKeyword> {
        self.trending.top_keywords(window_hours, limit).await
    }

    pub async fn trending_keywords_by_category(
        &self,
        category: Category,
        limit: usize,
    ) -> Vec<TrendingKeyword> {
        self.trending.top_keywords_by_category(category, limit).await
    }

    pub async fn personalized_news(&self, user_id: UserId) -> RankedPage {
        self.recommender.personalized_news(user_id).await
    }

    pub async fn recommended_news(&self, user_id: UserId, page: PageRequest) -> RankedPage {
        self.recommender.recommended_news(user_id, page).await
    }

    pub async fn popular_news(&self, page: PageRequest) -> RankedPage {
        self.recommender.popular_news(page).await
    }

    pub fn flush_queue_depth(&self) -> usize {
        self.counters
            .flush_executor()
            .map(|f| f.queue_depth())
            .unwrap_or(0)
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Drain pending flushes.
    pub async fn shutdown(&self) {
        self.counters.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::{ArticleSignal, ArticleText};
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn views_flow_into_counts_and_daily_buckets() {
        let t0 = Utc.with_ymd_and_hms(2025, 9, 6, 23, 0, 0).unwrap();
        let clock = ManualClock::new(t0);
        let shared: SharedClock = Arc::new(clock.clone());
        let mut deps = EngineDeps::empty().with_clock(shared.clone());
        deps.store = Arc::new(InMemoryCounterStore::with_clock(shared));
        let engine = NewsEngine::new(&EngineConfig::default(), deps);

        assert_eq!(engine.record_view(1).await, 1);
        clock.advance(Duration::hours(2)); // next UTC day
        assert_eq!(engine.record_view(1).await, 2);

        assert_eq!(engine.view_count(1).await, 2);
        assert_eq!(engine.daily_view_count(1).await, 1);
        assert_eq!(engine.daily_view_count_on(1, t0.date_naive()).await, 1);
        engine.shutdown().await;
        assert_eq!(engine.flush_queue_depth(), 0);
    }

    #[tokio::test]
    async fn popular_feed_orders_by_popularity() {
        let now = Utc::now();
        let mk = |id, views, trusted| ArticleText {
            signal: ArticleSignal {
                id,
                category: Category::Economy,
                title: String::new(),
                view_count: views,
                share_count: 0,
                trusted,
                published_at: now - Duration::hours(1),
            },
            content: None,
        };
        let news = Arc::new(InMemoryNewsProvider::new(vec![
            mk(1, 10, false),
            mk(2, 10_000, false),
            mk(3, 10, true),
        ]));
        let engine = NewsEngine::new(
            &EngineConfig::default(),
            EngineDeps::in_memory(news, Arc::new(InMemoryProfileProvider::new())),
        );

        let page = engine.popular_news(PageRequest::new(0, 2)).await;
        let ids: Vec<_> = page.items.iter().map(|r| r.article_id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(page.total_count, 3);
        assert_eq!(page.items[0].rank, 1);
        assert!(page.items[0].score > page.items[1].score);
    }
}
