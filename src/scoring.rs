// src/scoring.rs
//! Article scores.
//!
//! Two weighted formulas coexist on purpose and are not interchangeable:
//! - [`popularity`] ranks the popular feed (views, shares, recency, trust).
//! - [`priority`] orders candidates in the personalized feed (trust-heavy, coarser tiers).
//!
//! Both are pure given `now`; [`ScoringEngine`] feeds them live counter values.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::clock::SharedClock;
use crate::counter::CounterCache;
use crate::model::ArticleSignal;

const VIEW_CEILING: f64 = 100_000.0;
const SHARE_CEILING: f64 = 1_000.0;
const PRIORITY_VIEW_CEILING: f64 = 1_000.0;

/// Whole hours since publish; future timestamps count as fresh.
pub fn hours_since(published_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - published_at).num_hours().max(0)
}

fn log_ratio(x: u64, ceiling: f64) -> f64 {
    ((x as f64) + 1.0).log10() / (ceiling + 1.0).log10()
}

pub fn view_score(view_count: u64) -> f64 {
    log_ratio(view_count, VIEW_CEILING).min(1.0)
}

pub fn share_score(share_count: u64) -> f64 {
    log_ratio(share_count, SHARE_CEILING).min(1.0)
}

pub fn time_score(hours: i64) -> f64 {
    match hours {
        h if h <= 24 => 1.0,
        h if h <= 48 => 0.8,
        h if h <= 72 => 0.6,
        h if h <= 168 => 0.4,
        _ => 0.2,
    }
}

pub fn popularity(
    view_count: u64,
    share_count: u64,
    trusted: bool,
    published_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let trust = if trusted { 1.0 } else { 0.0 };
    let s = 0.4 * view_score(view_count)
        + 0.3 * share_score(share_count)
        + 0.2 * time_score(hours_since(published_at, now))
        + 0.1 * trust;
    s.clamp(0.0, 1.0)
}

fn priority_time(hours: i64) -> f64 {
    match hours {
        h if h <= 24 => 0.3,
        h if h <= 48 => 0.2,
        h if h <= 72 => 0.1,
        _ => 0.0,
    }
}

pub fn priority(
    view_count: u64,
    trusted: bool,
    published_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let trust = if trusted { 0.4 } else { 0.0 };
    let views = log_ratio(view_count, PRIORITY_VIEW_CEILING).min(0.3);
    (trust + views + priority_time(hours_since(published_at, now))).clamp(0.0, 1.0)
}

/// Scores with the live view counter merged into the provider snapshot.
pub struct ScoringEngine {
    counters: Arc<CounterCache>,
    clock: SharedClock,
}

impl ScoringEngine {
    pub fn new(counters: Arc<CounterCache>, clock: SharedClock) -> Self {
        Self { counters, clock }
    }

    /// The snapshot may be ahead of a freshly restarted cache, so take the larger.
    pub async fn effective_views(&self, article: &ArticleSignal) -> u64 {
        self.counters.read(article.id).await.max(article.view_count)
    }

    pub async fn popularity(&self, article: &ArticleSignal) -> f64 {
        let views = self.effective_views(article).await;
        popularity(
            views,
            article.share_count,
            article.trusted,
            article.published_at,
            self.clock.now(),
        )
    }

    pub async fn priority(&self, article: &ArticleSignal) -> f64 {
        let views = self.effective_views(article).await;
        priority(views, article.trusted, article.published_at, self.clock.now())
    }

    /// Popularity for each article, highest first; ties by id ascending.
    pub async fn rank_by_popularity(&self, articles: Vec<ArticleSignal>) -> Vec<(ArticleSignal, f64)> {
        let mut scored = Vec::with_capacity(articles.len());
        for a in articles {
            let s = self.popularity(&a).await;
            scored.push((a, s));
        }
        scored.sort_by(|(a, sa), (b, sb)| sb.total_cmp(sa).then(a.id.cmp(&b.id)));
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::counter::store::InMemoryCounterStore;
    use crate::counter::DEFAULT_DAILY_TTL_SECS;
    use crate::category::Category;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn popularity_worked_example() {
        let s = popularity(999, 0, true, t0() - Duration::hours(10), t0());
        // 0.4 * log10(1000)/log10(100001) + 0.2 + 0.1
        assert!((s - 0.54).abs() < 1e-3, "got {s}");
    }

    #[test]
    fn time_tiers_step_at_boundaries() {
        assert_eq!(time_score(24), 1.0);
        assert_eq!(time_score(25), 0.8);
        assert_eq!(time_score(168), 0.4);
        assert_eq!(time_score(169), 0.2);
        assert_eq!(priority_time(72), 0.1);
        assert_eq!(priority_time(73), 0.0);
    }

    #[test]
    fn future_publish_counts_as_fresh() {
        assert_eq!(hours_since(t0() + Duration::hours(3), t0()), 0);
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let now = t0();
        for views in [0, 1, 999, 100_000, u64::MAX] {
            for shares in [0, 10, 1_000, u64::MAX] {
                for trusted in [false, true] {
                    for age in [0, 30, 100, 10_000] {
                        let p = popularity(views, shares, trusted, now - Duration::hours(age), now);
                        let q = priority(views, trusted, now - Duration::hours(age), now);
                        assert!((0.0..=1.0).contains(&p));
                        assert!((0.0..=1.0).contains(&q));
                    }
                }
            }
        }
        assert!((priority(u64::MAX, true, now, now) - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn engine_uses_larger_of_cache_and_snapshot() {
        let clock: SharedClock = Arc::new(ManualClock::new(t0()));
        let counters = Arc::new(CounterCache::new(
            Arc::new(InMemoryCounterStore::with_clock(clock.clone())),
            clock.clone(),
            DEFAULT_DAILY_TTL_SECS,
        ));
        for _ in 0..3 {
            counters.increment(1).await;
        }
        let engine = ScoringEngine::new(counters, clock);
        let mut a = ArticleSignal {
            id: 1,
            category: Category::Economy,
            title: String::new(),
            view_count: 1,
            share_count: 0,
            trusted: false,
            published_at: t0(),
        };
        assert_eq!(engine.effective_views(&a).await, 3);
        a.view_count = 50;
        assert_eq!(engine.effective_views(&a).await, 50);
    }
}
