// src/trending.rs
//! Trending keywords: frequency of extracted tokens over a recent window.
//!
//! Queries never come back empty. Provider failure or a window with no surviving
//! tokens both yield the fixed default keywords (count 1 each).

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::category::{Category, GENERAL_DEFAULT_KEYWORDS};
use crate::clock::SharedClock;
use crate::keywords::{extract, normalize_text};
use crate::model::{ArticleText, TrendingKeyword};
use crate::providers::{with_timeout, NewsProvider};

/// Body prefix scanned in the category variant.
pub const BODY_SCAN_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy)]
pub struct TrendingConfig {
    pub category_window_hours: u32,
    pub category_pool_size: usize,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            category_window_hours: 720,
            category_pool_size: 500,
        }
    }
}

pub struct TrendingAggregator {
    news: Arc<dyn NewsProvider>,
    clock: SharedClock,
    timeout: Duration,
    cfg: TrendingConfig,
}

impl TrendingAggregator {
    pub fn new(
        news: Arc<dyn NewsProvider>,
        clock: SharedClock,
        timeout: Duration,
        cfg: TrendingConfig,
    ) -> Self {
        Self {
            news,
            clock,
            timeout,
            cfg,
        }
    }

    /// Top `limit` title keywords over the last `window_hours`.
    pub async fn top_keywords(&self, window_hours: u32, limit: usize) -> Vec<TrendingKeyword> {
        let hours = window_hours.max(1);
        let limit = limit.max(1);
        let now = self.clock.now();
        let since = now - ChronoDuration::hours(i64::from(hours));

        let articles = match with_timeout(self.news.name(), self.timeout, self.news.query_recent(since)).await {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "trending", error = %e, hours, "recent articles unavailable");
                return defaults(&GENERAL_DEFAULT_KEYWORDS, hours, limit, "general");
            }
        };

        let tokens = in_window(&articles, since, now).flat_map(|a| extract(&normalize_text(&a.signal.title)));
        let ranked = rank_terms(tokens, hours, limit);
        if ranked.is_empty() {
            return defaults(&GENERAL_DEFAULT_KEYWORDS, hours, limit, "general");
        }
        info!(target: "trending", hours, articles = articles.len(), top = %ranked[0].term, "trending computed");
        ranked
    }

    /// Top `limit` keywords for one category, from titles and body prefixes.
    pub async fn top_keywords_by_category(&self, category: Category, limit: usize) -> Vec<TrendingKeyword> {
        let hours = self.cfg.category_window_hours.max(1);
        let limit = limit.max(1);
        let now = self.clock.now();
        let since = now - ChronoDuration::hours(i64::from(hours));
        let fallback = category.default_keywords();

        let fut = self
            .news
            .query_recent_in_category(category, since, self.cfg.category_pool_size);
        let articles = match with_timeout(self.news.name(), self.timeout, fut).await {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "trending", error = %e, %category, "category articles unavailable");
                return defaults(&fallback, hours, limit, category.code());
            }
        };

        let tokens = in_window(&articles, since, now)
            .filter(|a| a.signal.category == category)
            .take(self.cfg.category_pool_size)
            .flat_map(|a| {
                let mut toks = extract(&normalize_text(&a.signal.title));
                if let Some(body) = a.content.as_deref() {
                    toks.extend(extract(&body_prefix(body)));
                }
                toks
            });
        let ranked = rank_terms(tokens, hours, limit);
        if ranked.is_empty() {
            return defaults(&fallback, hours, limit, category.code());
        }
        ranked
    }
}

fn in_window<'a>(
    articles: &'a [ArticleText],
    since: DateTime<Utc>,
    now: DateTime<Utc>,
) -> impl Iterator<Item = &'a ArticleText> {
    articles
        .iter()
        .filter(move |a| a.signal.published_at >= since && a.signal.published_at <= now)
}

fn body_prefix(body: &str) -> String {
    normalize_text(body).chars().take(BODY_SCAN_CHARS).collect()
}

/// Count tokens; order by count desc, then term asc; keep `limit`.
pub fn rank_terms<I>(tokens: I, window_hours: u32, limit: usize) -> Vec<TrendingKeyword>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, u64> = HashMap::new();
    for t in tokens {
        *counts.entry(t).or_insert(0) += 1;
    }
    let mut v: Vec<(String, u64)> = counts.into_iter().collect();
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    v.into_iter()
        .take(limit)
        .map(|(term, count)| TrendingKeyword {
            term,
            count,
            window_hours,
        })
        .collect()
}

fn defaults(list: &[&str], window_hours: u32, limit: usize, scope: &str) -> Vec<TrendingKeyword> {
    counter!("trending_default_total").increment(1);
    info!(target: "trending", scope, "using default keywords");
    list.iter()
        .take(limit)
        .map(|t| TrendingKeyword {
            term: (*t).to_string(),
            count: 1,
            window_hours,
        })
        .collect()
}
