// src/recommend.rs
//! # Recommendation orchestrator
//!
//! Three feeds, each returning a `RankedPage` no matter what upstream does:
//!
//! - **personalized**: profile → categories → candidates → diversify → page of ≤10.
//! - **recommended** (hybrid): content + "collaborative" + popular backfill, ordered by
//!   relevance to the stated interests, paginated in memory.
//! - **popular**: popular pool scored by `popularity`.
//!
//! Every upstream call is time-bounded. Failures take an explicit fallback branch
//! (trusted articles, then an empty page) and are counted in `recommend_fallback_total`.

use metrics::counter;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::category::{map_categories, Category};
use crate::diversify::diversify;
use crate::error::{OrFallback, ProviderError, RecommendError};
use crate::model::{
    rank_in_order, ArticleId, ArticleSignal, PageRequest, RankedPage, RankedResult, UserId,
    UserProfile,
};
use crate::providers::{with_timeout, NewsProvider, ProfileProvider};
use crate::scoring::ScoringEngine;

/// Size of the personalized feed and of the cold-start trusted list.
pub const FEED_SIZE: usize = 10;
/// Candidate pool for the personalized feed.
pub const CANDIDATE_POOL: usize = 15;

const HYBRID_COLD_POOL: usize = 50;
const CONTENT_POOL: usize = 20;
const COLLABORATIVE_POOL: usize = 10;
const POPULAR_BACKFILL: usize = 10;
const HYBRID_MIN: usize = 15;
const HYBRID_CAP: usize = 20;
const MAX_TRUSTED_FALLBACK: usize = 1000;

#[derive(Debug, Clone, Copy)]
pub struct RecommendConfig {
    pub provider_timeout: Duration,
    pub popular_pool_size: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_millis(3000),
            popular_pool_size: 100,
        }
    }
}

/// Short, stable, non-reversible id for logs.
pub fn anon_user(user_id: UserId) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(user_id.to_string().as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// 0.6 when the article's category was requested, plus 0.1 per stated interest
/// found in the title (at most 0.4). Without interests every article scores 0.5.
pub fn relevance(article: &ArticleSignal, interests: &[String], categories: &[Category]) -> f64 {
    if interests.is_empty() {
        return 0.5;
    }
    let mut score = 0.0;
    if categories.contains(&article.category) {
        score += 0.6;
    }
    let title = article.title.to_lowercase();
    let hits = interests
        .iter()
        .map(|i| i.trim().to_lowercase())
        .filter(|i| !i.is_empty() && title.contains(i.as_str()))
        .count();
    score += (hits as f64 * 0.1).min(0.4);
    score.min(1.0)
}

/// Trusted rows needed to fill `page`, bounded so a deep page cannot ask upstream for everything.
fn trusted_limit(page: PageRequest) -> usize {
    page.offset()
        .saturating_add(page.page_size)
        .min(MAX_TRUSTED_FALLBACK)
}

fn fallback(path: &'static str) {
    counter!("recommend_fallback_total", "path" => path).increment(1);
}

pub struct Recommender {
    news: Arc<dyn NewsProvider>,
    profiles: Arc<dyn ProfileProvider>,
    scoring: Arc<ScoringEngine>,
    cfg: RecommendConfig,
}

impl Recommender {
    pub fn new(
        news: Arc<dyn NewsProvider>,
        profiles: Arc<dyn ProfileProvider>,
        scoring: Arc<ScoringEngine>,
        cfg: RecommendConfig,
    ) -> Self {
        Self {
            news,
            profiles,
            scoring,
            cfg,
        }
    }

    // ---------------- personalized ----------------

    pub async fn personalized_news(&self, user_id: UserId) -> RankedPage {
        let user = anon_user(user_id);
        match self.try_personalized(user_id, &user).await {
            Ok(page) => page,
            Err(e) => {
                fallback("personalized");
                warn!(target: "recommend", user = %user, error = %e, "personalized feed failed; serving trusted");
                self.trusted_page(FEED_SIZE, PageRequest::new(0, FEED_SIZE)).await
            }
        }
    }

    async fn try_personalized(&self, user_id: UserId, user: &str) -> Result<RankedPage, RecommendError> {
        let profile = self.gather_profile(user_id).await;
        let first_page = PageRequest::new(0, FEED_SIZE);

        if profile.is_cold_start() {
            info!(target: "recommend", user = %user, "cold start");
            return Ok(self.trusted_page(FEED_SIZE, first_page).await);
        }

        let categories = self.usable_categories(&profile, user)?;
        let candidates = if categories.is_empty() {
            self.call_news(self.news.query_trusted(CANDIDATE_POOL)).await?
        } else {
            self.call_news(self.news.query_by_category(&categories, CANDIDATE_POOL))
                .await?
        };

        let picked = diversify(&candidates, FEED_SIZE);
        debug!(target: "recommend", user = %user, candidates = candidates.len(), picked = picked.len(), "diversified");
        let ranked = self.rank_by_priority(picked).await;
        Ok(RankedPage::paginate(ranked, first_page))
    }

    // ---------------- recommended (hybrid) ----------------

    pub async fn recommended_news(&self, user_id: UserId, page: PageRequest) -> RankedPage {
        let user = anon_user(user_id);
        match self.try_hybrid(user_id, &user, page).await {
            Ok(p) => p,
            Err(e) => {
                fallback("recommended");
                warn!(target: "recommend", user = %user, error = %e, "recommended feed failed; serving trusted");
                self.trusted_page(trusted_limit(page), page).await
            }
        }
    }

    async fn try_hybrid(&self, user_id: UserId, user: &str, page: PageRequest) -> Result<RankedPage, RecommendError> {
        let profile = self.gather_profile(user_id).await;

        let categories = match self.usable_categories(&profile, user) {
            Ok(c) if !profile.is_cold_start() => c,
            Ok(_) | Err(RecommendError::NoUsableCategories { .. }) => {
                info!(target: "recommend", user = %user, "no usable profile signal; diversified trusted feed");
                let trusted = self.call_news(self.news.query_trusted(HYBRID_COLD_POOL)).await?;
                let ranked = self.rank_by_priority(diversify(&trusted, FEED_SIZE)).await;
                return Ok(RankedPage::paginate(ranked, page));
            }
            Err(e) => return Err(e),
        };

        let scored = match self.hybrid_candidates(&profile, &categories).await {
            Ok(v) => v,
            Err(e) => {
                fallback("hybrid_candidates");
                warn!(target: "recommend", user = %user, error = %e, "hybrid candidates failed; using trusted pool");
                let trusted = self.call_news(self.news.query_trusted(CANDIDATE_POOL)).await?;
                self.by_relevance(trusted, &profile.preferred_categories, &categories)
            }
        };

        info!(
            target: "recommend",
            user = %user,
            user_type = ?profile.user_type(),
            candidates = scored.len(),
            "hybrid ranked"
        );
        Ok(RankedPage::paginate(rank_in_order(scored), page))
    }

    async fn hybrid_candidates(
        &self,
        profile: &UserProfile,
        categories: &[Category],
    ) -> Result<Vec<(ArticleId, f64)>, ProviderError> {
        let mut pool: Vec<ArticleSignal> = Vec::new();

        if !categories.is_empty() {
            pool.extend(
                self.call_news(self.news.query_by_category(categories, CONTENT_POOL))
                    .await?,
            );
            // Simplified stand-in for collaborative filtering: same interests, smaller slice.
            let collaborative = self
                .call_news(self.news.query_by_category(categories, COLLABORATIVE_POOL))
                .await
                .or_fallback("collaborative candidates", Vec::new);
            pool.extend(collaborative);
        }

        if pool.len() < HYBRID_MIN {
            pool.extend(self.call_news(self.news.query_popular(POPULAR_BACKFILL)).await?);
        }

        Ok(self.by_relevance(pool, &profile.preferred_categories, categories))
    }

    /// Dedupe (first wins), order by relevance (stable), keep the top `HYBRID_CAP`.
    fn by_relevance(
        &self,
        pool: Vec<ArticleSignal>,
        interests: &[String],
        categories: &[Category],
    ) -> Vec<(ArticleId, f64)> {
        let mut seen = HashSet::new();
        let mut scored: Vec<(ArticleId, f64)> = pool
            .into_iter()
            .filter(|a| seen.insert(a.id))
            .map(|a| (a.id, relevance(&a, interests, categories)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(HYBRID_CAP);
        scored
    }

    // ---------------- popular ----------------

    pub async fn popular_news(&self, page: PageRequest) -> RankedPage {
        let pool = match self
            .call_news(self.news.query_popular(self.cfg.popular_pool_size))
            .await
        {
            Ok(v) => v,
            Err(e) => {
                fallback("popular");
                warn!(target: "recommend", error = %e, "popular pool unavailable; serving trusted");
                return self.trusted_page(trusted_limit(page), page).await;
            }
        };
        let scored = self.scoring.rank_by_popularity(pool).await;
        let ranked = rank_in_order(scored.into_iter().map(|(a, s)| (a.id, s)));
        RankedPage::paginate(ranked, page)
    }

    // ---------------- shared steps ----------------

    /// Never fails: each signal that cannot be fetched counts as empty.
    async fn gather_profile(&self, user_id: UserId) -> UserProfile {
        let p = &self.profiles;
        let preferred = self
            .call_profile(p.preferred_categories(user_id))
            .await
            .or_fallback("profile.preferred_categories", Vec::new);
        let reads = self
            .call_profile(p.category_read_counts(user_id))
            .await
            .or_fallback("profile.category_read_counts", Default::default);
        let subscribed = self
            .call_profile(p.subscribed_keywords(user_id))
            .await
            .or_fallback("profile.subscribed_keywords", Vec::new);
        UserProfile::new(preferred, reads, subscribed)
    }

    /// Mapped categories in profile order. Unmappable names are logged and dropped;
    /// dropping every stated preference is an error.
    fn usable_categories(&self, profile: &UserProfile, user: &str) -> Result<Vec<Category>, RecommendError> {
        let (ok, dropped) = map_categories(&profile.preferred_categories);
        for e in &dropped {
            warn!(target: "recommend", user = %user, raw = %e.raw, suggestion = ?e.suggestion, "dropping unmappable category");
        }
        if ok.is_empty() && !dropped.is_empty() {
            return Err(RecommendError::NoUsableCategories {
                dropped: dropped.len(),
            });
        }
        Ok(ok)
    }

    /// Trusted articles (most recent first) as a page; empty page if even that fails.
    async fn trusted_page(&self, limit: usize, page: PageRequest) -> RankedPage {
        match self.call_news(self.news.query_trusted(limit)).await {
            Ok(articles) => RankedPage::paginate(self.rank_by_priority(articles).await, page),
            Err(e) => {
                fallback("trusted");
                warn!(target: "recommend", error = %e, "trusted fallback failed; empty page");
                RankedPage::empty(page)
            }
        }
    }

    /// Keep the given order; score each with `priority`.
    async fn rank_by_priority(&self, articles: Vec<ArticleSignal>) -> Vec<RankedResult> {
        let mut scored = Vec::with_capacity(articles.len());
        for a in &articles {
            scored.push((a.id, self.scoring.priority(a).await));
        }
        rank_in_order(scored)
    }

    async fn call_news<T, F>(&self, fut: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        with_timeout(self.news.name(), self.cfg.provider_timeout, fut).await
    }

    async fn call_profile<T, F>(&self, fut: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        with_timeout(self.profiles.name(), self.cfg.provider_timeout, fut).await
    }
}
