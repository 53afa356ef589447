// src/providers/memory.rs
//! Fixture-backed providers for tests and the offline binary mode.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use super::{NewsProvider, ProfileProvider};
use crate::category::Category;
use crate::error::ProviderError;
use crate::model::{ArticleSignal, ArticleText, UserId, UserProfile};

#[derive(Default)]
pub struct InMemoryNewsProvider {
    articles: RwLock<Vec<ArticleText>>,
}

impl InMemoryNewsProvider {
    pub fn new(articles: Vec<ArticleText>) -> Self {
        Self {
            articles: RwLock::new(articles),
        }
    }

    pub fn from_signals(signals: Vec<ArticleSignal>) -> Self {
        Self::new(
            signals
                .into_iter()
                .map(|signal| ArticleText {
                    signal,
                    content: None,
                })
                .collect(),
        )
    }

    /// Load a JSON array of articles (the shape the HTTP provider returns).
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let articles: Vec<ArticleText> = serde_json::from_str(raw)?;
        Ok(Self::new(articles))
    }

    pub fn insert(&self, article: ArticleText) {
        self.articles
            .write()
            .expect("news fixture lock poisoned")
            .push(article);
    }

    fn select<F>(&self, keep: F) -> Vec<ArticleText>
    where
        F: Fn(&ArticleSignal) -> bool,
    {
        let mut out: Vec<ArticleText> = self
            .articles
            .read()
            .expect("news fixture lock poisoned")
            .iter()
            .filter(|a| keep(&a.signal))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.signal
                .published_at
                .cmp(&a.signal.published_at)
                .then(a.signal.id.cmp(&b.signal.id))
        });
        out
    }
}

fn signals(v: Vec<ArticleText>, limit: usize) -> Vec<ArticleSignal> {
    v.into_iter().take(limit).map(|a| a.signal).collect()
}

#[async_trait]
impl NewsProvider for InMemoryNewsProvider {
    async fn query_by_category(
        &self,
        categories: &[Category],
        limit: usize,
    ) -> Result<Vec<ArticleSignal>, ProviderError> {
        Ok(signals(
            self.select(|a| categories.contains(&a.category)),
            limit,
        ))
    }

    async fn query_trusted(&self, limit: usize) -> Result<Vec<ArticleSignal>, ProviderError> {
        Ok(signals(self.select(|a| a.trusted), limit))
    }

    async fn query_popular(&self, limit: usize) -> Result<Vec<ArticleSignal>, ProviderError> {
        let mut all = self.select(|_| true);
        // Stable: ties keep recency order.
        all.sort_by(|a, b| b.signal.view_count.cmp(&a.signal.view_count));
        Ok(signals(all, limit))
    }

    async fn query_recent(&self, since: DateTime<Utc>) -> Result<Vec<ArticleText>, ProviderError> {
        Ok(self.select(|a| a.published_at >= since))
    }

    fn name(&self) -> &'static str {
        "memory-news"
    }
}

#[derive(Default)]
pub struct InMemoryProfileProvider {
    profiles: RwLock<HashMap<UserId, UserProfile>>,
}

impl InMemoryProfileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, user_id: UserId, profile: UserProfile) -> Self {
        self.profiles
            .write()
            .expect("profile fixture lock poisoned")
            .insert(user_id, profile);
        self
    }

    fn profile(&self, user_id: UserId) -> UserProfile {
        self.profiles
            .read()
            .expect("profile fixture lock poisoned")
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProfileProvider for InMemoryProfileProvider {
    async fn preferred_categories(&self, user_id: UserId) -> Result<Vec<String>, ProviderError> {
        Ok(self.profile(user_id).preferred_categories)
    }

    async fn category_read_counts(
        &self,
        user_id: UserId,
    ) -> Result<HashMap<String, u64>, ProviderError> {
        Ok(self.profile(user_id).category_read_counts)
    }

    async fn subscribed_keywords(&self, user_id: UserId) -> Result<Vec<String>, ProviderError> {
        Ok(self.profile(user_id).subscribed_keywords)
    }

    fn name(&self) -> &'static str {
        "memory-profile"
    }
}
