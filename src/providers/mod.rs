// src/providers/mod.rs
//! Boundary traits for the two upstream services the ranking core reads from.
//!
//! Both are consulted per request and may fail or hang; callers wrap every call
//! in [`with_timeout`] and treat any error as a reason to fall back.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use crate::category::Category;
use crate::error::ProviderError;
use crate::model::{ArticleSignal, ArticleText, UserId};

pub use http::{HttpNewsProvider, HttpProfileProvider};
pub use memory::{InMemoryNewsProvider, InMemoryProfileProvider};

#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Most recent first.
    async fn query_by_category(
        &self,
        categories: &[Category],
        limit: usize,
    ) -> Result<Vec<ArticleSignal>, ProviderError>;

    /// Trusted articles, most recent first.
    async fn query_trusted(&self, limit: usize) -> Result<Vec<ArticleSignal>, ProviderError>;

    /// Upstream's own popularity order (views, then recency).
    async fn query_popular(&self, limit: usize) -> Result<Vec<ArticleSignal>, ProviderError>;

    /// Articles published at or after `since`, with body text.
    async fn query_recent(&self, since: DateTime<Utc>) -> Result<Vec<ArticleText>, ProviderError>;

    /// Category-scoped variant of [`NewsProvider::query_recent`]. The default filters
    /// the unscoped result; adapters with a server-side filter should override it.
    async fn query_recent_in_category(
        &self,
        category: Category,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ArticleText>, ProviderError> {
        let mut out = self.query_recent(since).await?;
        out.retain(|a| a.signal.category == category);
        out.truncate(limit);
        Ok(out)
    }

    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn preferred_categories(&self, user_id: UserId) -> Result<Vec<String>, ProviderError>;

    async fn category_read_counts(
        &self,
        user_id: UserId,
    ) -> Result<HashMap<String, u64>, ProviderError>;

    /// Optional signal; used only for the personalization tier.
    async fn subscribed_keywords(&self, _user_id: UserId) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str;
}

/// Bound a provider call. A timeout becomes `ProviderError::Timeout`.
pub async fn with_timeout<T, F>(
    provider: &'static str,
    limit: Duration,
    fut: F,
) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(ProviderError::Timeout {
            provider,
            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, ProviderError>(1)
        };
        let err = with_timeout("news", Duration::from_millis(50), slow)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Timeout {
                provider: "news",
                timeout_ms: 50
            }
        ));
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let v = with_timeout("news", Duration::from_secs(1), async { Ok::<_, ProviderError>(3) })
            .await
            .unwrap();
        assert_eq!(v, 3);
    }
}
