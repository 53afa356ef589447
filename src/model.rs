//! model.rs: request-scoped value types flowing through the ranking pipeline.
//!
//! Everything here is an immutable snapshot; nothing is shared across requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::category::Category;

pub type ArticleId = u64;
pub type UserId = u64;

/// Article metadata as read from the news provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSignal {
    pub id: ArticleId,
    pub category: Category,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub view_count: u64,
    /// Approximated upstream by the number of save/collect actions.
    #[serde(default)]
    pub share_count: u64,
    #[serde(default)]
    pub trusted: bool,
    pub published_at: DateTime<Utc>,
}

/// Article snapshot with body text, used for trending extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleText {
    #[serde(flatten)]
    pub signal: ArticleSignal,
    #[serde(default)]
    pub content: Option<String>,
}

/// Coarse personalization tier; informational (logged), never used for branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    NewUser,
    LowPersonalization,
    ModeratelyPersonalized,
    HighlyPersonalized,
}

/// Per-request profile signals from the profile provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub preferred_categories: Vec<String>,
    #[serde(default)]
    pub subscribed_keywords: Vec<String>,
    #[serde(default)]
    pub category_read_counts: HashMap<String, u64>,
    #[serde(default)]
    pub total_read_count: u64,
}

impl UserProfile {
    pub fn new(
        preferred_categories: Vec<String>,
        category_read_counts: HashMap<String, u64>,
        subscribed_keywords: Vec<String>,
    ) -> Self {
        let total_read_count = category_read_counts.values().sum();
        Self {
            preferred_categories,
            subscribed_keywords,
            category_read_counts,
            total_read_count,
        }
    }

    /// No preference and no reading history: the cold-start condition.
    pub fn is_cold_start(&self) -> bool {
        self.preferred_categories.is_empty() && self.category_read_counts.is_empty()
    }

    /// 0.30 for stated interests, up to 0.25 for subscriptions, up to 0.45 for reading volume.
    pub fn personalization_score(&self) -> f64 {
        let mut score = 0.0;
        if !self.preferred_categories.is_empty() {
            score += 0.3;
        }
        if !self.subscribed_keywords.is_empty() {
            score += (self.subscribed_keywords.len() as f64 * 0.05).min(0.25);
        }
        if self.total_read_count > 0 {
            let reading = ((self.total_read_count + 1) as f64).log10() / 101f64.log10();
            score += reading.min(0.45);
        }
        score.min(1.0)
    }

    pub fn user_type(&self) -> UserType {
        if self.is_cold_start() {
            return UserType::NewUser;
        }
        let s = self.personalization_score();
        if s > 0.7 {
            UserType::HighlyPersonalized
        } else if s > 0.3 {
            UserType::ModeratelyPersonalized
        } else {
            UserType::LowPersonalization
        }
    }
}

/// Keyword frequency over a recent window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingKeyword {
    pub term: String,
    pub count: u64,
    pub window_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub article_id: ArticleId,
    /// In `[0, 1]`.
    pub score: f64,
    /// 1-based position in the full ranked list (not the page).
    pub rank: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page_index: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    10
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: default_page_size(),
        }
    }
}

impl PageRequest {
    pub fn new(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }
}

/// The only externally visible output of the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPage {
    pub items: Vec<RankedResult>,
    pub total_count: usize,
    pub page_index: usize,
    pub page_size: usize,
}

impl RankedPage {
    pub fn empty(page: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            page_index: page.page_index,
            page_size: page.page_size,
        }
    }

    /// Offset/limit slice over an already ranked, in-memory list.
    pub fn paginate(ranked: Vec<RankedResult>, page: PageRequest) -> Self {
        let total_count = ranked.len();
        let items = ranked
            .into_iter()
            .skip(page.offset())
            .take(page.page_size)
            .collect();
        Self {
            items,
            total_count,
            page_index: page.page_index,
            page_size: page.page_size,
        }
    }

    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            0
        } else {
            self.total_count.div_ceil(self.page_size)
        }
    }
}

/// Assign 1-based ranks to `(id, score)` pairs in their current order.
pub fn rank_in_order<I>(scored: I) -> Vec<RankedResult>
where
    I: IntoIterator<Item = (ArticleId, f64)>,
{
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (article_id, score))| RankedResult {
            article_id,
            score: score.clamp(0.0, 1.0),
            rank: i + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(n: u64) -> Vec<RankedResult> {
        rank_in_order((1..=n).map(|id| (id, 0.5)))
    }

    #[test]
    fn paginate_slices_by_offset() {
        let p = RankedPage::paginate(ranked(25), PageRequest::new(2, 10));
        assert_eq!(p.total_count, 25);
        assert_eq!(p.items.len(), 5);
        assert_eq!(p.items[0].rank, 21);
        assert_eq!(p.total_pages(), 3);
    }

    #[test]
    fn paginate_past_the_end_is_empty() {
        let p = RankedPage::paginate(ranked(3), PageRequest::new(5, 10));
        assert!(p.items.is_empty());
        assert_eq!(p.total_count, 3);
    }

    #[test]
    fn cold_start_needs_both_signals_empty() {
        let mut p = UserProfile::default();
        assert!(p.is_cold_start());
        assert_eq!(p.user_type(), UserType::NewUser);
        p.category_read_counts.insert("ECONOMY".into(), 3);
        assert!(!p.is_cold_start());
    }

    #[test]
    fn personalization_score_is_bounded() {
        let mut reads = HashMap::new();
        reads.insert("ECONOMY".to_string(), 10_000);
        let p = UserProfile::new(
            vec!["ECONOMY".into()],
            reads,
            (0..20).map(|i| format!("kw{i}")).collect(),
        );
        let s = p.personalization_score();
        assert!((s - 1.0).abs() < 1e-9);
        assert_eq!(p.user_type(), UserType::HighlyPersonalized);
    }
}
