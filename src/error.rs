//! Error taxonomy for the ranking core.
//!
//! None of these ever reach a caller of the public engine operations; they exist so
//! that every degraded path is an explicit, testable branch instead of a swallowed panic.

use thiserror::Error;
use tracing::warn;

/// Counter store (cache) failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed counter value under `{key}`: {value}")]
    Malformed { key: String, value: String },
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Profile/news provider failures. Both variants resolve to a fallback.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} call failed: {reason}")]
    Transient {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} call timed out after {timeout_ms}ms")]
    Timeout {
        provider: &'static str,
        timeout_ms: u64,
    },
}

impl ProviderError {
    pub fn transient(provider: &'static str, reason: impl ToString) -> Self {
        ProviderError::Transient {
            provider,
            reason: reason.to_string(),
        }
    }
}

/// A category string that has no entry in the closed mapping table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unmappable category `{raw}`")]
pub struct CategoryError {
    pub raw: String,
    /// Closest known code, for the warning log only.
    pub suggestion: Option<&'static str>,
}

/// Failures inside one recommendation attempt; every variant triggers the cold-start fallback.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("no usable categories left after mapping {dropped} entries")]
    NoUsableCategories { dropped: usize },
}

/// Explicit "never fail outward" combinator: log the error, then take the fallback value.
pub trait OrFallback<T> {
    fn or_fallback<F>(self, context: &str, fallback: F) -> T
    where
        F: FnOnce() -> T;
}

impl<T, E: std::fmt::Display> OrFallback<T> for Result<T, E> {
    fn or_fallback<F>(self, context: &str, fallback: F) -> T
    where
        F: FnOnce() -> T,
    {
        match self {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, context, "falling back");
                fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_fallback_passes_ok_through() {
        let r: Result<u32, StoreError> = Ok(7);
        assert_eq!(r.or_fallback("test", || 0), 7);
    }

    #[test]
    fn or_fallback_uses_fallback_on_error() {
        let r: Result<u32, StoreError> = Err(StoreError::Unavailable("down".into()));
        assert_eq!(r.or_fallback("test", || 42), 42);
    }

    #[test]
    fn provider_error_messages_name_the_provider() {
        let e = ProviderError::Timeout {
            provider: "profile",
            timeout_ms: 3000,
        };
        assert_eq!(e.to_string(), "profile call timed out after 3000ms");
    }
}
