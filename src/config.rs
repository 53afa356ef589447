// src/config.rs
//! Engine configuration: TOML file with env-var overrides.
//!
//! Lookup order for the file:
//! 1) `$ENGINE_CONFIG_PATH` (must exist)
//! 2) `config/engine.toml`
//! 3) built-in defaults
//!
//! Env overrides are applied after the file.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::counter::flush::FlushConfig;
use crate::recommend::RecommendConfig;
use crate::trending::TrendingConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/engine.toml";

pub const ENV_CONFIG_PATH: &str = "ENGINE_CONFIG_PATH";
pub const ENV_REDIS_URL: &str = "ENGINE_REDIS_URL";
pub const ENV_PROVIDER_TIMEOUT_MS: &str = "ENGINE_PROVIDER_TIMEOUT_MS";
pub const ENV_FLUSH_WORKERS: &str = "ENGINE_FLUSH_WORKERS";
pub const ENV_BIND_ADDR: &str = "ENGINE_BIND_ADDR";
pub const ENV_NEWS_API_URL: &str = "ENGINE_NEWS_API_URL";
pub const ENV_PROFILE_API_URL: &str = "ENGINE_PROFILE_API_URL";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bind_addr: String,

    /// Unset → process-local counters.
    pub redis_url: Option<String>,
    pub redis_connect_timeout_ms: u64,

    /// Unset → articles from `fixtures_path` (or none).
    pub news_api_url: Option<String>,
    pub profile_api_url: Option<String>,
    pub fixtures_path: Option<PathBuf>,

    pub provider_timeout_ms: u64,
    pub daily_ttl_secs: u64,
    pub flush_workers: usize,
    pub flush_queue_capacity: usize,
    pub popular_pool_size: usize,
    pub trending_category_window_hours: u32,
    pub trending_category_pool_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            redis_url: None,
            redis_connect_timeout_ms: 2000,
            news_api_url: None,
            profile_api_url: None,
            fixtures_path: None,
            provider_timeout_ms: 3000,
            daily_ttl_secs: crate::counter::DEFAULT_DAILY_TTL_SECS,
            flush_workers: 3,
            flush_queue_capacity: 1024,
            popular_pool_size: 100,
            trending_category_window_hours: 720,
            trending_category_pool_size: 500,
        }
    }
}

impl EngineConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing engine config {}", path.display()))
    }

    /// File (env path, default path, or defaults), then env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
            if pb.exists() {
                Self::load_from(&pb)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_nonempty(ENV_REDIS_URL) {
            self.redis_url = Some(v);
        }
        if let Some(v) = env_nonempty(ENV_BIND_ADDR) {
            self.bind_addr = v;
        }
        if let Some(v) = env_nonempty(ENV_NEWS_API_URL) {
            self.news_api_url = Some(v);
        }
        if let Some(v) = env_nonempty(ENV_PROFILE_API_URL) {
            self.profile_api_url = Some(v);
        }
        if let Some(v) = env_nonempty(ENV_PROVIDER_TIMEOUT_MS) {
            self.provider_timeout_ms = v
                .parse()
                .with_context(|| format!("{ENV_PROVIDER_TIMEOUT_MS}={v} is not a number"))?;
        }
        if let Some(v) = env_nonempty(ENV_FLUSH_WORKERS) {
            self.flush_workers = v
                .parse()
                .with_context(|| format!("{ENV_FLUSH_WORKERS}={v} is not a number"))?;
        }
        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms.max(1))
    }

    pub fn redis_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_connect_timeout_ms.max(1))
    }

    pub fn flush(&self) -> FlushConfig {
        FlushConfig {
            workers: self.flush_workers.max(1),
            queue_capacity: self.flush_queue_capacity.max(1),
        }
    }

    pub fn recommend(&self) -> RecommendConfig {
        RecommendConfig {
            provider_timeout: self.provider_timeout(),
            popular_pool_size: self.popular_pool_size.max(1),
        }
    }

    pub fn trending(&self) -> TrendingConfig {
        TrendingConfig {
            category_window_hours: self.trending_category_window_hours.max(1),
            category_pool_size: self.trending_category_pool_size.max(1),
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const ALL_ENV: [&str; 7] = [
        ENV_CONFIG_PATH,
        ENV_REDIS_URL,
        ENV_PROVIDER_TIMEOUT_MS,
        ENV_FLUSH_WORKERS,
        ENV_BIND_ADDR,
        ENV_NEWS_API_URL,
        ENV_PROFILE_API_URL,
    ];

    fn clear_env() {
        for k in ALL_ENV {
            env::remove_var(k);
        }
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: EngineConfig = toml::from_str(
            r#"
            provider_timeout_ms = 500
            redis_url = "redis://127.0.0.1:6379"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.provider_timeout(), Duration::from_millis(500));
        assert_eq!(cfg.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert_eq!(cfg.flush_workers, 3);
        assert_eq!(cfg.trending().category_window_hours, 720);
    }

    #[serial_test::serial]
    #[test]
    fn env_path_then_env_overrides() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("engine.toml");
        fs::write(&p, "bind_addr = \"127.0.0.1:9000\"\nflush_workers = 5\n").unwrap();

        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_FLUSH_WORKERS, "2");
        let cfg = EngineConfig::load().unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.flush_workers, 2);

        env::set_var(ENV_PROVIDER_TIMEOUT_MS, "soon");
        assert!(EngineConfig::load().is_err());
        clear_env();
    }

    #[serial_test::serial]
    #[test]
    fn missing_file_means_defaults_but_bad_file_is_an_error() {
        clear_env();
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        assert_eq!(EngineConfig::load().unwrap(), EngineConfig::default());

        fs::create_dir_all("config").unwrap();
        fs::write(DEFAULT_CONFIG_PATH, "flush_workers = \"many\"").unwrap();
        assert!(EngineConfig::load().is_err());

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml").display().to_string());
        assert!(EngineConfig::load().is_err());

        env::set_current_dir(&old).unwrap();
        clear_env();
    }
}
