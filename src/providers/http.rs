// src/providers/http.rs
//! JSON-over-HTTP adapters for the upstream news and profile services.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

use super::{NewsProvider, ProfileProvider};
use crate::category::Category;
use crate::error::ProviderError;
use crate::model::{ArticleSignal, ArticleText, UserId};

fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    let client = Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .user_agent(concat!("news-ranking-engine/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

async fn get_json<T: DeserializeOwned>(
    client: &Client,
    provider: &'static str,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, ProviderError> {
    let resp = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| ProviderError::transient(provider, e))?
        .error_for_status()
        .map_err(|e| ProviderError::transient(provider, e))?;
    resp.json::<T>()
        .await
        .map_err(|e| ProviderError::transient(provider, format!("decode: {e}")))
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub struct HttpNewsProvider {
    base_url: String,
    client: Client,
}

impl HttpNewsProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            client: build_client(timeout)?,
        })
    }

    fn url(&self, path: &str) -> String {
        join(&self.base_url, path)
    }
}

#[async_trait]
impl NewsProvider for HttpNewsProvider {
    async fn query_by_category(
        &self,
        categories: &[Category],
        limit: usize,
    ) -> Result<Vec<ArticleSignal>, ProviderError> {
        let codes = categories
            .iter()
            .map(|c| c.code())
            .collect::<Vec<_>>()
            .join(",");
        get_json(
            &self.client,
            self.name(),
            &self.url("articles"),
            &[("categories", codes), ("limit", limit.to_string())],
        )
        .await
    }

    async fn query_trusted(&self, limit: usize) -> Result<Vec<ArticleSignal>, ProviderError> {
        get_json(
            &self.client,
            self.name(),
            &self.url("articles/trusted"),
            &[("limit", limit.to_string())],
        )
        .await
    }

    async fn query_popular(&self, limit: usize) -> Result<Vec<ArticleSignal>, ProviderError> {
        get_json(
            &self.client,
            self.name(),
            &self.url("articles/popular"),
            &[("limit", limit.to_string())],
        )
        .await
    }

    async fn query_recent(&self, since: DateTime<Utc>) -> Result<Vec<ArticleText>, ProviderError> {
        get_json(
            &self.client,
            self.name(),
            &self.url("articles/recent"),
            &[("since", since.to_rfc3339_opts(SecondsFormat::Secs, true))],
        )
        .await
    }

    async fn query_recent_in_category(
        &self,
        category: Category,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ArticleText>, ProviderError> {
        get_json(
            &self.client,
            self.name(),
            &self.url("articles/recent"),
            &[
                ("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("category", category.code().to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    fn name(&self) -> &'static str {
        "news"
    }
}

pub struct HttpProfileProvider {
    base_url: String,
    client: Client,
}

impl HttpProfileProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            client: build_client(timeout)?,
        })
    }

    fn user_url(&self, user_id: UserId, leaf: &str) -> String {
        join(&self.base_url, &format!("users/{user_id}/{leaf}"))
    }
}

#[async_trait]
impl ProfileProvider for HttpProfileProvider {
    async fn preferred_categories(&self, user_id: UserId) -> Result<Vec<String>, ProviderError> {
        get_json(
            &self.client,
            self.name(),
            &self.user_url(user_id, "preferred-categories"),
            &[],
        )
        .await
    }

    async fn category_read_counts(
        &self,
        user_id: UserId,
    ) -> Result<HashMap<String, u64>, ProviderError> {
        get_json(
            &self.client,
            self.name(),
            &self.user_url(user_id, "category-reads"),
            &[],
        )
        .await
    }

    async fn subscribed_keywords(&self, user_id: UserId) -> Result<Vec<String>, ProviderError> {
        get_json(
            &self.client,
            self.name(),
            &self.user_url(user_id, "keywords"),
            &[],
        )
        .await
    }

    fn name(&self) -> &'static str {
        "profile"
    }
}
