//! # Redis counter store
//!
//! Shared, cross-process counters. INCR is atomic on the server, so concurrent view
//! events on the same article never lose updates.
//!
//! The connection manager reconnects on its own; a single failed command surfaces as
//! `StoreError::Unavailable` and the caller degrades.

use std::time::Duration;

use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};

use super::store::CounterStore;
use crate::error::StoreError;

#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
}

impl RedisCounterStore {
    pub async fn connect(redis_url: &str, connect_timeout: Duration) -> Result<Self, StoreError> {
        let config = ConnectionManagerConfig::new().set_number_of_retries(1);

        let client = Client::open(redis_url)?;
        let conn = tokio::time::timeout(
            connect_timeout,
            client.get_connection_manager_with_config(config),
        )
        .await
        .map_err(|_| StoreError::Unavailable(format!("connect timed out: {redis_url}")))??;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let v: i64 = conn.incr(key, 1).await?;
        Ok(v.max(0) as u64)
    }

    async fn get(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        raw.map(|s| {
            s.trim().parse::<u64>().map_err(|_| StoreError::Malformed {
                key: key.to_string(),
                value: s,
            })
        })
        .transpose()
    }

    async fn set_expiry(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        let _: bool = conn.expire(key, secs).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
