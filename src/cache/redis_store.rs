//! Redis-backed TTL store

use anyhow::{Context, Result};
use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Connection, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;

use crate::config::CacheConfig;
use crate::utils::error::CacheError;
use crate::utils::retry::{with_retry, RetryConfig};

use super::TtlStore;

/// Redis store on a deadpool connection pool
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Build the pool and verify the server answers `PING`
    pub async fn connect(config: &CacheConfig) -> Result<Self> {
        let pool = PoolConfig::from_url(&config.url)
            .builder()
            .map_err(|e| anyhow::anyhow!("Failed to create pool builder: {e}"))?
            .max_size(config.pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .context("Failed to create Redis connection pool")?;

        let store = Self { pool };
        store
            .ping()
            .await
            .with_context(|| format!("Failed to ping Redis at {}", config.url))?;

        tracing::info!(url = %config.url, "Connected to Redis");
        Ok(store)
    }

    /// Connect with exponential backoff between attempts
    pub async fn connect_with_retry(config: &CacheConfig, retry: &RetryConfig) -> Result<Self> {
        with_retry(retry, || Self::connect(config)).await
    }

    async fn conn(&self) -> Result<Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }
}

#[async_trait]
impl TtlStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn().await?;
        conn.get(key)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::Command(e.to_string()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let reply: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))?;

        if reply == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Command(format!("Unexpected PING reply: {reply}")))
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
