//! Cache-aside layer for crawl results
//!
//! [`CrawlCache::resolve`] answers from a TTL store when it can and falls back
//! to a live traversal otherwise, writing the result back with a one hour
//! TTL. The store itself sits behind [`TtlStore`]:
//! - [`RedisStore`]: shared Redis on a deadpool connection pool
//! - [`MemoryStore`]: in-process map with lazy expiry
//!
//! # Example
//!
//! ```rust,ignore
//! use tiercrawl::cache::{build_store, CrawlCache};
//!
//! let store = build_store(&config.cache).await?;
//! let cache = CrawlCache::new(store, fetcher, &config.cache, &config.fetch);
//! let data = cache.resolve("https://example.com").await?;
//! ```

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheBackend, CacheConfig, FetchConfig, VisitedScope};
use crate::crawler::{PageFetcher, VisitedSet};
use crate::error::Result;
use crate::metrics;
use crate::models::ScrapedData;
use crate::utils::error::CacheError;
use crate::utils::retry::RetryConfig;

/// Byte-valued key/value store with per-entry expiry
#[async_trait]
pub trait TtlStore: Send + Sync {
    async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, CacheError>;

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> std::result::Result<(), CacheError>;

    /// Liveness check for health reporting
    async fn ping(&self) -> std::result::Result<(), CacheError> {
        Ok(())
    }

    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;
}

/// Build the configured store.
///
/// With `fallback_to_memory`, an unreachable Redis degrades to the in-process
/// store instead of failing startup.
pub async fn build_store(config: &CacheConfig) -> anyhow::Result<Arc<dyn TtlStore>> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        CacheBackend::Redis => {
            let retry = RetryConfig::with_delays(3, 500, 5_000);
            match RedisStore::connect_with_retry(config, &retry).await {
                Ok(store) => Ok(Arc::new(store)),
                Err(e) if config.fallback_to_memory => {
                    tracing::warn!(error = %e, "Redis unavailable, using in-memory cache");
                    Ok(Arc::new(MemoryStore::new()))
                }
                Err(e) => Err(e),
            }
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses
    pub misses: u64,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache-aside front for the page fetcher
pub struct CrawlCache {
    store: Arc<dyn TtlStore>,
    fetcher: Arc<dyn PageFetcher>,
    ttl: Duration,
    key_prefix: String,
    max_depth: usize,
    /// Present only for process-scoped visited tracking
    shared_visited: Option<Arc<VisitedSet>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CrawlCache {
    pub fn new(
        store: Arc<dyn TtlStore>,
        fetcher: Arc<dyn PageFetcher>,
        cache: &CacheConfig,
        fetch: &FetchConfig,
    ) -> Self {
        let shared_visited = match fetch.visited_scope {
            VisitedScope::Traversal => None,
            VisitedScope::Process => {
                Some(Arc::new(VisitedSet::bounded(fetch.visited_max_entries)))
            }
        };

        Self {
            store,
            fetcher,
            ttl: cache.ttl(),
            key_prefix: cache.key_prefix.clone(),
            max_depth: fetch.max_depth,
            shared_visited,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Hash a URL for use in a cache key
    pub fn hash_url(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Namespaced store key for a URL
    pub fn key_for(&self, url: &str) -> String {
        format!("{}:page:{}", self.key_prefix, Self::hash_url(url))
    }

    /// Return cached data for `url`, or fetch, store and return it.
    ///
    /// Store read and decode failures count as misses and store write
    /// failures are only logged. A failed fetch is returned as an error and
    /// nothing is cached for it.
    pub async fn resolve(&self, url: &str) -> Result<ScrapedData> {
        let key = self.key_for(url);

        if let Some(data) = self.lookup(&key, url).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_lookup(true);
            tracing::debug!(url, "Crawl cache hit");
            return Ok(data);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_lookup(false);
        tracing::debug!(url, "Crawl cache miss");

        let report = match &self.shared_visited {
            Some(visited) => {
                self.fetcher
                    .fetch(url, self.max_depth, &|link: &str| visited.check_and_mark(link))
                    .await?
            }
            None => {
                let visited = VisitedSet::new();
                self.fetcher
                    .fetch(url, self.max_depth, &|link: &str| visited.check_and_mark(link))
                    .await?
            }
        };

        if !report.page_errors.is_empty() {
            tracing::warn!(
                url,
                failed_pages = report.page_errors.len(),
                "Traversal finished with page errors"
            );
        }

        let data = report.data;
        match serde_json::to_vec(&data) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(&key, bytes, self.ttl).await {
                    tracing::warn!(url, error = %e, "Failed to cache crawl result");
                }
            }
            Err(e) => tracing::warn!(url, error = %e, "Failed to encode crawl result"),
        }

        Ok(data)
    }

    async fn lookup(&self, key: &str, url: &str) -> Option<ScrapedData> {
        let bytes = match self.store.get(key).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                tracing::warn!(url, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!(url, error = %e, "Undecodable cache entry, treating as miss");
                None
            }
        }
    }

    /// Hit/miss counters since startup
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Backend name of the underlying store
    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Whether the underlying store is reachable
    pub async fn is_healthy(&self) -> bool {
        self.store.ping().await.is_ok()
    }
}
