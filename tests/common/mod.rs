//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tiercrawl::cache::{CrawlCache, MemoryStore, TtlStore};
use tiercrawl::config::{CacheConfig, FetchConfig, TierConfig};
use tiercrawl::crawler::{PageFetcher, ReachabilityCheck};
use tiercrawl::models::{FetchReport, ScrapedData};
use tiercrawl::scheduler::QuotaGuard;
use tiercrawl::service::CrawlService;
use tiercrawl::utils::error::{CacheError, FetchError, ProbeError};

/// Fetcher returning canned links and counting calls
pub struct CountingFetcher {
    calls: AtomicUsize,
    links: Vec<String>,
    delay: Duration,
    fail: bool,
}

impl CountingFetcher {
    pub fn new(links: &[&str]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            links: links.iter().map(|s| s.to_string()).collect(),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for CountingFetcher {
    async fn fetch(
        &self,
        url: &str,
        _max_depth: usize,
        visited: &(dyn for<'s> Fn(&'s str) -> bool + Send + Sync),
    ) -> Result<FetchReport, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            });
        }

        let links = self
            .links
            .iter()
            .filter(|link| visited(link))
            .cloned()
            .collect();

        Ok(FetchReport {
            data: ScrapedData::with_links(links),
            page_errors: Vec::new(),
            pages_fetched: 1,
        })
    }
}

/// Prober with a fixed answer
pub struct StaticProber(pub bool);

#[async_trait]
impl ReachabilityCheck for StaticProber {
    async fn probe(&self, _url: &str) -> Result<bool, ProbeError> {
        Ok(self.0)
    }
}

/// Prober whose last attempt always fails at the transport level
pub struct BrokenTransportProber;

#[async_trait]
impl ReachabilityCheck for BrokenTransportProber {
    async fn probe(&self, _url: &str) -> Result<bool, ProbeError> {
        // A relative URL fails inside reqwest before any I/O
        let err = reqwest::Client::new()
            .head("not-an-absolute-url")
            .build()
            .unwrap_err();
        Err(ProbeError::Transport(err))
    }
}

/// Store whose every operation fails
pub struct FailingStore;

#[async_trait]
impl TtlStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Connection("store offline".to_string()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Command("store offline".to_string()))
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}

/// Cache over an in-memory store
pub fn memory_cache(fetcher: Arc<dyn PageFetcher>) -> CrawlCache {
    cache_with_store(Arc::new(MemoryStore::new()), fetcher)
}

pub fn cache_with_store(store: Arc<dyn TtlStore>, fetcher: Arc<dyn PageFetcher>) -> CrawlCache {
    CrawlCache::new(
        store,
        fetcher,
        &CacheConfig::default(),
        &FetchConfig::default(),
    )
}

/// Service with default tiers, an in-memory cache and the given limits
pub fn service(
    fetcher: Arc<dyn PageFetcher>,
    reachable: bool,
    max_workers: u32,
    max_pages: u64,
) -> CrawlService {
    service_with_prober(
        Arc::new(StaticProber(reachable)),
        fetcher,
        max_workers,
        max_pages,
    )
}

pub fn service_with_prober(
    prober: Arc<dyn ReachabilityCheck>,
    fetcher: Arc<dyn PageFetcher>,
    max_workers: u32,
    max_pages: u64,
) -> CrawlService {
    CrawlService::new(
        prober,
        Arc::new(memory_cache(fetcher)),
        Arc::new(QuotaGuard::with_window(
            max_workers,
            max_pages,
            Duration::from_secs(3600),
        )),
        TierConfig::default(),
    )
}
