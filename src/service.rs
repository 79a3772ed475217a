//! Crawl request orchestration
//!
//! [`CrawlService`] owns every shared collaborator (prober, queue, quota
//! guard, cache) and runs the request path:
//!
//! ```text
//! validate ─▶ probe ─▶ enqueue job ─▶ run tier pool ─▶ await own reply
//!                                         │
//!                                         └─ per job: admit ─▶ resolve ─▶ reply
//! ```
//!
//! The queue is shared, so a job may be processed by a worker that another
//! caller spawned. Each job carries its own reply channel, which is how the
//! result finds its way back.

use anyhow::Context;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::cache::{build_store, CacheStats, CrawlCache};
use crate::config::{Config, TierConfig};
use crate::crawler::{ExistenceProber, HtmlFetcher, ReachabilityCheck};
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{CrawlRequest, ScrapedData, Tier};
use crate::scheduler::{Prioritized, QueueDepth, QuotaGuard, TieredQueue, WorkerPool};

/// A queued crawl request together with the channel its caller waits on
pub struct CrawlJob {
    pub request: CrawlRequest,
    reply: oneshot::Sender<Result<ScrapedData>>,
    span: tracing::Span,
}

impl Prioritized for CrawlJob {
    fn tier(&self) -> Tier {
        self.request.tier
    }
}

/// Shared state and request path for crawl calls
pub struct CrawlService {
    prober: Arc<dyn ReachabilityCheck>,
    cache: Arc<CrawlCache>,
    quota: Arc<QuotaGuard>,
    queue: Arc<TieredQueue<CrawlJob>>,
    tiers: TierConfig,
}

impl CrawlService {
    pub fn new(
        prober: Arc<dyn ReachabilityCheck>,
        cache: Arc<CrawlCache>,
        quota: Arc<QuotaGuard>,
        tiers: TierConfig,
    ) -> Self {
        Self {
            prober,
            cache,
            quota,
            queue: Arc::new(TieredQueue::new()),
            tiers,
        }
    }

    /// Build the service and all of its collaborators from configuration
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let prober =
            ExistenceProber::from_config(&config.probe).context("Failed to build prober")?;
        let fetcher = HtmlFetcher::new(&config.fetch).context("Failed to build page fetcher")?;
        let store = build_store(&config.cache).await?;

        tracing::info!(backend = store.backend(), "Crawl cache ready");

        let cache = CrawlCache::new(store, Arc::new(fetcher), &config.cache, &config.fetch);

        Ok(Self::new(
            Arc::new(prober),
            Arc::new(cache),
            Arc::new(QuotaGuard::new(&config.quota)),
            config.tiers.clone(),
        ))
    }

    /// Crawl `url` on behalf of a caller of the given tier
    pub async fn crawl(&self, url: &str, tier: Tier) -> Result<ScrapedData> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("crawl", %request_id, url, %tier);

        let result = self.crawl_inner(url, tier).instrument(span).await;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.status_code(),
        };
        metrics::record_crawl_request(tier.as_str(), status);

        result
    }

    async fn crawl_inner(&self, url: &str, tier: Tier) -> Result<ScrapedData> {
        let _timer = metrics::start_crawl_timer(tier.as_str());

        let url = validate_url(url)?;

        let reachable = self.prober.probe(&url).await;
        match reachable {
            Ok(true) => {}
            Ok(false) => return Err(Error::Unreachable { url }),
            Err(e) => {
                tracing::warn!(error = %e, "Probe failed at transport level");
                return Err(Error::Unreachable { url });
            }
        }

        let (reply, receiver) = oneshot::channel();
        self.queue.enqueue(CrawlJob {
            request: CrawlRequest::new(url, tier, self.tiers.worker_cost(tier)),
            reply,
            span: tracing::Span::current(),
        });

        let pool = WorkerPool::new(tier.as_str(), self.tiers.pool_size(tier));
        let quota = Arc::clone(&self.quota);
        let cache = Arc::clone(&self.cache);

        let run = pool
            .run(&self.queue, move |job: CrawlJob| {
                process_job(job, Arc::clone(&quota), Arc::clone(&cache))
            })
            .await;

        if let Err(e) = &run {
            tracing::error!(error = %e, "Worker pool reported failures");
        }

        match receiver.await {
            Ok(result) => result,
            Err(_) => match run {
                Err(e) => Err(Error::Dispatch(e)),
                Ok(_) => Err(Error::Abandoned),
            },
        }
    }

    /// Drop every queued job. Their callers receive [`Error::Abandoned`].
    pub fn shutdown(&self) -> usize {
        let abandoned = self.queue.drain();
        let count = abandoned.len();
        if count > 0 {
            tracing::warn!(count, "Abandoning queued crawl requests");
        }
        count
    }

    pub fn quota(&self) -> &Arc<QuotaGuard> {
        &self.quota
    }

    pub fn cache(&self) -> &Arc<CrawlCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn queue_depth(&self) -> QueueDepth {
        self.queue.depth()
    }
}

/// Admit, resolve while holding the permit, then reply to the owning caller
async fn process_job(job: CrawlJob, quota: Arc<QuotaGuard>, cache: Arc<CrawlCache>) {
    let CrawlJob {
        request,
        reply,
        span,
    } = job;

    async move {
        let outcome = match quota.admit(request.worker_cost) {
            Ok(_permit) => cache.resolve(&request.url).await,
            Err(e) => Err(Error::from(e)),
        };

        if reply.send(outcome).is_err() {
            tracing::debug!("Caller dropped before the result was ready");
        }
    }
    .instrument(span)
    .await
}

/// Reject empty, unparsable and non-http(s) URLs
pub fn validate_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::invalid_input("URL is required"));
    }

    let parsed = Url::parse(url).map_err(|e| Error::invalid_input(format!("Invalid URL: {e}")))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::invalid_input(format!(
            "Unsupported URL scheme: {}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none() {
        return Err(Error::invalid_input("URL has no host"));
    }

    Ok(url.to_string())
}
