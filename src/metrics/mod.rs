//! Prometheus metrics for tiercrawl
//!
//! This module provides metrics tracking for:
//! - Admission: worker/page gauges and rejections by reason
//! - Crawls: requests by tier and outcome, crawl duration, probe attempts
//! - Cache: hits and misses
//! - Dispatch: worker panics per pool
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Quota and dispatch metrics
struct SchedulerMetrics {
    current_workers: Gauge,
    pages_this_window: Gauge,
    admission_rejected: CounterVec,
    worker_panics: CounterVec,
}

/// Crawl path metrics
struct CrawlMetrics {
    requests: CounterVec,
    crawl_duration: HistogramVec,
    probe_attempts: CounterVec,
    cache_lookups: CounterVec,
}

static SCHEDULER_METRICS: OnceLock<SchedulerMetrics> = OnceLock::new();

static CRAWL_METRICS: OnceLock<CrawlMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers anything.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = tiercrawl::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let scheduler = SchedulerMetrics {
        current_workers: register_gauge!(
            "tiercrawl_quota_current_workers",
            "Worker slots currently reserved"
        )?,
        pages_this_window: register_gauge!(
            "tiercrawl_quota_pages_this_window",
            "Crawls admitted in the current window"
        )?,
        admission_rejected: register_counter_vec!(
            "tiercrawl_admission_rejected_total",
            "Admissions rejected by reason",
            &["reason"]
        )?,
        worker_panics: register_counter_vec!(
            "tiercrawl_worker_panics_total",
            "Worker tasks that panicked, by pool",
            &["pool"]
        )?,
    };

    let crawl = CrawlMetrics {
        requests: register_counter_vec!(
            "tiercrawl_crawl_requests_total",
            "Crawl requests by tier and outcome",
            &["tier", "status"]
        )?,
        crawl_duration: register_histogram_vec!(
            "tiercrawl_crawl_duration_seconds",
            "End-to-end crawl duration in seconds",
            &["tier"],
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
        )?,
        probe_attempts: register_counter_vec!(
            "tiercrawl_probe_attempts_total",
            "HEAD probe attempts by result",
            &["result"]
        )?,
        cache_lookups: register_counter_vec!(
            "tiercrawl_cache_lookups_total",
            "Crawl cache lookups by result",
            &["result"]
        )?,
    };

    SCHEDULER_METRICS.set(scheduler).ok();
    CRAWL_METRICS.set(crawl).ok();

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    SCHEDULER_METRICS.get().is_some() && CRAWL_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Update quota gauges
pub fn update_quota_state(current_workers: u32, pages_this_window: u64) {
    if let Some(m) = SCHEDULER_METRICS.get() {
        m.current_workers.set(f64::from(current_workers));
        m.pages_this_window.set(pages_this_window as f64);
    }
}

/// Record a rejected admission
pub fn record_admission_rejected(reason: &str) {
    if let Some(m) = SCHEDULER_METRICS.get() {
        m.admission_rejected.with_label_values(&[reason]).inc();
    }
}

/// Record a worker panic
pub fn record_worker_panic(pool: &str) {
    if let Some(m) = SCHEDULER_METRICS.get() {
        m.worker_panics.with_label_values(&[pool]).inc();
    }
}

/// Record one HEAD probe attempt
pub fn record_probe_attempt(success: bool) {
    let Some(m) = CRAWL_METRICS.get() else {
        return;
    };

    let result = if success { "success" } else { "failure" };
    m.probe_attempts.with_label_values(&[result]).inc();
}

/// Record a cache lookup
pub fn record_cache_lookup(hit: bool) {
    let Some(m) = CRAWL_METRICS.get() else {
        return;
    };

    let result = if hit { "hit" } else { "miss" };
    m.cache_lookups.with_label_values(&[result]).inc();
}

/// Record a finished crawl request
pub fn record_crawl_request(tier: &str, status: u16) {
    let Some(m) = CRAWL_METRICS.get() else {
        return;
    };

    let status_str = status.to_string();
    m.requests.with_label_values(&[tier, &status_str]).inc();
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start a crawl timer for a tier
pub fn start_crawl_timer(tier: &str) -> MetricsTimer {
    match CRAWL_METRICS.get() {
        Some(m) => MetricsTimer::new(m.crawl_duration.with_label_values(&[tier]).start_timer()),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Tests
// ============================================================================
