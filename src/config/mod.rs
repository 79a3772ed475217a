//! Configuration management for tiercrawl
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::models::Tier;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Admission quota configuration
    pub quota: QuotaConfig,

    /// Existence probe configuration
    pub probe: ProbeConfig,

    /// Per-tier pool sizes and worker costs
    pub tiers: TierConfig,

    /// Page fetch/extract configuration
    pub fetch: FetchConfig,

    /// TTL cache configuration
    pub cache: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Enable CORS for API
    pub enable_cors: bool,

    /// Enable request logging
    pub enable_request_logging: bool,
}

/// Admission quota configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Maximum worker slots in use at once
    pub max_workers: u32,

    /// Maximum admitted crawls per window
    pub max_pages_per_window: u64,

    /// Window length in seconds
    pub window_secs: u64,
}

/// Existence probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Number of HEAD attempts
    pub max_retries: u32,

    /// Delay after each failed attempt in milliseconds
    pub retry_interval_ms: u64,

    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
}

/// Per-tier pool sizes and worker costs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub paid_pool_size: usize,
    pub free_pool_size: usize,
    pub paid_worker_cost: u32,
    pub free_worker_cost: u32,
}

/// Page fetch/extract configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum link-following depth (seed page is depth 1)
    pub max_depth: usize,

    /// Maximum pages downloaded per traversal
    pub max_pages: usize,

    /// Concurrent page fetches within one depth level
    pub concurrency: usize,

    /// Rate limit (requests per second) across all traversals
    pub requests_per_second: u32,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,

    /// Only follow links on the seed's host
    pub same_host_only: bool,

    /// Collect paragraph and heading text
    pub extract_text: bool,

    /// Visited-set scope
    pub visited_scope: VisitedScope,

    /// Capacity of a process-scoped visited set before it is cleared
    pub visited_max_entries: usize,
}

/// Lifetime of the visited-link set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitedScope {
    /// New set per traversal
    Traversal,
    /// One set shared for the process lifetime, cleared at capacity
    Process,
}

/// TTL store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

/// TTL cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Store backend
    pub backend: CacheBackend,

    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,

    /// Connection pool size
    pub pool_size: usize,

    /// Crawl result TTL in seconds (default: 1 hour)
    pub ttl_secs: u64,

    /// Key prefix for namespacing
    pub key_prefix: String,

    /// Fall back to the in-memory store when Redis is unreachable
    pub fallback_to_memory: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            max_pages_per_window: 100,
            window_secs: 3600,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_interval_ms: 5000,
            timeout_secs: 10,
        }
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            paid_pool_size: 5,
            free_pool_size: 2,
            paid_worker_cost: 5,
            free_worker_cost: 2,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 200,
            concurrency: 4,
            requests_per_second: 10,
            request_timeout_secs: 30,
            user_agent: format!("tiercrawl/{}", env!("CARGO_PKG_VERSION")),
            same_host_only: true,
            extract_text: false,
            visited_scope: VisitedScope::Traversal,
            visited_max_entries: 100_000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            ttl_secs: 3600,
            key_prefix: "tiercrawl".to_string(),
            fallback_to_memory: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid {key}: {v}")),
        Err(_) => Ok(None),
    }
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("TIERCRAWL_BIND_ADDRESS") {
            self.server.bind_address = addr
                .parse()
                .with_context(|| format!("Invalid TIERCRAWL_BIND_ADDRESS: {addr}"))?;
        } else if let Ok(port) = std::env::var("PORT") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("Invalid PORT: {port}"))?;
            self.server.bind_address.set_port(port);
        }
        if let Some(v) = env_bool("TIERCRAWL_ENABLE_CORS") {
            self.server.enable_cors = v;
        }

        if let Some(v) = env_parse("TIERCRAWL_MAX_WORKERS")? {
            self.quota.max_workers = v;
        }
        if let Some(v) = env_parse("TIERCRAWL_MAX_PAGES_PER_WINDOW")? {
            self.quota.max_pages_per_window = v;
        }
        if let Some(v) = env_parse("TIERCRAWL_WINDOW_SECS")? {
            self.quota.window_secs = v;
        }

        if let Some(v) = env_parse("TIERCRAWL_PROBE_RETRIES")? {
            self.probe.max_retries = v;
        }
        if let Some(v) = env_parse("TIERCRAWL_PROBE_INTERVAL_MS")? {
            self.probe.retry_interval_ms = v;
        }

        if let Some(v) = env_parse("TIERCRAWL_MAX_DEPTH")? {
            self.fetch.max_depth = v;
        }
        if let Some(v) = env_parse("TIERCRAWL_RATE_LIMIT")? {
            self.fetch.requests_per_second = v;
        }
        if let Ok(v) = std::env::var("TIERCRAWL_USER_AGENT") {
            self.fetch.user_agent = v;
        }
        if let Some(v) = env_bool("TIERCRAWL_EXTRACT_TEXT") {
            self.fetch.extract_text = v;
        }

        if let Ok(url) = std::env::var("REDIS_URL") {
            self.cache.url = url;
        }
        if let Ok(backend) = std::env::var("TIERCRAWL_CACHE_BACKEND") {
            self.cache.backend = match backend.to_ascii_lowercase().as_str() {
                "redis" => CacheBackend::Redis,
                "memory" => CacheBackend::Memory,
                other => anyhow::bail!("Unknown cache backend: {other}"),
            };
        }
        if let Some(v) = env_parse("TIERCRAWL_CACHE_TTL")? {
            self.cache.ttl_secs = v;
        }
        if let Ok(prefix) = std::env::var("CACHE_KEY_PREFIX") {
            self.cache.key_prefix = prefix;
        }

        if let Ok(level) = std::env::var("TIERCRAWL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TIERCRAWL_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.quota.max_workers == 0 {
            anyhow::bail!("max_workers must be greater than 0");
        }

        if self.quota.window_secs == 0 {
            anyhow::bail!("window_secs must be greater than 0");
        }

        if self.probe.max_retries == 0 {
            anyhow::bail!("probe max_retries must be at least 1");
        }

        if self.tiers.paid_pool_size == 0 || self.tiers.free_pool_size == 0 {
            anyhow::bail!("tier pool sizes must be greater than 0");
        }

        for tier in [Tier::Paid, Tier::Free] {
            if self.tiers.worker_cost(tier) > self.quota.max_workers {
                anyhow::bail!(
                    "{tier} worker cost {} exceeds max_workers {}",
                    self.tiers.worker_cost(tier),
                    self.quota.max_workers
                );
            }
        }

        if self.fetch.max_depth == 0 {
            anyhow::bail!("max_depth must be at least 1");
        }

        if self.fetch.concurrency == 0 || self.fetch.max_pages == 0 {
            anyhow::bail!("fetch concurrency and max_pages must be greater than 0");
        }

        if self.fetch.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be positive");
        }

        if self.cache.backend == CacheBackend::Redis && self.cache.pool_size == 0 {
            anyhow::bail!("cache pool_size must be greater than 0");
        }

        Ok(())
    }
}

impl TierConfig {
    /// Worker pool size for a tier
    #[must_use]
    pub fn pool_size(&self, tier: Tier) -> usize {
        match tier {
            Tier::Paid => self.paid_pool_size,
            Tier::Free => self.free_pool_size,
        }
    }

    /// Worker slots a request of this tier occupies
    #[must_use]
    pub fn worker_cost(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Paid => self.paid_worker_cost,
            Tier::Free => self.free_worker_cost,
        }
    }
}

impl ProbeConfig {
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl FetchConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
