//! tiercrawl - Tiered crawl-request orchestrator
//!
//! Accepts crawl requests from paid and free customers, checks that the
//! target exists, admits the request against a worker/hourly-page quota and
//! answers from a TTL cache or a live link-following crawl.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Existence probe, HTML fetcher and visited-link tracking
//! - [`parser`] - Link and text extraction from HTML
//! - [`scheduler`] - Tiered queue, worker pools and the quota guard
//! - [`cache`] - Cache-aside layer over Redis or in-memory TTL stores
//! - [`service`] - Request path tying the above together
//! - [`server`] - axum HTTP API
//! - [`metrics`] - Prometheus metrics
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use tiercrawl::config::Config;
//! use tiercrawl::models::Tier;
//! use tiercrawl::service::CrawlService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let service = CrawlService::from_config(&config).await?;
//!     let data = service.crawl("https://example.com", Tier::Paid).await?;
//!     println!("{} links", data.links.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod crawler;
pub mod error;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod scheduler;
pub mod server;
pub mod service;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::{CrawlCache, TtlStore};
    pub use crate::config::Config;
    pub use crate::crawler::{PageFetcher, ReachabilityCheck};
    pub use crate::error::{Error, ErrorCategory, Result, TiercrawlErrorTrait};
    pub use crate::models::{CrawlRequest, ScrapedData, Tier};
    pub use crate::service::CrawlService;
}

// Direct re-exports for convenience
pub use models::{CrawlRequest, ScrapedData, Tier};
