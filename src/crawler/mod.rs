//! Web crawling collaborators
//!
//! - [`probe`] - HEAD-based existence check with fixed-interval retries
//! - [`fetcher`] - Rate-limited breadth-first HTML traversal
//! - [`visited`] - Shared visited-link set used as the fetcher's predicate

pub mod fetcher;
pub mod probe;
pub mod visited;

use async_trait::async_trait;

use crate::models::FetchReport;
use crate::utils::error::FetchError;

pub use fetcher::HtmlFetcher;
pub use probe::{ExistenceProber, ReachabilityCheck};
pub use visited::VisitedSet;

/// Fetch/extract capability behind the crawl cache
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Traverse from `url` down to `max_depth` (the seed is depth 1).
    ///
    /// `visited` is called once per discovered link and returns `true` the
    /// first time a link is seen; only those links end up in the result.
    /// It may be called from concurrently running page fetches.
    async fn fetch(
        &self,
        url: &str,
        max_depth: usize,
        visited: &(dyn for<'s> Fn(&'s str) -> bool + Send + Sync),
    ) -> Result<FetchReport, FetchError>;
}
