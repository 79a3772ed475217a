// Core data structures for tiercrawl

use serde::{Deserialize, Serialize};
use std::fmt;

/// Customer tier of an inbound crawl request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Paid,
    Free,
}

impl Tier {
    /// Parse the tier indicator sent by clients.
    ///
    /// Only the exact `Paid` literal selects the paid tier; anything else,
    /// including a missing value, is treated as free.
    pub fn from_indicator(indicator: Option<&str>) -> Self {
        match indicator {
            Some("Paid") => Self::Paid,
            _ => Self::Free,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Free => "free",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A crawl request as scheduled on the tiered queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub url: String,
    pub tier: Tier,
    /// Number of worker slots this request occupies while admitted
    /// (its priority weight)
    pub worker_cost: u32,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>, tier: Tier, worker_cost: u32) -> Self {
        Self {
            url: url.into(),
            tier,
            worker_cost,
        }
    }
}

/// Links (and optionally text) extracted from a crawl traversal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedData {
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
}

impl ScrapedData {
    pub fn with_links(links: Vec<String>) -> Self {
        Self { links, text: None }
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.text.as_ref().map_or(true, Vec::is_empty)
    }
}

/// A page that failed during a traversal without failing the whole fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageError {
    pub url: String,
    pub error: String,
}

/// Result of one fetch/extract traversal
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub data: ScrapedData,
    pub page_errors: Vec<PageError>,
    /// Number of pages actually downloaded
    pub pages_fetched: usize,
}
