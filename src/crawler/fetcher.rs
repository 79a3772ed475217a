//! HTML fetcher with rate limiting and breadth-first link following
//!
//! This module provides the concrete [`PageFetcher`] used by the crawl cache:
//! - Rate limiting with governor, shared by every traversal
//! - Breadth-first traversal with concurrent fetches inside a depth level
//! - Per-traversal page budget and same-host filtering
//! - Optional paragraph/heading text extraction

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{header::CONTENT_TYPE, Client};
use std::collections::HashSet;
use std::num::NonZeroU32;
use url::Url;

use crate::config::FetchConfig;
use crate::models::{FetchReport, PageError};
use crate::parser::{parse_page, ParsedPage};
use crate::utils::error::FetchError;

use super::PageFetcher;

/// Links a page contributed after the visited check, plus its text
#[derive(Debug, Default)]
struct PageOutcome {
    new_links: Vec<String>,
    text: Vec<String>,
}

/// reqwest + scraper implementation of [`PageFetcher`]
pub struct HtmlFetcher {
    /// HTTP client with configured timeout and user agent
    client: Client,

    /// Rate limiter applied before every page request
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Maximum pages downloaded per traversal
    max_pages: usize,

    /// Concurrent fetches within one depth level
    concurrency: usize,

    /// Only follow links on the seed's host
    same_host_only: bool,

    /// Collect paragraph and heading text
    extract_text: bool,
}

impl HtmlFetcher {
    /// Create a fetcher from the fetch configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout())
            .gzip(true)
            .build()?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            max_pages: config.max_pages.max(1),
            concurrency: config.concurrency.max(1),
            same_host_only: config.same_host_only,
            extract_text: config.extract_text,
        })
    }

    /// Download and parse a single page
    async fn fetch_page(&self, url: &str) -> Result<ParsedPage, FetchError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(true, |ct| ct.contains("html"));
        if !is_html {
            tracing::debug!(url, "Skipping non-HTML response");
            return Ok(ParsedPage::default());
        }

        // Resolve against the final URL after redirects
        let base = response.url().clone();
        let body = response.text().await.map_err(FetchError::from_reqwest)?;

        Ok(parse_page(&body, &base, self.extract_text))
    }

    /// Fetch a page and run its links through the visited predicate
    async fn visit_page(
        &self,
        url: &str,
        visited: &(dyn for<'s> Fn(&'s str) -> bool + Send + Sync),
    ) -> Result<PageOutcome, FetchError> {
        let page = self.fetch_page(url).await?;

        let new_links = page
            .links
            .into_iter()
            .filter(|link| visited(link))
            .collect();

        Ok(PageOutcome {
            new_links,
            text: page.text,
        })
    }

    fn should_follow(&self, link: &str, seed_host: Option<&str>) -> bool {
        if !self.same_host_only {
            return true;
        }
        let Ok(parsed) = Url::parse(link) else {
            return false;
        };
        match (parsed.host_str(), seed_host) {
            (Some(host), Some(seed)) => host.eq_ignore_ascii_case(seed),
            _ => false,
        }
    }
}

#[async_trait]
impl PageFetcher for HtmlFetcher {
    async fn fetch(
        &self,
        url: &str,
        max_depth: usize,
        visited: &(dyn for<'s> Fn(&'s str) -> bool + Send + Sync),
    ) -> Result<FetchReport, FetchError> {
        let seed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        let seed_host = seed.host_str().map(str::to_ascii_lowercase);

        let mut report = FetchReport::default();
        let mut texts = Vec::new();

        // Pages already scheduled in this traversal, so each is fetched once
        let mut scheduled: HashSet<String> = HashSet::new();
        scheduled.insert(url.to_string());

        let mut frontier = vec![url.to_string()];
        let mut depth = 1usize;

        while !frontier.is_empty() && depth <= max_depth.max(1) {
            tracing::debug!(url, depth, pages = frontier.len(), "Fetching depth level");

            let results: Vec<(String, Result<PageOutcome, FetchError>)> =
                stream::iter(frontier.drain(..).map(move |page_url| async move {
                    let outcome = self.visit_page(&page_url, visited).await;
                    (page_url, outcome)
                }))
                .buffered(self.concurrency)
                .collect()
                .await;

            report.pages_fetched += results.len();
            let mut next = Vec::new();

            for (page_url, outcome) in results {
                let page = match outcome {
                    Ok(page) => page,
                    Err(e) if depth == 1 => return Err(e),
                    Err(e) => {
                        tracing::warn!(url = %page_url, error = %e, "Page fetch failed");
                        report.page_errors.push(PageError {
                            url: page_url,
                            error: e.to_string(),
                        });
                        continue;
                    }
                };

                if depth < max_depth {
                    for link in &page.new_links {
                        if scheduled.len() >= self.max_pages {
                            break;
                        }
                        if self.should_follow(link, seed_host.as_deref())
                            && scheduled.insert(link.clone())
                        {
                            next.push(link.clone());
                        }
                    }
                }

                report.data.links.extend(page.new_links);
                texts.extend(page.text);
            }

            frontier = next;
            depth += 1;
        }

        if self.extract_text {
            report.data.text = Some(texts);
        }

        tracing::info!(
            url,
            links = report.data.links.len(),
            pages = report.pages_fetched,
            errors = report.page_errors.len(),
            "Traversal complete"
        );

        Ok(report)
    }
}
