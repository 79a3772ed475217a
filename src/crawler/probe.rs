//! URL existence probing
//!
//! Sends HEAD requests with a fixed retry interval and reports whether any
//! attempt came back with a status in `[200, 400)`.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::ProbeConfig;
use crate::metrics;
use crate::utils::error::ProbeError;
use crate::utils::retry::RetryConfig;

/// Reachability check performed before any work is enqueued
#[async_trait]
pub trait ReachabilityCheck: Send + Sync {
    /// `Ok(true)` if the URL answered with a success or redirect status.
    ///
    /// `Err` only when the final attempt failed at the transport level.
    async fn probe(&self, url: &str) -> Result<bool, ProbeError>;
}

/// HEAD-request prober
#[derive(Debug, Clone)]
pub struct ExistenceProber {
    client: Client,
    retry: RetryConfig,
}

/// Outcome of a single HEAD request
#[derive(Debug)]
pub enum ProbeAttempt {
    /// Server answered with this status
    Status(u16),
    /// Request never produced a response
    Transport(reqwest::Error),
}

impl ProbeAttempt {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Status(code) if (200..400).contains(code))
    }
}

impl ExistenceProber {
    /// Create a prober making up to `max_retries` attempts, sleeping
    /// `retry_interval` after each failed one
    pub fn new(
        max_retries: u32,
        retry_interval: Duration,
        timeout: Duration,
    ) -> Result<Self, ProbeError> {
        // Redirects are not followed; a 3xx already counts as existing.
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;

        Ok(Self {
            client,
            retry: RetryConfig::fixed(max_retries.max(1), retry_interval),
        })
    }

    pub fn from_config(config: &ProbeConfig) -> Result<Self, ProbeError> {
        Self::new(config.max_retries, config.retry_interval(), config.timeout())
    }

    /// Send one HEAD request
    pub async fn check_once(&self, url: &str) -> ProbeAttempt {
        match self.client.head(url).send().await {
            Ok(response) => ProbeAttempt::Status(response.status().as_u16()),
            Err(e) => ProbeAttempt::Transport(e),
        }
    }
}

#[async_trait]
impl ReachabilityCheck for ExistenceProber {
    async fn probe(&self, url: &str) -> Result<bool, ProbeError> {
        let attempts = self.retry.max_attempts;
        let mut last = None;

        for attempt in 1..=attempts {
            let outcome = self.check_once(url).await;
            let success = outcome.is_success();
            metrics::record_probe_attempt(success);

            if success {
                tracing::debug!(url, attempt, "Probe succeeded");
                return Ok(true);
            }

            match &outcome {
                ProbeAttempt::Status(status) => {
                    tracing::debug!(url, attempt, status, "Probe returned non-success status");
                }
                ProbeAttempt::Transport(e) => {
                    tracing::debug!(url, attempt, error = %e, "Probe request failed");
                }
            }
            last = Some(outcome);

            // The interval is also waited after the final attempt
            tokio::time::sleep(self.retry.delay_after(attempt)).await;
        }

        tracing::warn!(url, attempts, "URL unreachable after all probe attempts");

        match last {
            Some(ProbeAttempt::Transport(e)) => Err(ProbeError::Transport(e)),
            _ => Ok(false),
        }
    }
}
