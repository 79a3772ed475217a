//! Retry utilities for resilient operations
//!
//! This module provides a common retry mechanism with either fixed or
//! exponential backoff. The existence probe uses the fixed policy; the
//! Redis connection at startup uses the exponential one.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff policy between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay after every failed attempt
    Fixed,
    /// Delay multiplied by `multiplier` after each failed attempt
    Exponential { multiplier: f64 },
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_attempts: u32,

    /// Base delay in milliseconds
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Backoff policy
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff: Backoff::Exponential { multiplier: 2.0 },
        }
    }
}

impl RetryConfig {
    /// Fixed interval between attempts
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        let ms = interval.as_millis() as u64;
        Self {
            max_attempts,
            base_delay_ms: ms,
            max_delay_ms: ms,
            backoff: Backoff::Fixed,
        }
    }

    /// Create a retry configuration with custom delays
    pub fn with_delays(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
            backoff: Backoff::Exponential { multiplier: 2.0 },
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay_ms = match self.backoff {
            Backoff::Fixed => self.base_delay_ms,
            Backoff::Exponential { multiplier } => {
                let exponential =
                    self.base_delay_ms as f64 * multiplier.powi(attempt.saturating_sub(1) as i32);
                (exponential as u64).min(self.max_delay_ms)
            }
        };

        Duration::from_millis(delay_ms)
    }
}

/// Execute an operation with retry logic
///
/// Sleeps between attempts only; the last failure is returned as-is.
///
/// # Example
///
/// ```no_run
/// use tiercrawl::utils::retry::{with_retry, RetryConfig};
/// use anyhow::Result;
///
/// async fn connect() -> Result<String> {
///     Ok("connected".to_string())
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let config = RetryConfig::default();
///     let _conn = with_retry(&config, || async { connect().await }).await?;
///     Ok(())
/// }
/// ```
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                warn!(
                    attempt = attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Operation failed"
                );
                last_error = Some(e);
            }
        }

        if attempt < attempts {
            let delay = config.delay_after(attempt);
            debug!(
                attempt = attempt,
                delay_ms = delay.as_millis(),
                "Retrying operation after delay"
            );
            tokio::time::sleep(delay).await;
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Operation failed with no error details")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let config = RetryConfig::with_delays(3, 1, 1);
        let result = with_retry(&config, || async { Ok::<_, anyhow::Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let config = RetryConfig::with_delays(3, 1, 5);
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result = with_retry(&config, move || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                let count = attempts.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    anyhow::bail!("Simulated failure");
                }
                Ok::<_, anyhow::Error>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let config = RetryConfig::with_delays(2, 1, 1);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<(), anyhow::Error> = with_retry(&config, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("Permanent failure")
            }
        })
        .await;

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Permanent failure"));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_exponential_delay() {
        let config = RetryConfig::default();

        assert_eq!(config.delay_after(1), Duration::from_millis(1000));
        assert_eq!(config.delay_after(2), Duration::from_millis(2000));
        assert_eq!(config.delay_after(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_max_delay_cap() {
        let config = RetryConfig::with_delays(10, 1000, 5000);
        assert_eq!(config.delay_after(10), Duration::from_millis(5000));
    }

    #[test]
    fn test_fixed_delay() {
        let config = RetryConfig::fixed(3, Duration::from_secs(5));
        assert_eq!(config.delay_after(1), Duration::from_secs(5));
        assert_eq!(config.delay_after(3), Duration::from_secs(5));
    }
}
