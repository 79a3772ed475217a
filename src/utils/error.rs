//! Error types for the crawl collaborators
//!
//! This module defines the errors raised by the probe, the page fetcher
//! and the TTL stores.

use thiserror::Error;

/// Errors that can occur during page fetch and extraction
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the seed page
    #[error("Server returned status {status} for {url}")]
    Status { url: String, status: u16 },

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Classify a reqwest error, separating timeouts
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

/// Errors that can occur while probing a URL for existence
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Transport failure on the final attempt
    #[error("Probe request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Probe client could not be built
    #[error("Failed to build probe client: {0}")]
    Client(String),
}

/// Errors raised by a TTL store
#[derive(Error, Debug)]
pub enum CacheError {
    /// Failed to obtain a pooled connection
    #[error("Cache connection failed: {0}")]
    Connection(String),

    /// The backend rejected or failed a command
    #[error("Cache command failed: {0}")]
    Command(String),

    /// Stored value could not be encoded or decoded
    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Status {
            url: "https://example.com".to_string(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "Server returned status 503 for https://example.com"
        );
        assert_eq!(FetchError::Timeout.to_string(), "Request timeout");
    }

    #[test]
    fn test_cache_error_display() {
        let err = CacheError::Connection("refused".to_string());
        assert!(err.to_string().contains("refused"));
    }
}
