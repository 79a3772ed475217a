//! Unified error handling for the tiercrawl crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`TiercrawlErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! Every variant also maps to the HTTP status the crawl API answers with,
//! see [`Error::status_code`].

use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::scheduler::error::{AdmissionError, DispatchError, QueueError};
pub use crate::utils::error::{CacheError, FetchError, ProbeError};

/// Common trait for tiercrawl error types
pub trait TiercrawlErrorTrait: std::error::Error {
    /// Check if this error is recoverable (a later attempt may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad request data
    Input,
    /// Target site errors (probe, fetch)
    Network,
    /// Admission rejections
    Quota,
    /// TTL store errors
    Cache,
    /// Worker and queue errors
    Scheduler,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Network => "network",
            Self::Quota => "quota",
            Self::Cache => "cache",
            Self::Scheduler => "scheduler",
        }
    }
}

/// Unified error type for the tiercrawl crate
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed request input
    #[error("{0}")]
    InvalidInput(String),

    /// The target URL did not answer the existence probe
    #[error("Web page not found: {url}")]
    Unreachable { url: String },

    /// Hourly page budget used up
    #[error("Hourly crawl limit exceeded")]
    QuotaExceeded,

    /// Not enough free worker slots
    #[error("Max crawl workers limit reached")]
    WorkerLimitReached,

    /// Fetch/extract failure
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Worker pool failure
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Job dropped before a worker produced a result
    #[error("Crawl request abandoned before completion")]
    Abandoned,
}

impl TiercrawlErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            // Budget and slots free up over time
            Self::QuotaExceeded | Self::WorkerLimitReached => true,
            Self::Unreachable { .. } => true,
            Self::InvalidInput(_) | Self::Dispatch(_) | Self::Abandoned => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput(_) => ErrorCategory::Input,
            Self::Unreachable { .. } | Self::Fetch(_) => ErrorCategory::Network,
            Self::QuotaExceeded | Self::WorkerLimitReached => ErrorCategory::Quota,
            Self::Dispatch(_) | Self::Abandoned => ErrorCategory::Scheduler,
        }
    }
}

impl TiercrawlErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidUrl(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidUrl(_) => ErrorCategory::Input,
            _ => ErrorCategory::Network,
        }
    }
}

impl TiercrawlErrorTrait for CacheError {
    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Serialization(_))
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Cache
    }
}

impl Error {
    /// Create an input validation error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// HTTP status code the crawl API responds with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Unreachable { .. } => 404,
            Self::QuotaExceeded | Self::WorkerLimitReached => 429,
            Self::Fetch(_) | Self::Dispatch(_) | Self::Abandoned => 500,
        }
    }

    /// Plain-text body returned to HTTP clients
    pub fn public_message(&self) -> String {
        match self {
            Self::Unreachable { .. } => "Web page not found".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<AdmissionError> for Error {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::QuotaExceeded { .. } => Self::QuotaExceeded,
            AdmissionError::WorkerLimitReached { .. } => Self::WorkerLimitReached,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
