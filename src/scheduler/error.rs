//! Error types for the scheduler module

use std::fmt;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Tiered queue errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Dequeue was called on an empty queue
    Empty,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Queue is empty"),
        }
    }
}

impl std::error::Error for QueueError {}

/// Reasons the quota guard refuses a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// Hourly page budget is spent
    QuotaExceeded {
        pages: u64,
        max_pages: u64,
    },

    /// Not enough free worker slots for the request's cost
    WorkerLimitReached {
        requested: u32,
        current: u32,
        max_workers: u32,
    },
}

impl AdmissionError {
    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::WorkerLimitReached { .. } => "worker_limit",
        }
    }
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaExceeded { pages, max_pages } => {
                write!(f, "Hourly crawl limit exceeded ({}/{})", pages, max_pages)
            }
            Self::WorkerLimitReached {
                requested,
                current,
                max_workers,
            } => {
                write!(
                    f,
                    "Max crawl workers limit reached ({} requested, {}/{} busy)",
                    requested, current, max_workers
                )
            }
        }
    }
}

impl std::error::Error for AdmissionError {}

/// Worker pool failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// One or more workers panicked; all workers were still joined
    WorkerPanicked {
        pool: String,
        panicked: usize,
        pool_size: usize,
    },

    /// A worker was cancelled by the runtime
    WorkerCancelled {
        pool: String,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkerPanicked {
                pool,
                panicked,
                pool_size,
            } => {
                write!(
                    f,
                    "{} of {} workers in pool '{}' panicked",
                    panicked, pool_size, pool
                )
            }
            Self::WorkerCancelled { pool } => {
                write!(f, "Worker in pool '{}' was cancelled", pool)
            }
        }
    }
}

impl std::error::Error for DispatchError {}
