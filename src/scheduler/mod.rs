//! Crawl request scheduling
//!
//! This module holds the concurrency core that sits between the HTTP
//! handlers and the crawl cache.
//!
//! # Architecture
//!
//! ```text
//!   crawl call ──enqueue──▶ ┌──────────────────────┐
//!                           │     TieredQueue      │  paid lane ▶ free lane
//!                           └──────────┬───────────┘
//!                                      │ try_dequeue
//!                           ┌──────────▼───────────┐
//!                           │  WorkerPool (5 | 2)  │  joined before reply
//!                           └──────────┬───────────┘
//!                                      │ admit(cost)
//!                           ┌──────────▼───────────┐
//!                           │      QuotaGuard      │  workers + hourly pages
//!                           └──────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`queue`] - Two-lane priority queue with atomic check-and-pop
//! - [`dispatcher`] - Fixed-size worker groups with join semantics
//! - [`quota`] - Admission control with scoped permits
//! - [`error`] - Scheduler error types

pub mod dispatcher;
pub mod error;
pub mod queue;
pub mod quota;

pub use dispatcher::{PoolReport, WorkerPool};
pub use error::{AdmissionError, DispatchError, QueueError};
pub use queue::{Prioritized, QueueDepth, TieredQueue};
pub use quota::{AdmissionPermit, QuotaGuard, QuotaSnapshot};
