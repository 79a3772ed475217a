//! Rate/quota guard
//!
//! Process-wide admission control. Each request reserves `worker_cost`
//! worker slots and one page from the current window. The window is a fixed
//! bucket that resets lazily on the first admission after it has elapsed;
//! there is no background timer.
//!
//! Admission returns an [`AdmissionPermit`]. Dropping the permit gives the
//! worker slots back, so release happens exactly once on every exit path.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::QuotaConfig;
use crate::metrics;

use super::error::AdmissionError;

/// Mutable quota counters, only touched under the guard's lock
#[derive(Debug)]
struct QuotaState {
    max_workers: u32,
    current_workers: u32,
    max_pages_per_window: u64,
    current_pages_this_window: u64,
    window_start: Instant,
    window_started_at: DateTime<Utc>,
}

impl QuotaState {
    fn roll_window(&mut self, now: Instant, window: Duration) -> bool {
        if now.saturating_duration_since(self.window_start) > window {
            self.current_pages_this_window = 0;
            self.window_start = now;
            self.window_started_at = Utc::now();
            true
        } else {
            false
        }
    }
}

/// Consistent view of the quota state
#[derive(Debug, Clone, Serialize)]
pub struct QuotaSnapshot {
    pub max_workers: u32,
    pub current_workers: u32,
    pub max_pages_per_window: u64,
    pub current_pages_this_window: u64,
    pub window_started_at: DateTime<Utc>,
    pub window_remaining_secs: u64,
}

/// Shared admission controller
#[derive(Debug)]
pub struct QuotaGuard {
    state: Mutex<QuotaState>,
    window: Duration,
}

impl QuotaGuard {
    pub fn new(config: &QuotaConfig) -> Self {
        Self::with_window(
            config.max_workers,
            config.max_pages_per_window,
            Duration::from_secs(config.window_secs),
        )
    }

    pub fn with_window(max_workers: u32, max_pages_per_window: u64, window: Duration) -> Self {
        Self {
            state: Mutex::new(QuotaState {
                max_workers,
                current_workers: 0,
                max_pages_per_window,
                current_pages_this_window: 0,
                window_start: Instant::now(),
                window_started_at: Utc::now(),
            }),
            window,
        }
    }

    // Every mutation completes before the guard is released, so a poisoned
    // lock still protects consistent counters.
    fn lock(&self) -> MutexGuard<'_, QuotaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Try to admit a request costing `cost` worker slots
    pub fn admit(self: &Arc<Self>, cost: u32) -> Result<AdmissionPermit, AdmissionError> {
        self.admit_at(cost, Instant::now())
    }

    /// Admission decision against an explicit clock reading
    pub fn admit_at(
        self: &Arc<Self>,
        cost: u32,
        now: Instant,
    ) -> Result<AdmissionPermit, AdmissionError> {
        let (decision, workers, pages) = {
            let mut state = self.lock();

            if state.roll_window(now, self.window) {
                tracing::info!("Crawl window elapsed, page budget reset");
            }

            let decision = if state.current_pages_this_window >= state.max_pages_per_window {
                Err(AdmissionError::QuotaExceeded {
                    pages: state.current_pages_this_window,
                    max_pages: state.max_pages_per_window,
                })
            } else if state.current_workers.saturating_add(cost) > state.max_workers {
                Err(AdmissionError::WorkerLimitReached {
                    requested: cost,
                    current: state.current_workers,
                    max_workers: state.max_workers,
                })
            } else {
                state.current_workers += cost;
                state.current_pages_this_window += 1;
                Ok(())
            };

            // Gauges are set under the lock so they follow admission order
            metrics::update_quota_state(state.current_workers, state.current_pages_this_window);

            (
                decision,
                state.current_workers,
                state.current_pages_this_window,
            )
        };

        match decision {
            Ok(()) => {
                tracing::debug!(cost, workers, pages, "Request admitted");
                Ok(AdmissionPermit {
                    guard: Arc::clone(self),
                    cost,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Request rejected");
                metrics::record_admission_rejected(e.reason());
                Err(e)
            }
        }
    }

    fn release(&self, cost: u32) {
        let workers = {
            let mut state = self.lock();
            state.current_workers = state.current_workers.saturating_sub(cost);
            metrics::update_quota_state(state.current_workers, state.current_pages_this_window);
            state.current_workers
        };
        tracing::debug!(cost, workers, "Worker slots released");
    }

    /// Change the worker ceiling at runtime.
    ///
    /// Work already admitted keeps its slots; lowering the ceiling below the
    /// current occupancy only blocks new admissions until it drains.
    pub fn set_max_workers(&self, max_workers: u32) {
        self.lock().max_workers = max_workers;
        tracing::info!(max_workers, "Updated max workers");
    }

    /// Change the per-window page budget at runtime
    pub fn set_max_pages_per_window(&self, max_pages: u64) {
        self.lock().max_pages_per_window = max_pages;
        tracing::info!(max_pages, "Updated max pages per window");
    }

    pub fn max_workers(&self) -> u32 {
        self.lock().max_workers
    }

    pub fn max_pages_per_window(&self) -> u64 {
        self.lock().max_pages_per_window
    }

    pub fn current_workers(&self) -> u32 {
        self.lock().current_workers
    }

    pub fn current_pages(&self) -> u64 {
        self.lock().current_pages_this_window
    }

    /// All counters from a single lock acquisition
    pub fn snapshot(&self) -> QuotaSnapshot {
        let state = self.lock();
        let elapsed = state.window_start.elapsed();
        QuotaSnapshot {
            max_workers: state.max_workers,
            current_workers: state.current_workers,
            max_pages_per_window: state.max_pages_per_window,
            current_pages_this_window: state.current_pages_this_window,
            window_started_at: state.window_started_at,
            window_remaining_secs: self.window.saturating_sub(elapsed).as_secs(),
        }
    }
}

/// Reserved worker slots, returned to the guard on drop
#[derive(Debug)]
#[must_use = "dropping the permit releases the worker slots immediately"]
pub struct AdmissionPermit {
    guard: Arc<QuotaGuard>,
    cost: u32,
}

impl AdmissionPermit {
    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.guard.release(self.cost);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn guard(max_workers: u32, max_pages: u64) -> Arc<QuotaGuard> {
        Arc::new(QuotaGuard::with_window(max_workers, max_pages, HOUR))
    }

    #[test]
    fn test_admit_reserves_and_releases() {
        let quota = guard(10, 100);

        let permit = quota.admit(5).unwrap();
        assert_eq!(permit.cost(), 5);
        assert_eq!(quota.current_workers(), 5);
        assert_eq!(quota.current_pages(), 1);

        drop(permit);
        assert_eq!(quota.current_workers(), 0);
        assert_eq!(quota.current_pages(), 1);
    }

    #[test]
    fn test_worker_limit() {
        let quota = guard(10, 100);

        let _a = quota.admit(5).unwrap();
        let _b = quota.admit(5).unwrap();
        let err = quota.admit(2).unwrap_err();

        assert!(matches!(err, AdmissionError::WorkerLimitReached { .. }));
        assert_eq!(quota.current_workers(), 10);
        // A rejected request does not consume a page
        assert_eq!(quota.current_pages(), 2);
    }

    #[test]
    fn test_quota_exceeded() {
        let quota = guard(10, 2);

        drop(quota.admit(1).unwrap());
        drop(quota.admit(1).unwrap());
        let err = quota.admit(1).unwrap_err();

        assert_eq!(
            err,
            AdmissionError::QuotaExceeded {
                pages: 2,
                max_pages: 2
            }
        );
    }

    #[test]
    fn test_quota_checked_before_workers() {
        let quota = guard(1, 1);
        let _held = quota.admit(1).unwrap();

        // Both limits are hit; the page budget is reported
        let err = quota.admit(1).unwrap_err();
        assert!(matches!(err, AdmissionError::QuotaExceeded { .. }));
    }

    #[test]
    fn test_window_does_not_reset_within_hour() {
        let quota = guard(10, 100);
        let start = Instant::now();

        for i in 0..5u64 {
            let at = start + Duration::from_secs(600 * i);
            drop(quota.admit_at(1, at).unwrap());
        }

        assert_eq!(quota.current_pages(), 5);
    }

    #[test]
    fn test_window_resets_once_after_boundary() {
        let quota = guard(10, 3);
        let start = Instant::now();

        for _ in 0..3 {
            drop(quota.admit_at(1, start).unwrap());
        }
        assert!(quota.admit_at(1, start).is_err());

        let later = start + HOUR + Duration::from_secs(1);
        drop(quota.admit_at(1, later).unwrap());
        assert_eq!(quota.current_pages(), 1);

        // Further admissions in the new window accumulate, no second reset
        drop(quota.admit_at(1, later + Duration::from_secs(10)).unwrap());
        assert_eq!(quota.current_pages(), 2);
    }

    #[test]
    fn test_permit_released_on_panic() {
        let quota = guard(10, 100);
        let shared = Arc::clone(&quota);

        let result = std::thread::spawn(move || {
            let _permit = shared.admit(4).unwrap();
            panic!("worker blew up");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(quota.current_workers(), 0);
    }

    #[test]
    fn test_lowering_max_workers_blocks_new_admissions() {
        let quota = guard(10, 100);
        let held = quota.admit(6).unwrap();

        quota.set_max_workers(4);
        assert!(quota.admit(1).is_err());

        drop(held);
        assert!(quota.admit(4).is_ok());
    }

    #[test]
    fn test_snapshot_is_consistent() {
        let quota = guard(10, 50);
        let _permit = quota.admit(3).unwrap();
        quota.set_max_pages_per_window(75);

        let snap = quota.snapshot();
        assert_eq!(snap.max_workers, 10);
        assert_eq!(snap.current_workers, 3);
        assert_eq!(snap.max_pages_per_window, 75);
        assert_eq!(snap.current_pages_this_window, 1);
        assert!(snap.window_remaining_secs <= 3600);
    }
}
