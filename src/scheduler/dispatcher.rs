//! Worker pool dispatcher
//!
//! Spawns a fixed-size group of workers over a [`TieredQueue`] and joins
//! every one of them before returning. Each worker pops one item at a time,
//! runs the handler to completion, and exits as soon as it observes the
//! queue empty.
//!
//! Workers do not clear the queue on exit. The queue is shared between
//! callers, so a clear after observing emptiness could discard an item that
//! another caller enqueued in between.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::metrics;

use super::error::DispatchError;
use super::queue::{Prioritized, TieredQueue};

/// Outcome of one pool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Items processed by each worker, indexed by worker id
    pub processed_per_worker: Vec<usize>,
}

impl PoolReport {
    pub fn total_processed(&self) -> usize {
        self.processed_per_worker.iter().sum()
    }
}

/// A named, fixed-size worker group
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: String,
    pool_size: usize,
}

impl WorkerPool {
    /// Create a pool; a size of zero is raised to one so queued work is
    /// always picked up.
    pub fn new(name: impl Into<String>, pool_size: usize) -> Self {
        Self {
            name: name.into(),
            pool_size: pool_size.max(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.pool_size
    }

    /// Run `pool_size` workers until the queue is empty, then join them all
    pub async fn run<T, F, Fut>(
        &self,
        queue: &Arc<TieredQueue<T>>,
        handler: F,
    ) -> Result<PoolReport, DispatchError>
    where
        T: Prioritized + Send + 'static,
        F: Fn(T) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tracing::debug!(pool = %self.name, workers = self.pool_size, "Spawning worker pool");

        let handles: Vec<JoinHandle<usize>> = (0..self.pool_size)
            .map(|worker_id| {
                let queue = Arc::clone(queue);
                let handler = handler.clone();
                let pool = self.name.clone();

                tokio::spawn(async move {
                    let mut processed = 0usize;
                    while let Some(item) = queue.try_dequeue() {
                        handler(item).await;
                        processed += 1;
                    }
                    tracing::trace!(pool = %pool, worker_id, processed, "Worker drained queue");
                    processed
                })
            })
            .collect();

        // Join every worker before looking at failures
        let mut report = PoolReport {
            processed_per_worker: Vec::with_capacity(handles.len()),
        };
        let mut panicked = 0usize;
        let mut cancelled = false;

        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(processed) => report.processed_per_worker.push(processed),
                Err(e) if e.is_panic() => {
                    tracing::error!(pool = %self.name, worker_id, error = %e, "Worker panicked");
                    metrics::record_worker_panic(&self.name);
                    report.processed_per_worker.push(0);
                    panicked += 1;
                }
                Err(e) => {
                    tracing::error!(pool = %self.name, worker_id, error = %e, "Worker cancelled");
                    report.processed_per_worker.push(0);
                    cancelled = true;
                }
            }
        }

        if panicked > 0 {
            return Err(DispatchError::WorkerPanicked {
                pool: self.name.clone(),
                panicked,
                pool_size: self.pool_size,
            });
        }
        if cancelled {
            return Err(DispatchError::WorkerCancelled {
                pool: self.name.clone(),
            });
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CrawlRequest, Tier};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn filled_queue(n: usize) -> Arc<TieredQueue<CrawlRequest>> {
        let queue = Arc::new(TieredQueue::new());
        for i in 0..n {
            queue.enqueue(CrawlRequest::new(format!("u{i}"), Tier::Free, 1));
        }
        queue
    }

    #[tokio::test]
    async fn test_pool_processes_everything_once() {
        let queue = filled_queue(40);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let pool = WorkerPool::new("free", 4);
        let report = pool
            .run(&queue, move |req: CrawlRequest| {
                let sink = Arc::clone(&sink);
                async move {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    sink.lock().unwrap().push(req.url);
                }
            })
            .await
            .unwrap();

        assert_eq!(report.processed_per_worker.len(), 4);
        assert_eq!(report.total_processed(), 40);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 40);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_run_returns_after_all_workers_finish() {
        let queue = filled_queue(6);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&in_flight);

        WorkerPool::new("paid", 3)
            .run(&queue, move |_req: CrawlRequest| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    counter.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .await
            .unwrap();

        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_queue_joins_immediately() {
        let queue = filled_queue(0);
        let report = WorkerPool::new("free", 2)
            .run(&queue, |_req: CrawlRequest| async {})
            .await
            .unwrap();
        assert_eq!(report.total_processed(), 0);
    }

    #[tokio::test]
    async fn test_worker_panic_is_surfaced() {
        let queue = filled_queue(3);

        let result = WorkerPool::new("paid", 1)
            .run(&queue, |req: CrawlRequest| async move {
                if req.url == "u1" {
                    panic!("handler failure");
                }
            })
            .await;

        assert_eq!(
            result,
            Err(DispatchError::WorkerPanicked {
                pool: "paid".to_string(),
                panicked: 1,
                pool_size: 1,
            })
        );
    }

    #[test]
    fn test_zero_size_is_raised() {
        assert_eq!(WorkerPool::new("x", 0).size(), 1);
    }
}
