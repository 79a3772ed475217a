//! Tiered request queue
//!
//! Two FIFO lanes (paid, free) behind a single mutex. Every dequeue serves
//! the paid lane first, so a paid request overtakes any free request that is
//! still waiting, while order within each tier is preserved.
//!
//! ```text
//! enqueue: Free(A) Free(B) Paid(C) Paid(D)
//!
//!   paid: [C, D]  ──┐
//!                   ├──▶ dequeue order: C, D, A, B
//!   free: [A, B]  ──┘
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::{CrawlRequest, Tier};

use super::error::{QueueError, QueueResult};

/// Anything that can be placed on a [`TieredQueue`]
pub trait Prioritized {
    fn tier(&self) -> Tier;
}

impl Prioritized for CrawlRequest {
    fn tier(&self) -> Tier {
        self.tier
    }
}

#[derive(Debug)]
struct Lanes<T> {
    paid: VecDeque<T>,
    free: VecDeque<T>,
}

impl<T> Lanes<T> {
    fn lane_mut(&mut self, tier: Tier) -> &mut VecDeque<T> {
        match tier {
            Tier::Paid => &mut self.paid,
            Tier::Free => &mut self.free,
        }
    }

    fn pop(&mut self) -> Option<T> {
        self.paid.pop_front().or_else(|| self.free.pop_front())
    }

    fn len(&self) -> usize {
        self.paid.len() + self.free.len()
    }
}

/// Queue depth per tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct QueueDepth {
    pub paid: usize,
    pub free: usize,
}

/// Two-level priority queue shared by all workers
#[derive(Debug)]
pub struct TieredQueue<T> {
    lanes: Mutex<Lanes<T>>,
}

impl<T: Prioritized> TieredQueue<T> {
    pub fn new() -> Self {
        Self {
            lanes: Mutex::new(Lanes {
                paid: VecDeque::new(),
                free: VecDeque::new(),
            }),
        }
    }

    // A panicking worker never leaves the lanes half-updated, so the data
    // behind a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, Lanes<T>> {
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an item at the tail of its tier's lane
    pub fn enqueue(&self, item: T) {
        let tier = item.tier();
        self.lock().lane_mut(tier).push_back(item);
    }

    /// Remove the highest-priority item, failing when the queue is empty
    pub fn dequeue(&self) -> QueueResult<T> {
        self.try_dequeue().ok_or(QueueError::Empty)
    }

    /// Check-and-pop under one lock acquisition.
    ///
    /// Workers use this instead of `has_work` followed by `dequeue`, which
    /// would race when two workers both observe the last item.
    pub fn try_dequeue(&self) -> Option<T> {
        self.lock().pop()
    }

    /// Whether any item is waiting
    pub fn has_work(&self) -> bool {
        self.lock().len() > 0
    }

    /// Total number of waiting items
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_work()
    }

    /// Waiting items per tier, read under one lock
    pub fn depth(&self) -> QueueDepth {
        let lanes = self.lock();
        QueueDepth {
            paid: lanes.paid.len(),
            free: lanes.free.len(),
        }
    }

    /// Remove and return everything still waiting, paid first
    pub fn drain(&self) -> Vec<T> {
        let mut lanes = self.lock();
        let mut drained = Vec::with_capacity(lanes.len());
        drained.extend(lanes.paid.drain(..));
        drained.extend(lanes.free.drain(..));
        drained
    }
}

impl<T: Prioritized> Default for TieredQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
