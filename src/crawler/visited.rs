//! Visited-link tracking
//!
//! A set of URLs with an atomic insert-if-absent, handed to the page fetcher
//! as a `Send + Sync` predicate. Concurrent page fetches may call it at the
//! same time; the first caller for a URL wins.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Thread-safe visited set
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: Mutex<HashSet<String>>,
    /// Clear the set once it holds this many entries
    max_entries: Option<usize>,
}

impl VisitedSet {
    /// Unbounded set, used for a single traversal
    pub fn new() -> Self {
        Self::default()
    }

    /// Set that clears itself when it reaches `max_entries`.
    ///
    /// After a clear, previously seen URLs are reported as new again.
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
            max_entries: Some(max_entries.max(1)),
        }
    }

    /// Mark `url` as visited, returning `true` if it was not seen before
    pub fn check_and_mark(&self, url: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);

        if seen.contains(url) {
            return false;
        }

        if let Some(max) = self.max_entries {
            if seen.len() >= max {
                tracing::debug!(entries = seen.len(), "Visited set at capacity, clearing");
                seen.clear();
            }
        }

        seen.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(url)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
