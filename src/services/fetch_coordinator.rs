//! In-flight fetch bookkeeping.
//!
//! Tracks how many pull request fetches are currently running per
//! repository. Overlapping fetches for the same repository are not
//! deduplicated; the counter only makes the busy-state observable.

use crate::services::store_events::StoreEvents;
use std::collections::HashMap;
use std::sync::Mutex;

/// Per-repository counter of active fetch operations.
pub struct FetchCoordinator {
    /// Repository local id -> number of active fetches.
    counts: Mutex<HashMap<i64, i64>>,

    /// Update notifications fire here on every counter change.
    events: StoreEvents,
}

impl FetchCoordinator {
    pub fn new(events: StoreEvents) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Apply a delta function to the repository's active fetch count.
    ///
    /// Absent entries default to zero. An update notification fires after
    /// every call, including transitions to and from zero.
    pub fn change_active_fetch_count<F>(&self, repository_id: i64, delta: F)
    where
        F: FnOnce(i64) -> i64,
    {
        if let Ok(mut counts) = self.counts.lock() {
            let current = counts.get(&repository_id).copied().unwrap_or(0);
            counts.insert(repository_id, delta(current));
        }
        self.events.emit_pull_requests_updated(repository_id);
    }

    /// Current active fetch count for a repository.
    pub fn active_fetch_count(&self, repository_id: i64) -> i64 {
        self.counts
            .lock()
            .map(|counts| counts.get(&repository_id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Whether at least one fetch is running for a repository.
    pub fn is_fetching(&self, repository_id: i64) -> bool {
        self.active_fetch_count(repository_id) > 0
    }
}
