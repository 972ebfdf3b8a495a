//! Store event subscriptions.
//!
//! Consumers register callbacks for cache updates and contained sync
//! errors. Registration returns a `Subscription` guard that deregisters
//! the callback when dropped. Callbacks run synchronously in registration
//! order and must not block.

use crate::error::AppError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type UpdateCallback = Arc<dyn Fn(i64) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&AppError) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    updated: Mutex<Vec<(u64, UpdateCallback)>>,
    errors: Mutex<Vec<(u64, ErrorCallback)>>,
}

/// Which listener list a subscription belongs to.
#[derive(Clone, Copy)]
enum EventKind {
    PullRequestsUpdated,
    SyncError,
}

/// Event hub shared between the sync engine and its consumers.
#[derive(Clone, Default)]
pub struct StoreEvents {
    listeners: Arc<Listeners>,
}

/// Guard for a registered callback. Dropping it removes the callback.
#[must_use = "dropping the subscription immediately deregisters the callback"]
pub struct Subscription {
    listeners: Weak<Listeners>,
    kind: EventKind,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(listeners) = self.listeners.upgrade() else {
            return;
        };
        match self.kind {
            EventKind::PullRequestsUpdated => {
                if let Ok(mut callbacks) = listeners.updated.lock() {
                    callbacks.retain(|(id, _)| *id != self.id);
                }
            }
            EventKind::SyncError => {
                if let Ok(mut callbacks) = listeners.errors.lock() {
                    callbacks.retain(|(id, _)| *id != self.id);
                }
            }
        }
    }
}

impl StoreEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for pull request cache updates.
    ///
    /// The callback receives the local id of the repository whose cached
    /// data (or busy-state) changed.
    pub fn on_pull_requests_updated<F>(&self, callback: F) -> Subscription
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        let id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut callbacks) = self.listeners.updated.lock() {
            callbacks.push((id, Arc::new(callback)));
        }
        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            kind: EventKind::PullRequestsUpdated,
            id,
        }
    }

    /// Register a callback for errors contained during sync.
    pub fn on_sync_error<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&AppError) + Send + Sync + 'static,
    {
        let id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut callbacks) = self.listeners.errors.lock() {
            callbacks.push((id, Arc::new(callback)));
        }
        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            kind: EventKind::SyncError,
            id,
        }
    }

    /// Notify update listeners, in registration order.
    pub fn emit_pull_requests_updated(&self, repository_id: i64) {
        // Snapshot the callbacks so a listener can subscribe or unsubscribe
        // without deadlocking.
        let callbacks: Vec<UpdateCallback> = match self.listeners.updated.lock() {
            Ok(list) => list.iter().map(|(_, cb)| cb.clone()).collect(),
            Err(_) => return,
        };
        for callback in callbacks {
            callback(repository_id);
        }
    }

    /// Notify error listeners, in registration order.
    pub fn emit_sync_error(&self, error: &AppError) {
        let callbacks: Vec<ErrorCallback> = match self.listeners.errors.lock() {
            Ok(list) => list.iter().map(|(_, cb)| cb.clone()).collect(),
            Err(_) => return,
        };
        for callback in callbacks {
            callback(error);
        }
    }
}
