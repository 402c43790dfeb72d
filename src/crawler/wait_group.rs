//! Completion tracking for the recursive fan-out
//!
//! Every dispatched visit holds a [`WorkGuard`]. The guard is taken *before*
//! the task is spawned and dropped only after the task has taken guards for
//! all of its children, so the pending count cannot touch zero while part of
//! the tree is still being discovered.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

struct Inner {
    pending: AtomicUsize,
    notify: Notify,
}

/// Counts outstanding units of work and lets one caller wait for all of them
#[derive(Clone)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: AtomicUsize::new(0),
                notify: Notify::new(),
            }),
        }
    }

    /// Registers one unit of work
    ///
    /// Call this before handing the work to another task, either before
    /// `wait` starts or while holding a live guard.
    pub fn add(&self) -> WorkGuard {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        WorkGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Units registered and not yet finished
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Resolves once every registered unit has finished
    ///
    /// Returns immediately if nothing was ever registered.
    pub async fn wait(&self) {
        loop {
            // Created before the check so a wake-up between the load and the
            // await is not lost.
            let notified = self.inner.notify.notified();
            if self.inner.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

/// One registered unit of work; finishing it is dropping it
///
/// Dropping on unwind means a panicking visit still counts as finished.
pub struct WorkGuard {
    inner: Arc<Inner>,
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        if self.inner.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.notify.notify_waiters();
        }
    }
}
