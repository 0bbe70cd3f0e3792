//! Cancellation for a fetch: a shared signal plus the policy for what
//! happens to tasks still running when it fires.
//!
//! The orchestrator waits on the signal alongside its tasks; the curl
//! downloader polls it from libcurl's progress callback and aborts the
//! transfer. Nothing else observes it: a task busy hashing runs to completion.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable cancellation signal. All clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once `cancel` has been called (immediately if it already was).
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent `cancel` is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// What `get_params` does with running tasks once the signal fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelMode {
    /// Return at once with the errors recorded so far. Tasks keep running
    /// detached and their later outcomes (errors, deleted files) are not reported.
    #[default]
    Detach,
    /// Keep waiting until every spawned task finishes, then report all errors.
    /// Tasks are still not interrupted, though in-flight transfers see the
    /// signal and abort.
    Drain,
}
