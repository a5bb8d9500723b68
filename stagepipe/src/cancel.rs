// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cancellation
//!
//! A pipeline-scoped flag, set exactly once by the [`crate::coordinator::Coordinator`]
//! the instant it observes the first stage-function error (§4.4, "Teardown
//! on error"). It is the engine's own primitive, distinct from
//! `stagepipe_bootstrap::shutdown::ShutdownToken` one layer up — that one
//! reacts to an operator signal and only ever stops a caller from
//! *waiting*; this one is part of the engine's own correctness contract,
//! since "cause all other workers to terminate promptly" (§4.2) cannot be
//! achieved by queue closure alone.
//!
//! Forcing an `Eos` onto every queue (see [`crate::coordinator`]) is
//! enough to unblock a worker parked on `dequeue` — eventually it drains
//! down to the marker. It is not enough for a worker parked on `enqueue`
//! to a bounded, full downstream queue: nothing about an upstream `Eos`
//! makes room downstream. [`Cancel`] is what a worker races its `enqueue`
//! calls against so that case does not hang until the whole run times out
//! on its own (it never would, by construction — see §5(c)).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// A single-use, clone-and-share cancellation flag.
#[derive(Clone)]
pub struct Cancel {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Cancel {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Marks the run as cancelled and wakes every waiter. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// True once [`Self::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`Self::cancel`] has been called (immediately, if it
    /// already has). Intended to be raced against a blocking queue
    /// operation with `tokio::select!`.
    ///
    /// Registers interest with `notify.notified()` *before* checking the
    /// flag: `notify_waiters()` only wakes tasks already registered at the
    /// moment it runs, so checking the flag first and registering after
    /// would drop a `cancel()` that lands in between — a worker racing this
    /// against a full downstream queue would then block forever instead of
    /// unwinding during teardown. See `tokio::sync::Notify`'s own docs on
    /// this exact ordering requirement.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl Default for Cancel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = Cancel::new();
        let waiter = token.clone();

        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });

        tokio::task::yield_now().await;
        token.cancel();
        tokio::time::timeout(Duration::from_millis(200), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_if_already_set() {
        let token = Cancel::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(50), token.cancelled()).await.unwrap();
    }

    #[test]
    fn is_cancelled_defaults_to_false() {
        let token = Cancel::default();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let token = Cancel::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
