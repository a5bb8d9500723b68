// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! A small cancellation primitive connecting [`crate::signals`] to a
//! running demo pipeline. The reference project's bootstrap crate carries
//! a `shutdown` module by name but its content was not present in the
//! retrieved slice, so this is built fresh — using `tokio::sync::Notify`,
//! the same primitive the engine's own queue uses to suspend workers,
//! rather than introducing a different cancellation style into the
//! workspace. The engine crate has its own, separate cancellation token
//! (`stagepipe::cancel::Cancel`) for the item-level fail-fast teardown of
//! §4.4; this one is a process-level concern one layer up, for an
//! operator-requested shutdown the demo binary races against pipeline
//! completion.
//!
//! This does not reach into a running pipeline's workers — bootstrap has
//! no dependency on the engine crate, by design (see `lib.rs`). What
//! [`ShutdownToken`] gives a caller is a way to stop *waiting* on a
//! long-running collecting pipeline once a signal arrives, and to observe
//! whether a shutdown was requested; the pipeline itself keeps running in
//! the background until it drains on its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// A single-use, clone-and-share shutdown flag.
#[derive(Clone)]
pub struct ShutdownToken {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Marks shutdown as requested and wakes every waiter. Idempotent.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// True once [`Self::request`] has been called.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Resolves once [`Self::request`] has been called (immediately, if it
    /// already has).
    ///
    /// Registers interest with `notify.notified()` *before* checking the
    /// flag: `notify_waiters()` only wakes tasks already registered at the
    /// moment it runs, so checking the flag first and registering after
    /// would drop a `request()` that lands in between — this waiter would
    /// then block forever. See `tokio::sync::Notify`'s own docs on this
    /// exact ordering requirement.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}
