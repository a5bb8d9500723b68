// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The engine's implementation of [`stagepipe_domain::Emit`]: a write-only
//! handle onto one downstream [`Queue`], handed to sources and flat
//! transforms so they can produce items without seeing the queue type.
//!
//! `emit` races the enqueue against [`Cancel`]: a source or flat transform
//! blocked on a full downstream queue must still be able to unblock once
//! another stage has failed and torn the run down, not just once its own
//! downstream eventually drains.

use std::sync::Arc;

use stagepipe_domain::{BoxFuture, Emit};

use crate::cancel::Cancel;
use crate::queue::{Queue, Slot};

pub struct QueueEmitter<T> {
    downstream: Arc<Queue<T>>,
    cancel: Cancel,
}

impl<T> QueueEmitter<T> {
    pub fn new(downstream: Arc<Queue<T>>, cancel: Cancel) -> Self {
        Self { downstream, cancel }
    }
}

impl<T: Send + 'static> Emit<T> for QueueEmitter<T> {
    fn emit(&self, item: T) -> BoxFuture<'static, ()> {
        let downstream = self.downstream.clone();
        let cancel = self.cancel.clone();
        Box::pin(async move {
            tokio::select! {
                _ = downstream.enqueue(Slot::Item(item)) => {},
                _ = cancel.cancelled() => {},
            }
        })
    }
}
