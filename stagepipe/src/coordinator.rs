// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Coordinator
//!
//! A single task, owned by no one else, that is the sole consumer of every
//! worker's lifecycle [`Signal`] and fatal-error reports. It is the only
//! place in the engine that mutates the per-stage job-count vector, so that
//! vector needs no synchronization of its own — a plain `Vec<usize>`, not
//! `Vec<AtomicUsize>`.
//!
//! On a `Stop` signal at stage `s`, the coordinator decrements
//! `jobs[s.slot()]`. When a slot reaches zero — meaning every worker
//! assigned to that stage has now exited — and that slot indexes a real
//! downstream queue (`slot < queues.len()`; false for the sink's slot,
//! which has no queue past it), the coordinator enqueues [`Slot::Eos`] onto
//! that queue exactly once. This is how end-of-stream propagates one stage
//! at a time regardless of how many workers share a queue, without any
//! worker needing to know how many siblings it has.
//!
//! The coordinator also races the signal channel against a separate error
//! channel fed by [`crate::worker`]. The first error it observes trips
//! [`Cancel`] — every worker still running notices on its next iteration and
//! stops touching items — and forces `Eos` onto every queue that has not
//! already been closed, regardless of whether that queue's upstream stage
//! has actually drained. This is what bounds teardown time after a failure:
//! without it, a stage with a slow producer and no error of its own could
//! keep its downstream sink parked on `dequeue` long after the run is
//! already doomed.
//!
//! The coordinator exits on its own once every slot has reached zero — it
//! does not wait for either channel to close.

use std::sync::Arc;

use tokio::sync::mpsc;

use stagepipe_domain::{PipelineError, Signal, SignalKind};

use crate::cancel::Cancel;
use crate::queue::{Queue, Slot};

pub struct Coordinator<T> {
    jobs: Vec<usize>,
    closed: Vec<bool>,
    queues: Arc<Vec<Arc<Queue<T>>>>,
    signals: mpsc::UnboundedReceiver<Signal>,
    errors: mpsc::UnboundedReceiver<PipelineError>,
    cancel: Cancel,
}

impl<T> Coordinator<T> {
    pub fn new(
        jobs: Vec<usize>,
        queues: Arc<Vec<Arc<Queue<T>>>>,
        signals: mpsc::UnboundedReceiver<Signal>,
        errors: mpsc::UnboundedReceiver<PipelineError>,
        cancel: Cancel,
    ) -> Self {
        let closed = vec![false; queues.len()];
        Self { jobs, closed, queues, signals, errors, cancel }
    }

    async fn close(&mut self, slot: usize) {
        if slot < self.queues.len() && !self.closed[slot] {
            self.closed[slot] = true;
            self.queues[slot].enqueue(Slot::Eos).await;
        }
    }

    /// Force-closes every queue not already closed, and trips [`Cancel`] so
    /// every running worker stops processing items. Called once, on the
    /// first error observed.
    async fn teardown(&mut self) {
        self.cancel.cancel();
        for slot in 0..self.queues.len() {
            self.close(slot).await;
        }
    }

    /// Runs until every stage's job count has reached zero.
    pub async fn run(mut self) {
        if self.jobs.iter().all(|&n| n == 0) {
            return;
        }
        loop {
            tokio::select! {
                signal = self.signals.recv() => {
                    let Some(signal) = signal else { break };
                    let slot = signal.stage.slot();
                    match signal.kind {
                        // Start carries no bookkeeping obligation today; see
                        // stagepipe_domain::value_objects::signal.
                        SignalKind::Start => {}
                        SignalKind::Stop => {
                            if slot < self.jobs.len() {
                                self.jobs[slot] = self.jobs[slot].saturating_sub(1);
                                if self.jobs[slot] == 0 {
                                    tracing::debug!(stage = %signal.stage, "stage drained, propagating end of stream");
                                    self.close(slot).await;
                                }
                            }
                        }
                    }
                }
                error = self.errors.recv() => {
                    if let Some(err) = error {
                        tracing::error!(%err, "fatal stage error observed, cancelling run");
                        self.teardown().await;
                    }
                }
            }
            if self.jobs.iter().all(|&n| n == 0) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagepipe_domain::StageIndex;

    fn channels() -> (
        (mpsc::UnboundedSender<Signal>, mpsc::UnboundedReceiver<Signal>),
        (mpsc::UnboundedSender<PipelineError>, mpsc::UnboundedReceiver<PipelineError>),
    ) {
        (mpsc::unbounded_channel(), mpsc::unbounded_channel())
    }

    #[tokio::test]
    async fn stop_at_zero_jobs_pushes_eos_to_downstream_queue() {
        let queues: Arc<Vec<Arc<Queue<u32>>>> = Arc::new(vec![Arc::new(Queue::new(None))]);
        let ((tx, rx), (_err_tx, err_rx)) = channels();
        let coordinator = Coordinator::new(vec![1], queues.clone(), rx, err_rx, Cancel::new());
        let handle = tokio::spawn(coordinator.run());

        tx.send(Signal::stop(StageIndex::SOURCE)).unwrap();
        handle.await.unwrap();

        match queues[0].dequeue().await {
            Slot::Eos => {}
            Slot::Item(_) => panic!("expected eos"),
        }
    }

    #[tokio::test]
    async fn sink_slot_never_pushes_past_the_last_queue() {
        // One queue (k=0, source -> sink directly), jobs has a slot for
        // source (0) and sink (1); sink's slot has no matching queue.
        let queues: Arc<Vec<Arc<Queue<u32>>>> = Arc::new(vec![Arc::new(Queue::new(None))]);
        let ((tx, rx), (_err_tx, err_rx)) = channels();
        let coordinator = Coordinator::new(vec![1, 1], queues.clone(), rx, err_rx, Cancel::new());
        let handle = tokio::spawn(coordinator.run());

        tx.send(Signal::stop(StageIndex::SOURCE)).unwrap();
        tx.send(Signal::stop(StageIndex::sink(0))).unwrap();
        handle.await.unwrap();

        // Exactly one Eos was pushed (from the source's stop), not two.
        match queues[0].dequeue().await {
            Slot::Eos => {}
            Slot::Item(_) => panic!("expected eos"),
        }
    }

    #[tokio::test]
    async fn coordinator_with_no_pending_jobs_returns_immediately() {
        let queues: Arc<Vec<Arc<Queue<u32>>>> = Arc::new(vec![]);
        let ((_tx, rx), (_err_tx, err_rx)) = channels();
        let coordinator = Coordinator::new(vec![], queues, rx, err_rx, Cancel::new());
        coordinator.run().await;
    }

    #[tokio::test]
    async fn an_error_trips_cancel_and_force_closes_every_queue() {
        // Two stages downstream of the failing one, neither of which has
        // stopped on its own — their queues must still get Eos.
        let queues: Arc<Vec<Arc<Queue<u32>>>> =
            Arc::new(vec![Arc::new(Queue::new(None)), Arc::new(Queue::new(None))]);
        let ((tx, rx), (err_tx, err_rx)) = channels();
        let cancel = Cancel::new();
        // jobs: source(1), transform(1), sink(1) — none have stopped yet.
        let coordinator = Coordinator::new(vec![1, 1, 1], queues.clone(), rx, err_rx, cancel.clone());
        let handle = tokio::spawn(coordinator.run());

        err_tx.send(PipelineError::processing_failed("boom")).unwrap();
        tokio::task::yield_now().await;
        assert!(cancel.is_cancelled());

        for queue in queues.iter() {
            match queue.dequeue().await {
                Slot::Eos => {}
                Slot::Item(_) => panic!("expected forced eos"),
            }
        }

        // Workers still have to report Stop for the coordinator to exit;
        // simulate them doing so after teardown.
        tx.send(Signal::stop(StageIndex::SOURCE)).unwrap();
        tx.send(Signal::stop(StageIndex::transform(0))).unwrap();
        tx.send(Signal::stop(StageIndex::sink(0))).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn teardown_does_not_push_eos_twice_onto_an_already_closed_queue() {
        let queues: Arc<Vec<Arc<Queue<u32>>>> = Arc::new(vec![Arc::new(Queue::new(None))]);
        let ((tx, rx), (err_tx, err_rx)) = channels();
        let coordinator = Coordinator::new(vec![1, 1], queues.clone(), rx, err_rx, Cancel::new());
        let handle = tokio::spawn(coordinator.run());

        // Source stops normally, closing the only queue.
        tx.send(Signal::stop(StageIndex::SOURCE)).unwrap();
        tokio::task::yield_now().await;

        // A sink error arrives after the queue is already closed.
        err_tx.send(PipelineError::processing_failed("boom")).unwrap();
        tx.send(Signal::stop(StageIndex::sink(0))).unwrap();
        handle.await.unwrap();

        assert!(matches!(queues[0].dequeue().await, Slot::Eos));
        // No second Eos queued behind the first.
        let second = tokio::time::timeout(std::time::Duration::from_millis(20), queues[0].dequeue()).await;
        assert!(second.is_err());
    }
}
