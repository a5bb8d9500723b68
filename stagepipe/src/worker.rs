// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Wrappers
//!
//! One function per stage shape (source, one-to-one transform, one-to-many
//! transform, sink). Each wrapper is the home of the protocol every stage
//! follows regardless of what the caller's function does:
//!
//! 1. send [`Signal::start`] before touching user code;
//! 2. on dequeuing [`Slot::Eos`], re-enqueue it once onto the *same* queue
//!    before exiting, so sibling workers sharing that queue also see it —
//!    downstream propagation past this stage is the coordinator's job, not
//!    this worker's (see [`crate::coordinator`]);
//! 3. send [`Signal::stop`] on the way out, success or failure, so the
//!    coordinator's job-count bookkeeping is never left stale by an error;
//! 4. a stage function's error on any item is fatal: it is reported on
//!    `errors` immediately, and the worker stops touching further items.
//!    It does not re-enqueue `Eos` itself in this case — it never saw one —
//!    but it does not need to: the coordinator reacts to the same error by
//!    cancelling the run and force-pushing `Eos` onto every queue, which is
//!    what wakes this worker's siblings and lets them exit through their
//!    normal branch above.
//!
//! Every item dequeued after [`Cancel`] has fired is discarded without
//! being handed to the caller's function — a worker racing a sibling's
//! failure keeps draining its queue (so it notices the forced `Eos`
//! promptly) but stops doing real work the moment the run is going down
//! anyway.
//!
//! A source has no upstream queue and therefore nothing to re-enqueue —
//! it simply runs its function to completion once, or fails once.

use std::sync::Arc;

use tokio::sync::mpsc;

use stagepipe_domain::{Emit, FlatTransformFn, PipelineError, Signal, SinkFn, SourceFn, StageIndex, TransformFn};

use crate::cancel::Cancel;
use crate::emitter::QueueEmitter;
use crate::infrastructure::PipelineMetrics;
use crate::queue::{Queue, Slot};
use crate::trace::{TraceEvent, TraceSink};

fn start(
    stage: StageIndex,
    worker: usize,
    signals: &mpsc::UnboundedSender<Signal>,
    trace: &Option<Arc<TraceSink>>,
    metrics: &Option<Arc<PipelineMetrics>>,
) {
    let _ = signals.send(Signal::start(stage));
    if let Some(trace) = trace {
        trace.record(stage, worker, TraceEvent::Start);
    }
    if let Some(metrics) = metrics {
        metrics.record_worker_start();
    }
}

fn stop(
    stage: StageIndex,
    worker: usize,
    signals: &mpsc::UnboundedSender<Signal>,
    trace: &Option<Arc<TraceSink>>,
    metrics: &Option<Arc<PipelineMetrics>>,
) {
    if let Some(trace) = trace {
        trace.record(stage, worker, TraceEvent::Stop);
    }
    if let Some(metrics) = metrics {
        metrics.record_worker_stop();
    }
    let _ = signals.send(Signal::stop(stage));
}

/// Reports a fatal stage-function error on the dedicated error channel so
/// the coordinator can cancel the run promptly, without waiting for every
/// worker to join.
fn report_error(err: &PipelineError, errors: &mpsc::UnboundedSender<PipelineError>) {
    let _ = errors.send(err.clone());
}

/// Runs a source: calls `function` once to completion, then stops.
pub async fn run_source<T: Send + 'static>(
    function: SourceFn<T>,
    worker: usize,
    downstream: Arc<Queue<T>>,
    signals: mpsc::UnboundedSender<Signal>,
    errors: mpsc::UnboundedSender<PipelineError>,
    cancel: Cancel,
    trace: Option<Arc<TraceSink>>,
    metrics: Option<Arc<PipelineMetrics>>,
) -> Result<(), PipelineError> {
    let stage = StageIndex::SOURCE;
    start(stage, worker, &signals, &trace, &metrics);

    let emit: Arc<dyn Emit<T>> = Arc::new(QueueEmitter::new(downstream, cancel));
    let result = function(emit).await.map_err(|err| {
        tracing::error!(%stage, worker, %err, "source failed");
        if let Some(trace) = &trace {
            trace.record_error(stage, worker, &err);
        }
        if let Some(metrics) = &metrics {
            metrics.record_error();
        }
        let err = err.into_stage_failure(stage.to_string(), worker);
        report_error(&err, &errors);
        err
    });

    stop(stage, worker, &signals, &trace, &metrics);
    result
}

/// Runs a one-to-one transform worker until it observes `Eos` or a fatal
/// error.
pub async fn run_transform_one_to_one<T: Send + 'static>(
    function: TransformFn<T>,
    stage: StageIndex,
    worker: usize,
    upstream: Arc<Queue<T>>,
    downstream: Arc<Queue<T>>,
    signals: mpsc::UnboundedSender<Signal>,
    errors: mpsc::UnboundedSender<PipelineError>,
    cancel: Cancel,
    trace: Option<Arc<TraceSink>>,
    metrics: Option<Arc<PipelineMetrics>>,
) -> Result<(), PipelineError> {
    start(stage, worker, &signals, &trace, &metrics);
    let mut outcome = Ok(());

    loop {
        match upstream.dequeue().await {
            Slot::Eos => {
                upstream.enqueue(Slot::Eos).await;
                break;
            }
            Slot::Item(item) => {
                if cancel.is_cancelled() {
                    continue;
                }
                if let Some(trace) = &trace {
                    trace.record(stage, worker, TraceEvent::ItemProcessed);
                }
                if let Some(metrics) = &metrics {
                    metrics.record_item_processed();
                }
                match function(item).await {
                    Ok(output) => {
                        tokio::select! {
                            _ = downstream.enqueue(Slot::Item(output)) => {},
                            _ = cancel.cancelled() => {},
                        }
                    }
                    Err(err) => {
                        tracing::error!(%stage, worker, %err, "transform failed on item");
                        if let Some(trace) = &trace {
                            trace.record_error(stage, worker, &err);
                        }
                        if let Some(metrics) = &metrics {
                            metrics.record_error();
                        }
                        let err = err.into_stage_failure(stage.to_string(), worker);
                        report_error(&err, &errors);
                        outcome = Err(err);
                        break;
                    }
                }
            }
        }
    }

    stop(stage, worker, &signals, &trace, &metrics);
    outcome
}

/// Runs a one-to-many (flat) transform worker until it observes `Eos` or a
/// fatal error.
pub async fn run_transform_one_to_many<T: Send + 'static>(
    function: FlatTransformFn<T>,
    stage: StageIndex,
    worker: usize,
    upstream: Arc<Queue<T>>,
    downstream: Arc<Queue<T>>,
    signals: mpsc::UnboundedSender<Signal>,
    errors: mpsc::UnboundedSender<PipelineError>,
    cancel: Cancel,
    trace: Option<Arc<TraceSink>>,
    metrics: Option<Arc<PipelineMetrics>>,
) -> Result<(), PipelineError> {
    start(stage, worker, &signals, &trace, &metrics);
    let mut outcome = Ok(());
    let emit: Arc<dyn Emit<T>> = Arc::new(QueueEmitter::new(downstream, cancel.clone()));

    loop {
        match upstream.dequeue().await {
            Slot::Eos => {
                upstream.enqueue(Slot::Eos).await;
                break;
            }
            Slot::Item(item) => {
                if cancel.is_cancelled() {
                    continue;
                }
                if let Some(trace) = &trace {
                    trace.record(stage, worker, TraceEvent::ItemProcessed);
                }
                if let Some(metrics) = &metrics {
                    metrics.record_item_processed();
                }
                if let Err(err) = function(item, emit.clone()).await {
                    tracing::error!(%stage, worker, %err, "flat transform failed on item");
                    if let Some(trace) = &trace {
                        trace.record_error(stage, worker, &err);
                    }
                    if let Some(metrics) = &metrics {
                        metrics.record_error();
                    }
                    let err = err.into_stage_failure(stage.to_string(), worker);
                    report_error(&err, &errors);
                    outcome = Err(err);
                    break;
                }
            }
        }
    }

    stop(stage, worker, &signals, &trace, &metrics);
    outcome
}

/// Runs a sink worker until it observes `Eos` or a fatal error.
pub async fn run_sink<T: Send + 'static>(
    function: SinkFn<T>,
    stage: StageIndex,
    worker: usize,
    upstream: Arc<Queue<T>>,
    signals: mpsc::UnboundedSender<Signal>,
    errors: mpsc::UnboundedSender<PipelineError>,
    cancel: Cancel,
    trace: Option<Arc<TraceSink>>,
    metrics: Option<Arc<PipelineMetrics>>,
) -> Result<(), PipelineError> {
    start(stage, worker, &signals, &trace, &metrics);
    let mut outcome = Ok(());

    loop {
        match upstream.dequeue().await {
            Slot::Eos => {
                upstream.enqueue(Slot::Eos).await;
                break;
            }
            Slot::Item(item) => {
                if cancel.is_cancelled() {
                    continue;
                }
                if let Some(trace) = &trace {
                    trace.record(stage, worker, TraceEvent::ItemProcessed);
                }
                if let Some(metrics) = &metrics {
                    metrics.record_item_processed();
                }
                if let Err(err) = function(item).await {
                    tracing::error!(%stage, worker, %err, "sink failed on item");
                    if let Some(trace) = &trace {
                        trace.record_error(stage, worker, &err);
                    }
                    if let Some(metrics) = &metrics {
                        metrics.record_error();
                    }
                    let err = err.into_stage_failure(stage.to_string(), worker);
                    report_error(&err, &errors);
                    outcome = Err(err);
                    break;
                }
            }
        }
    }

    stop(stage, worker, &signals, &trace, &metrics);
    outcome
}
