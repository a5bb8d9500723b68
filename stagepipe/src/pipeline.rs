// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Controller
//!
//! Two entry points, chosen by the [`PipelineConfig`] the caller hands in:
//!
//! - [`SinkPipeline`] — the config has a sink stage; `run` drives the
//!   whole pipeline to completion in-process and returns a
//!   [`PipelineReport`].
//! - [`CollectingPipeline`] — the config has none; `run` spawns the
//!   pipeline in the background and hands back a lazy [`Stream`] of its
//!   final output, plus the same report once the stream is fully drained.
//!
//! Encoding "has a sink" as two types rather than one pipeline with an
//! `Option<Sink>` branch means a caller can never accidentally call `run`
//! on a collecting pipeline and get nothing back, or attach a sink *and*
//! try to collect — the type they constructed says which shape they get.
//!
//! Both entry points fail fast: any stage-function error anywhere in the
//! pipeline becomes the `Err` the caller receives, not a field buried in a
//! success value. See [`crate::coordinator`] and [`crate::cancel`] for how
//! that error propagates to every other worker before `run`/`report`
//! resolves.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use stagepipe_domain::{PipelineConfig, PipelineError, Signal, StageBody, StageIndex};

use crate::cancel::Cancel;
use crate::infrastructure::{validate_capacity, PipelineMetrics};
use crate::queue::{Queue, Slot};
use crate::trace::{TraceEntry, TraceSink};
use crate::worker::{run_sink, run_source, run_transform_one_to_many, run_transform_one_to_one};

/// Options that govern how a pipeline is started, independent of its
/// topology (which lives entirely in [`PipelineConfig`]).
#[derive(Clone, Default)]
pub struct StartOptions {
    /// Caps how many workers may be scheduled concurrently. `None` places
    /// no ceiling on concurrency. When set, it must cover every configured
    /// worker plus one slot for the coordinator, or `run` fails with
    /// [`PipelineError::ResourceExhausted`] before any worker is spawned —
    /// see [`crate::infrastructure::capacity`].
    pub n_jobs: Option<usize>,
    /// Caps the number of items resting on each queue at once. `None`
    /// leaves every queue unbounded.
    pub queue_capacity: Option<usize>,
    /// Enables the in-memory [`TraceSink`], returned as part of the
    /// [`PipelineReport`].
    pub verbose: bool,
    /// When present, registers a [`PipelineMetrics`] against this registry
    /// and threads it through every worker for the run's lifetime.
    pub metrics_registry: Option<prometheus::Registry>,
}

impl std::fmt::Debug for StartOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartOptions")
            .field("n_jobs", &self.n_jobs)
            .field("queue_capacity", &self.queue_capacity)
            .field("verbose", &self.verbose)
            .field("metrics_registry", &self.metrics_registry.is_some())
            .finish()
    }
}

fn total_worker_count<T>(config: &PipelineConfig<T>) -> usize {
    let mut total = config.source.workers.get();
    total += config.transforms.iter().map(|stage| stage.workers.get()).sum::<usize>();
    if let Some(sink_stage) = &config.sink {
        total += sink_stage.workers.get();
    }
    total
}

/// The outcome of a completed (or fully-drained, for a collecting
/// pipeline) run. Only ever returned on success — any stage-function
/// failure surfaces as `Err(PipelineError)` instead, never as a field on
/// this struct to check afterward.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Populated only when the run was started with `verbose: true`.
    pub trace: Vec<TraceEntry>,
}

fn build_queues<T>(queue_count: usize, capacity: Option<usize>) -> Arc<Vec<Arc<Queue<T>>>> {
    Arc::new((0..queue_count).map(|_| Arc::new(Queue::new(capacity))).collect())
}

/// Spawns every worker task for `config` and returns their join handles.
/// Does not spawn a task for draining the final queue — that is the
/// caller's responsibility (a sink pipeline has sink workers do it; a
/// collecting pipeline hands the queue to its output stream instead).
#[allow(clippy::too_many_arguments)]
fn spawn_workers<T: Send + 'static>(
    config: &PipelineConfig<T>,
    queues: &Arc<Vec<Arc<Queue<T>>>>,
    signals: &mpsc::UnboundedSender<Signal>,
    errors: &mpsc::UnboundedSender<PipelineError>,
    cancel: &Cancel,
    trace: &Option<Arc<TraceSink>>,
    metrics: &Option<Arc<PipelineMetrics>>,
) -> Vec<JoinHandle<Result<(), PipelineError>>> {
    let mut handles = Vec::new();

    for worker in 0..config.source.workers.get() {
        let function = config.source.function.clone();
        let downstream = queues[0].clone();
        let signals = signals.clone();
        let errors = errors.clone();
        let cancel = cancel.clone();
        let trace = trace.clone();
        let metrics = metrics.clone();
        handles.push(tokio::spawn(run_source(function, worker, downstream, signals, errors, cancel, trace, metrics)));
    }

    for (i, stage) in config.transforms.iter().enumerate() {
        let stage_index = StageIndex::transform(i);
        let upstream = queues[i].clone();
        let downstream = queues[i + 1].clone();
        for worker in 0..stage.workers.get() {
            let upstream = upstream.clone();
            let downstream = downstream.clone();
            let signals = signals.clone();
            let errors = errors.clone();
            let cancel = cancel.clone();
            let trace = trace.clone();
            let metrics = metrics.clone();
            let handle = match &stage.body {
                StageBody::OneToOne(f) => tokio::spawn(run_transform_one_to_one(
                    f.clone(),
                    stage_index,
                    worker,
                    upstream,
                    downstream,
                    signals,
                    errors,
                    cancel,
                    trace,
                    metrics,
                )),
                StageBody::OneToMany(f) => tokio::spawn(run_transform_one_to_many(
                    f.clone(),
                    stage_index,
                    worker,
                    upstream,
                    downstream,
                    signals,
                    errors,
                    cancel,
                    trace,
                    metrics,
                )),
            };
            handles.push(handle);
        }
    }

    if let Some(sink_stage) = &config.sink {
        let stage_index = StageIndex::sink(config.transform_count());
        let upstream = queues[config.transform_count()].clone();
        for worker in 0..sink_stage.workers.get() {
            let function = sink_stage.function.clone();
            let upstream = upstream.clone();
            let signals = signals.clone();
            let errors = errors.clone();
            let cancel = cancel.clone();
            let trace = trace.clone();
            let metrics = metrics.clone();
            handles.push(tokio::spawn(run_sink(
                function, stage_index, worker, upstream, signals, errors, cancel, trace, metrics,
            )));
        }
    }

    handles
}

fn initial_job_counts<T>(config: &PipelineConfig<T>) -> Vec<usize> {
    let mut jobs = vec![0usize; config.job_slot_count()];
    jobs[StageIndex::SOURCE.slot()] = config.source.workers.get();
    for (i, stage) in config.transforms.iter().enumerate() {
        jobs[StageIndex::transform(i).slot()] = stage.workers.get();
    }
    if let Some(sink_stage) = &config.sink {
        jobs[StageIndex::sink(config.transform_count()).slot()] = sink_stage.workers.get();
    }
    jobs
}

/// Joins every worker and the coordinator, and reduces the individual
/// worker outcomes to a single `Result`: the first error any worker
/// returned, if any, otherwise `Ok(())`. A panicked task is itself treated
/// as an internal error rather than silently dropped.
async fn join_workers(
    handles: Vec<JoinHandle<Result<(), PipelineError>>>,
    coordinator: JoinHandle<()>,
) -> Result<(), PipelineError> {
    let results = futures::future::join_all(handles).await;
    coordinator.await.map_err(|e| PipelineError::internal(format!("coordinator task panicked: {e}")))?;

    let mut first_error = None;
    for result in results {
        let result = result.map_err(|e| PipelineError::internal(format!("worker task panicked: {e}")))?;
        if let Err(err) = result {
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// A pipeline whose [`PipelineConfig`] carries a sink stage: `run` drives
/// every stage to completion in-process.
pub struct SinkPipeline<T> {
    config: PipelineConfig<T>,
}

impl<T: Send + 'static> SinkPipeline<T> {
    pub fn new(config: PipelineConfig<T>) -> Result<Self, PipelineError> {
        config.validate()?;
        if config.sink.is_none() {
            return Err(PipelineError::invalid_config(
                "SinkPipeline requires a configuration with a sink stage; use CollectingPipeline otherwise",
            ));
        }
        Ok(Self { config })
    }

    pub async fn run(self, opts: StartOptions) -> Result<PipelineReport, PipelineError> {
        validate_capacity(opts.n_jobs, total_worker_count(&self.config))?;

        let trace = opts.verbose.then(|| Arc::new(TraceSink::new()));
        let metrics = opts
            .metrics_registry
            .as_ref()
            .map(PipelineMetrics::new)
            .transpose()?
            .map(Arc::new);
        let queues = build_queues(self.config.queue_count(), opts.queue_capacity);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        let cancel = Cancel::new();

        let jobs = initial_job_counts(&self.config);
        let coordinator = crate::coordinator::Coordinator::new(jobs, queues.clone(), signal_rx, error_rx, cancel.clone());
        let coordinator_handle = tokio::spawn(coordinator.run());

        let handles = spawn_workers(&self.config, &queues, &signal_tx, &error_tx, &cancel, &trace, &metrics);
        drop(signal_tx);
        drop(error_tx);

        join_workers(handles, coordinator_handle).await?;
        Ok(PipelineReport { trace: trace.map(|t| t.entries()).unwrap_or_default() })
    }
}

/// A pipeline whose [`PipelineConfig`] carries no sink stage: `run`
/// returns a lazy stream over the final queue's items.
pub struct CollectingPipeline<T> {
    config: PipelineConfig<T>,
}

impl<T: Send + 'static> CollectingPipeline<T> {
    pub fn new(config: PipelineConfig<T>) -> Result<Self, PipelineError> {
        config.validate()?;
        if config.sink.is_some() {
            return Err(PipelineError::invalid_config(
                "CollectingPipeline must not have a sink stage; use SinkPipeline instead",
            ));
        }
        Ok(Self { config })
    }

    /// Starts the pipeline in the background and returns a stream over its
    /// final queue. `report()` on the returned handle resolves once the
    /// stream has been fully drained and every worker has joined, and
    /// fails if any stage function failed along the way.
    ///
    /// Fails before spawning anything if `opts.n_jobs` cannot cover the
    /// configured workers, or if `opts.metrics_registry` rejects
    /// registration (e.g. a name collision).
    pub fn run(self, opts: StartOptions) -> Result<CollectingHandle<T>, PipelineError> {
        validate_capacity(opts.n_jobs, total_worker_count(&self.config))?;

        let trace = opts.verbose.then(|| Arc::new(TraceSink::new()));
        let metrics = opts
            .metrics_registry
            .as_ref()
            .map(PipelineMetrics::new)
            .transpose()?
            .map(Arc::new);
        let queues = build_queues(self.config.queue_count(), opts.queue_capacity);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        let cancel = Cancel::new();

        let jobs = initial_job_counts(&self.config);
        let coordinator = crate::coordinator::Coordinator::new(jobs, queues.clone(), signal_rx, error_rx, cancel.clone());
        let coordinator_handle = tokio::spawn(coordinator.run());

        let handles = spawn_workers(&self.config, &queues, &signal_tx, &error_tx, &cancel, &trace, &metrics);
        drop(signal_tx);
        drop(error_tx);

        let final_queue = queues[self.config.transform_count()].clone();
        let (report_tx, report_rx) = tokio::sync::oneshot::channel();

        let stream: Pin<Box<dyn Stream<Item = T> + Send>> = Box::pin(async_stream::stream! {
            loop {
                match final_queue.dequeue().await {
                    Slot::Item(item) => yield item,
                    Slot::Eos => break,
                }
            }
            let outcome = join_workers(handles, coordinator_handle).await.map(|()| PipelineReport {
                trace: trace.map(|t| t.entries()).unwrap_or_default(),
            });
            let _ = report_tx.send(outcome);
        });

        Ok(CollectingHandle { stream, report: report_rx })
    }
}

/// A running collecting pipeline: the output stream, and a future for the
/// report that resolves once the stream has been fully drained.
pub struct CollectingHandle<T> {
    pub stream: Pin<Box<dyn Stream<Item = T> + Send>>,
    report: tokio::sync::oneshot::Receiver<Result<PipelineReport, PipelineError>>,
}

impl<T> CollectingHandle<T> {
    /// Resolves once the stream has yielded its last item and every worker
    /// has joined, or fails if any stage function failed along the way.
    /// Awaiting this before the stream is fully drained will hang — drain
    /// `stream` first.
    pub async fn report(self) -> Result<PipelineReport, PipelineError> {
        match self.report.await {
            Ok(outcome) => outcome,
            Err(_) => Err(PipelineError::internal("pipeline task dropped before producing a report")),
        }
    }
}
