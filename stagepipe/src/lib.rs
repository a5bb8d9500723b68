// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stagepipe Engine
//!
//! The concurrent execution substrate for a staged pipeline: inter-stage
//! queues, per-stage worker pools, the termination protocol that drives
//! end-of-stream from the sources through to the collector, and the
//! coordinator that decides when each downstream queue should be closed.
//!
//! This crate depends on `stagepipe_domain` for the topology description
//! ([`stagepipe_domain::PipelineConfig`]) and supplies everything that
//! turns one into running workers:
//!
//! - [`queue`] — the multi-producer/multi-consumer FIFO carrying items and
//!   the in-band end-of-stream marker.
//! - [`worker`] — the three worker wrappers (source, transform, sink) that
//!   drive user functions against the surrounding queues.
//! - [`coordinator`] — the single task that owns the job-count vector and
//!   closes each queue exactly once.
//! - [`pipeline`] — the controller: [`pipeline::SinkPipeline`] and
//!   [`pipeline::CollectingPipeline`], chosen by whether the caller's
//!   configuration carries a sink stage.
//! - [`trace`] — the opt-in, in-memory verbose trace sink.
//! - [`infrastructure`] — the ambient stack: tracing-subscriber setup,
//!   layered configuration loading, Prometheus metrics, and the
//!   `n_jobs` capacity check.
//!
//! ## Quick start
//!
//! ```no_run
//! use stagepipe::{sink, source, transform, PipelineConfig, SinkStage, SourceStage, StageBody, TransformStage, WorkerCount};
//! use stagepipe::pipeline::{SinkPipeline, StartOptions};
//!
//! # async fn run() -> Result<(), stagepipe::PipelineError> {
//! let emit_numbers = source(|emit| async move {
//!     for n in 0..10u32 {
//!         emit.emit(n).await;
//!     }
//!     Ok(())
//! });
//! let double = transform(|n: u32| async move { Ok(n * 2) });
//! let print_sink = sink(|n: u32| async move {
//!     println!("{n}");
//!     Ok(())
//! });
//!
//! let config = PipelineConfig::new(
//!     SourceStage::new(emit_numbers, WorkerCount::new(1)?),
//!     vec![TransformStage::new(StageBody::OneToOne(double), WorkerCount::new(1)?)],
//!     Some(SinkStage::new(print_sink, WorkerCount::new(1)?)),
//! );
//!
//! let pipeline = SinkPipeline::new(config)?;
//! // `run` fails fast: any stage-function error anywhere in the pipeline
//! // surfaces here as `Err`, not buried in a report the caller has to
//! // remember to check.
//! let _report = pipeline.run(StartOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod coordinator;
pub mod emitter;
pub mod infrastructure;
pub mod pipeline;
pub mod queue;
pub mod trace;
pub mod worker;

pub use cancel::Cancel;
pub use pipeline::{CollectingHandle, CollectingPipeline, PipelineReport, SinkPipeline, StartOptions};
pub use queue::{Queue, Slot};
pub use trace::{TraceEntry, TraceEvent, TraceSink};

// Re-export the domain crate's public surface so a caller depending only
// on `stagepipe` still has everything needed to describe a pipeline.
pub use stagepipe_domain::{
    default_thread_ceiling, flat_transform, sink, source, transform, BoxFuture, Emit, FlatTransformFn, PipelineConfig,
    PipelineError, Signal, SignalKind, SinkFn, SinkStage, SourceFn, SourceStage, StageBody, StageIndex, StageKind,
    TransformFn, TransformStage, WorkerCount,
};
