// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Configuration
//!
//! [`PipelineConfig`] is the fully-validated, immutable description of a
//! pipeline's topology: one source, zero or more transforms in series, and
//! an optional sink. It is built once, before any worker runs, and handed
//! by value to the engine that turns it into queues, workers, and a
//! coordinator. Nothing in this crate knows how to run a pipeline — that is
//! the engine crate's job. This crate only knows how to describe one
//! correctly, and to refuse to describe an inconsistent one.
//!
//! Topology is linear by construction: a `Vec<TransformStage<T>>` has no
//! way to express branching or rejoining, which matches the design's
//! restriction to source → transform[0..k) → sink|collector chains.

use crate::entities::stage_fn::{SinkFn, SourceFn, StageBody};
use crate::error::PipelineError;
use crate::value_objects::{default_thread_ceiling, WorkerCount};

/// The source stage: produces items, assigned `workers` concurrent tasks.
///
/// More than one worker on a source is legal — each worker runs the same
/// function independently and concurrently, racing to emit onto the first
/// transform's (or sink's) queue. This is how the design's "parallel
/// sources" scenario is expressed: not as a distinct stage kind, but as a
/// source stage with `workers > 1`.
#[derive(Clone)]
pub struct SourceStage<T> {
    pub function: SourceFn<T>,
    pub workers: WorkerCount,
}

impl<T> SourceStage<T> {
    pub fn new(function: SourceFn<T>, workers: WorkerCount) -> Self {
        Self { function, workers }
    }
}

/// One transform stage: a [`StageBody`] (one-to-one or one-to-many) and its
/// assigned worker count.
#[derive(Clone)]
pub struct TransformStage<T> {
    pub body: StageBody<T>,
    pub workers: WorkerCount,
}

impl<T> TransformStage<T> {
    pub fn new(body: StageBody<T>, workers: WorkerCount) -> Self {
        Self { body, workers }
    }
}

/// The optional sink stage. A pipeline built without one is a *collecting*
/// pipeline: its final queue's output is handed back to the caller instead
/// of being consumed in-process.
#[derive(Clone)]
pub struct SinkStage<T> {
    pub function: SinkFn<T>,
    pub workers: WorkerCount,
}

impl<T> SinkStage<T> {
    pub fn new(function: SinkFn<T>, workers: WorkerCount) -> Self {
        Self { function, workers }
    }
}

/// A fully-described, linear pipeline topology.
#[derive(Clone)]
pub struct PipelineConfig<T> {
    pub source: SourceStage<T>,
    pub transforms: Vec<TransformStage<T>>,
    pub sink: Option<SinkStage<T>>,
}

impl<T> PipelineConfig<T> {
    pub fn new(source: SourceStage<T>, transforms: Vec<TransformStage<T>>, sink: Option<SinkStage<T>>) -> Self {
        Self { source, transforms, sink }
    }

    /// Number of transform stages, `k` in the design's indexing convention.
    pub fn transform_count(&self) -> usize {
        self.transforms.len()
    }

    /// Number of queues the topology requires: one per transform stage plus
    /// one downstream of the source, i.e. `k + 1` — the sink, when present,
    /// drains the last of these rather than owning one of its own.
    pub fn queue_count(&self) -> usize {
        self.transforms.len() + 1
    }

    /// Number of distinct job-count slots the coordinator must track: one
    /// per transform stage plus the source (`queue_count`), plus one more
    /// when a sink stage is present. A collecting pipeline (no sink) has no
    /// slot past its last transform — the coordinator's final `Eos` push
    /// onto the last queue *is* the termination signal for whatever drains
    /// that queue.
    pub fn job_slot_count(&self) -> usize {
        self.queue_count() + self.sink.is_some() as usize
    }

    /// Rejects topologies this crate cannot express correctly. Checks every
    /// stage's worker count against [`default_thread_ceiling`] — a single
    /// stage oversubscribing the machine's hardware threads is rejected
    /// here, synchronously, before any worker is spawned, rather than left
    /// to degrade silently at run time.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let ceiling = default_thread_ceiling();
        WorkerCount::within_ceiling(self.source.workers.get(), ceiling)?;
        for stage in &self.transforms {
            WorkerCount::within_ceiling(stage.workers.get(), ceiling)?;
        }
        if let Some(sink) = &self.sink {
            WorkerCount::within_ceiling(sink.workers.get(), ceiling)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::stage_fn::{sink, source, transform};

    fn noop_source() -> SourceFn<u32> {
        source(|_emit| async move { Ok(()) })
    }

    #[test]
    fn validate_accepts_worker_counts_within_the_ceiling() {
        let ceiling = default_thread_ceiling();
        let config = PipelineConfig::new(
            SourceStage::new(noop_source(), WorkerCount::new(ceiling).unwrap()),
            vec![],
            None,
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_a_stage_oversubscribing_the_ceiling() {
        let ceiling = default_thread_ceiling();
        let config = PipelineConfig::new(
            SourceStage::new(noop_source(), WorkerCount::new(ceiling + 1).unwrap()),
            vec![],
            None,
        );
        let err = config.validate().unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn validate_checks_transform_and_sink_stages_too() {
        let ceiling = default_thread_ceiling();
        let oversubscribed = WorkerCount::new(ceiling + 1).unwrap();

        let transform_over = PipelineConfig::new(
            SourceStage::new(noop_source(), WorkerCount::new(1).unwrap()),
            vec![TransformStage::new(
                StageBody::OneToOne(transform(|n: u32| async move { Ok(n) })),
                oversubscribed,
            )],
            None,
        );
        assert!(transform_over.validate().is_err());

        let sink_over = PipelineConfig::new(
            SourceStage::new(noop_source(), WorkerCount::new(1).unwrap()),
            vec![],
            Some(SinkStage::new(sink(|_: u32| async move { Ok(()) }), oversubscribed)),
        );
        assert!(sink_over.validate().is_err());
    }
}
