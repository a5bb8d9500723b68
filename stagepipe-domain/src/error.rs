// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the error type shared by every layer of the staged
//! pipeline engine. It follows the project's layering discipline: domain
//! errors are plain data (no I/O, no `anyhow`), and every fallible operation
//! in the engine, the bootstrap layer, and the demo binary returns or wraps
//! one of these variants.
//!
//! ## Error Categories
//!
//! - **Configuration errors** — raised synchronously from [`crate::entities::PipelineConfig`]
//!   construction, before a single worker is spawned.
//! - **Stage errors** — a user-supplied source/transform/sink function failed;
//!   captured by the worker wrapper and tagged with the stage and worker that
//!   produced it.
//! - **Protocol errors** — the coordinator observed something the termination
//!   protocol does not define (an unknown signal, a queue closed twice).
//! - **Resource errors** — the configured worker count could not be scheduled.

use thiserror::Error;

/// Errors produced by the staged pipeline engine.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// Raised at construction time: empty source list, a zero worker count,
    /// or a worker count that exceeds the configured ceiling.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A source, transform, or sink function returned an error. `stage`
    /// identifies the stage kind and position, `worker` the worker index
    /// within that stage.
    #[error("stage {stage} worker {worker} failed: {source}")]
    StageFailed {
        stage: String,
        worker: usize,
        #[source]
        source: Box<PipelineError>,
    },

    /// The coordinator received a signal it does not know how to interpret,
    /// or observed a queue being closed more than once.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The executor could not provide enough concurrent capacity for the
    /// configured workers plus the coordinator.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Wraps an arbitrary failure surfaced by a user-supplied stage
    /// function. Kept distinct from `StageFailed` so user code can produce
    /// it directly without knowing its own stage/worker index.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    /// Configuration loading (env/file layering) failed.
    #[error("configuration load error: {0}")]
    ConfigLoad(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    pub fn protocol_violation(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wraps `self` as the cause of a stage failure at `stage`/`worker`.
    pub fn into_stage_failure(self, stage: impl Into<String>, worker: usize) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            worker,
            source: Box::new(self),
        }
    }

    /// Whether this error represents a configuration-class failure — the
    /// caller never started a pipeline.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::InvalidConfiguration(_) | Self::ResourceExhausted(_))
    }
}
