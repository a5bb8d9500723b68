// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stagepipe Domain
//!
//! The domain layer of the staged pipeline engine: value objects, entities,
//! and the shared error type. Nothing in this crate touches a thread, a
//! queue, or an async runtime — it describes *what a pipeline is*, not how
//! one runs. The `stagepipe` crate depends on this one and supplies the
//! runtime that turns a [`entities::PipelineConfig`] into running workers.
//!
//! Layering mirrors the rest of the workspace: this crate may depend on
//! `serde` and `thiserror` (pure data concerns) but never on `tokio`,
//! `config`, or any other infrastructure crate. A `From` conversion for an
//! infrastructure error type (e.g. `config::ConfigError`) belongs in the
//! crate that owns that dependency, not here.

pub mod entities;
pub mod error;
pub mod value_objects;

pub use entities::{
    flat_transform, sink, source, transform, BoxFuture, Emit, FlatTransformFn, PipelineConfig, SinkFn, SinkStage,
    SourceFn, SourceStage, StageBody, StageKind, TransformFn, TransformStage,
};
pub use error::PipelineError;
pub use value_objects::{default_thread_ceiling, Signal, SignalKind, StageIndex, WorkerCount};
