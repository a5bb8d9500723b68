// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Entities: the pipeline's own structural description. Unlike the value
//! objects module, [`PipelineConfig`] and its stages are generic over the
//! caller's item type and carry function pointers rather than plain data —
//! but they still have no notion of a runtime, a queue implementation, or a
//! thread. See [`stage_fn`] for the function contracts and the [`Emit`]
//! port a source or flat transform is given.

pub mod pipeline_config;
pub mod stage_fn;
pub mod stage_kind;

pub use pipeline_config::{PipelineConfig, SinkStage, SourceStage, TransformStage};
pub use stage_fn::{flat_transform, sink, source, transform, BoxFuture, Emit, FlatTransformFn, SinkFn, SourceFn, StageBody, TransformFn};
pub use stage_kind::StageKind;
