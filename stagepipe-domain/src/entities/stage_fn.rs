// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Function Contracts
//!
//! The external interface a caller implements against (§6 of the design):
//!
//! - a **source** is `(emit) -> Result<(), PipelineError>`, calling `emit`
//!   zero or more times;
//! - a **transform**, one-arg form, is `(item) -> Result<item, PipelineError>`
//!   — exactly one output per input;
//! - a **transform**, flat form, is `(item, emit) -> Result<(), PipelineError>`
//!   — zero or more outputs per input, via `emit`;
//! - a **sink** is `(item) -> Result<(), PipelineError>`.
//!
//! The runtime this crate targets has no reliable way to distinguish a
//! one-argument user closure from a two-argument one at registration time,
//! so — per the design's guidance for statically typed targets — the two
//! transform shapes are separate registration entry points
//! ([`transform`] and [`flat_transform`]) rather than one overloaded call.
//! The choice is baked into [`crate::entities::StageBody`] at construction
//! and never re-inspected per call.
//!
//! [`Emit`] is the one capability a source or flat transform receives: a
//! write-only handle onto "the next queue downstream", without that queue's
//! concrete type leaking into this crate. The engine crate supplies the
//! implementation backed by its own queue.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::PipelineError;

/// A boxed, owned future — the common currency between this crate's
/// function-pointer-style stage contracts and the `async fn` bodies callers
/// write.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Capability passed to sources and flat transforms: enqueues one item onto
/// the downstream queue. Implemented by the engine crate; this crate only
/// describes the port.
pub trait Emit<T>: Send + Sync {
    fn emit(&self, item: T) -> BoxFuture<'static, ()>;
}

/// `(emit) -> Result<(), PipelineError>`
pub type SourceFn<T> = Arc<dyn Fn(Arc<dyn Emit<T>>) -> BoxFuture<'static, Result<(), PipelineError>> + Send + Sync>;

/// `(item) -> Result<item, PipelineError>`
pub type TransformFn<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<T, PipelineError>> + Send + Sync>;

/// `(item, emit) -> Result<(), PipelineError>`
pub type FlatTransformFn<T> =
    Arc<dyn Fn(T, Arc<dyn Emit<T>>) -> BoxFuture<'static, Result<(), PipelineError>> + Send + Sync>;

/// `(item) -> Result<(), PipelineError>`
pub type SinkFn<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<(), PipelineError>> + Send + Sync>;

/// Registers a source function from an `async fn`/closure.
pub fn source<T, F, Fut>(f: F) -> SourceFn<T>
where
    T: Send + 'static,
    F: Fn(Arc<dyn Emit<T>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), PipelineError>> + Send + 'static,
{
    Arc::new(move |emit| Box::pin(f(emit)) as BoxFuture<'static, Result<(), PipelineError>>)
}

/// Registers a one-arg transform: exactly one output per input.
pub fn transform<T, F, Fut>(f: F) -> TransformFn<T>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, PipelineError>> + Send + 'static,
{
    Arc::new(move |item| Box::pin(f(item)) as BoxFuture<'static, Result<T, PipelineError>>)
}

/// Registers a flat transform: zero or more outputs per input, via `emit`.
pub fn flat_transform<T, F, Fut>(f: F) -> FlatTransformFn<T>
where
    T: Send + 'static,
    F: Fn(T, Arc<dyn Emit<T>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), PipelineError>> + Send + 'static,
{
    Arc::new(move |item, emit| Box::pin(f(item, emit)) as BoxFuture<'static, Result<(), PipelineError>>)
}

/// Registers a sink function.
pub fn sink<T, F, Fut>(f: F) -> SinkFn<T>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), PipelineError>> + Send + 'static,
{
    Arc::new(move |item| Box::pin(f(item)) as BoxFuture<'static, Result<(), PipelineError>>)
}

/// The two shapes a transform stage's body can take, fixed at registration.
#[derive(Clone)]
pub enum StageBody<T> {
    OneToOne(TransformFn<T>),
    OneToMany(FlatTransformFn<T>),
}
