// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Count Value Object
//!
//! A validated, immutable count of concurrent workers assigned to a single
//! stage. `WorkerCount` is the type-safe form of the "n" in "n workers for
//! this stage" — it can never be zero, and construction against a known CPU
//! ceiling is how [`crate::entities::PipelineConfig`] rejects
//! oversubscribed configurations before a single worker runs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PipelineError;

/// Validated worker count for one stage.
///
/// Two constructors exist for two different failure policies: [`WorkerCount::new`]
/// only enforces the "at least one" invariant every stage needs;
/// [`WorkerCount::within_ceiling`] additionally rejects counts above a
/// hardware-derived ceiling, which is what pipeline construction uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerCount(usize);

impl WorkerCount {
    /// Default worker count when the caller does not specify one.
    pub const DEFAULT: usize = 1;

    /// Creates a worker count, rejecting zero.
    pub fn new(count: usize) -> Result<Self, PipelineError> {
        if count == 0 {
            return Err(PipelineError::invalid_config("worker count must be at least 1"));
        }
        Ok(Self(count))
    }

    /// Creates a worker count, additionally rejecting values above `ceiling`.
    ///
    /// `ceiling` is normally the number of hardware threads available to the
    /// process (see [`crate::value_objects::default_thread_ceiling`]).
    pub fn within_ceiling(count: usize, ceiling: usize) -> Result<Self, PipelineError> {
        let worker_count = Self::new(count)?;
        if count > ceiling {
            return Err(PipelineError::invalid_config(format!(
                "worker count {count} exceeds the configured ceiling of {ceiling} concurrent workers"
            )));
        }
        Ok(worker_count)
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} worker(s)", self.0)
    }
}

impl TryFrom<usize> for WorkerCount {
    type Error = PipelineError;

    fn try_from(count: usize) -> Result<Self, Self::Error> {
        Self::new(count)
    }
}

impl From<WorkerCount> for usize {
    fn from(worker_count: WorkerCount) -> Self {
        worker_count.0
    }
}

/// The default worker-count ceiling: the number of hardware threads visible
/// to the process, falling back to 1 if that cannot be determined.
pub fn default_thread_ceiling() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
