// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Verbose Trace
//!
//! Every worker and the coordinator always log through `tracing` at
//! `debug`/`trace` level — that is the ambient, always-on observability
//! path, consistent with the rest of the workspace. [`TraceSink`] is the
//! opt-in, structured sibling of that: when a pipeline is started with
//! `verbose: true`, every lifecycle and item event is additionally recorded
//! in memory and handed back to the caller as part of the run's report,
//! which is what the test suite asserts against instead of scraping log
//! output.

use parking_lot::Mutex;

use stagepipe_domain::{PipelineError, StageIndex};

/// One recorded event.
#[derive(Debug, Clone)]
pub enum TraceEvent {
    Start,
    Stop,
    ItemProcessed,
    Error(String),
}

/// A single trace record: which stage, which worker, what happened.
#[derive(Debug, Clone)]
pub struct TraceEntry {
    pub stage: StageIndex,
    pub worker: usize,
    pub event: TraceEvent,
}

/// In-memory sink for verbose trace entries. Cheap to clone via `Arc`;
/// internal mutation is a single uncontended `parking_lot::Mutex`, which
/// only a worker or the coordinator ever touches, never on the hot item
/// path unless verbose tracing is on.
#[derive(Default)]
pub struct TraceSink {
    entries: Mutex<Vec<TraceEntry>>,
}

impl TraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, stage: StageIndex, worker: usize, event: TraceEvent) {
        tracing::debug!(%stage, worker, ?event, "pipeline event");
        self.entries.lock().push(TraceEntry { stage, worker, event });
    }

    pub fn record_error(&self, stage: StageIndex, worker: usize, error: &PipelineError) {
        self.record(stage, worker, TraceEvent::Error(error.to_string()));
    }

    /// A snapshot of every entry recorded so far.
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.lock().clone()
    }
}
