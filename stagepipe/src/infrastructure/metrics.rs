// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Metrics
//!
//! An opt-in Prometheus counterpart to [`crate::trace::TraceSink`]:
//! [`PipelineMetrics`] is constructed against a caller-supplied
//! `prometheus::Registry` and threaded through the worker wrappers and
//! coordinator the same way the trace sink is (an `Option<Arc<_>>`, never
//! a global). This keeps the engine's observability ambient — present
//! whenever a caller wants it — without introducing the process-wide
//! singleton §9 explicitly rules out.

use prometheus::{IntCounter, IntGauge, Registry};

use stagepipe_domain::PipelineError;

/// Prometheus counters and gauges for one pipeline run.
pub struct PipelineMetrics {
    pub items_processed_total: IntCounter,
    pub stage_errors_total: IntCounter,
    pub workers_active: IntGauge,
}

impl PipelineMetrics {
    /// Creates and registers this run's metrics against `registry`.
    pub fn new(registry: &Registry) -> Result<Self, PipelineError> {
        let items_processed_total = IntCounter::new("stagepipe_items_processed_total", "Items processed by any stage")
            .map_err(|err| PipelineError::internal(err.to_string()))?;
        let stage_errors_total = IntCounter::new("stagepipe_stage_errors_total", "Stage-function failures observed")
            .map_err(|err| PipelineError::internal(err.to_string()))?;
        let workers_active = IntGauge::new("stagepipe_workers_active", "Workers currently running")
            .map_err(|err| PipelineError::internal(err.to_string()))?;

        registry
            .register(Box::new(items_processed_total.clone()))
            .map_err(|err| PipelineError::internal(err.to_string()))?;
        registry
            .register(Box::new(stage_errors_total.clone()))
            .map_err(|err| PipelineError::internal(err.to_string()))?;
        registry
            .register(Box::new(workers_active.clone()))
            .map_err(|err| PipelineError::internal(err.to_string()))?;

        Ok(Self {
            items_processed_total,
            stage_errors_total,
            workers_active,
        })
    }

    pub fn record_worker_start(&self) {
        self.workers_active.inc();
    }

    pub fn record_worker_stop(&self) {
        self.workers_active.dec();
    }

    pub fn record_item_processed(&self) {
        self.items_processed_total.inc();
    }

    pub fn record_error(&self) {
        self.stage_errors_total.inc();
    }
}
