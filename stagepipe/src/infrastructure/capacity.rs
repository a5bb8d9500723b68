// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Execution Capacity
//!
//! The design's `n_jobs` (§4.4, §6 of the spec) is a hint bounding how
//! many workers may run concurrently, with an explicit warning that
//! under-provisioning risks deadlock (§5): "an implementation that cannot
//! schedule them all concurrently may deadlock because workers block on
//! queues."
//!
//! This engine's workers are `tokio` tasks rather than OS threads or
//! processes: a queue wait suspends the task via `tokio::sync::Notify`,
//! not the underlying OS thread, so `tokio`'s scheduler multiplexes many
//! blocked workers cheaply over a small thread pool. There is no internal
//! admission gate to size, and gating task admission with a semaphore
//! would reintroduce the exact deadlock §5 warns about — a too-small gate
//! could block a worker forever while it holds a permit a sibling stage
//! needs to make progress.
//!
//! Instead, [`validate_capacity`] performs the one check that *is*
//! meaningful: it fails fast, before any worker is spawned, if the
//! caller-supplied `n_jobs` cannot cover every configured worker plus the
//! coordinator — the same headroom the reference implementation
//! (`orkan.pipeline`) hard-codes by sizing its process pool at
//! `n_jobs + 1`. Passing `n_jobs: None` skips the check entirely: an
//! unset hint places no ceiling on concurrency.

use stagepipe_domain::PipelineError;

/// Fails with [`PipelineError::ResourceExhausted`] if `n_jobs` cannot
/// cover `total_workers` workers plus one slot for the coordinator.
pub fn validate_capacity(n_jobs: Option<usize>, total_workers: usize) -> Result<(), PipelineError> {
    let Some(n_jobs) = n_jobs else {
        return Ok(());
    };
    let required = total_workers + 1;
    if n_jobs < required {
        return Err(PipelineError::resource_exhausted(format!(
            "n_jobs={n_jobs} cannot provide concurrent execution capacity for {total_workers} worker(s) plus the \
             coordinator ({required} slots required)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_rejects() {
        assert!(validate_capacity(None, 1_000).is_ok());
    }

    #[test]
    fn accepts_exact_fit() {
        assert!(validate_capacity(Some(5), 4).is_ok());
    }

    #[test]
    fn rejects_undersized() {
        let err = validate_capacity(Some(3), 4).unwrap_err();
        assert!(err.is_configuration_error());
    }
}
