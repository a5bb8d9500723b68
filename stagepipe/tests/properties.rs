// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Property tests for the invariants a staged pipeline must hold regardless
//! of item count or worker-count vector: count conservation, the
//! permutation relationship between input and output, and independence of
//! the output multiset from how many workers ran each stage.
//!
//! `proptest` drives the synchronous `#[test]` functions below; each case
//! spins its own single-threaded Tokio runtime rather than relying on
//! `#[tokio::test]`, since `proptest!` generates plain functions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use proptest::prelude::*;
use tokio::sync::mpsc;

use stagepipe::coordinator::Coordinator;
use stagepipe::pipeline::{CollectingPipeline, StartOptions};
use stagepipe::{
    default_thread_ceiling, source, transform, Cancel, PipelineConfig, Queue, Signal, Slot, SourceStage, StageBody,
    StageIndex, TransformStage, WorkerCount,
};

/// Clamps a generated worker count to the machine's hardware-thread ceiling
/// so these proptest cases stay portable: `PipelineConfig::validate` rejects
/// any stage that oversubscribes it, regardless of how many cores the box
/// running the suite happens to have.
fn clamped(workers: usize) -> usize {
    workers.min(default_thread_ceiling())
}

fn run_chain(item_count: u32, source_workers: usize, transform_workers: Vec<usize>) -> Vec<u32> {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async move {
        let emit_source = source(move |emit| async move {
            for i in 0..item_count {
                emit.emit(i).await;
            }
            Ok(())
        });

        let transforms = transform_workers
            .into_iter()
            .map(|workers| {
                TransformStage::new(
                    StageBody::OneToOne(transform(|n: u32| async move { Ok(n) })),
                    WorkerCount::new(clamped(workers)).unwrap(),
                )
            })
            .collect();

        let config = PipelineConfig::new(
            SourceStage::new(emit_source, WorkerCount::new(clamped(source_workers)).unwrap()),
            transforms,
            None,
        );

        let pipeline = CollectingPipeline::new(config).unwrap();
        let handle = pipeline.run(StartOptions::default()).unwrap();
        let results: Vec<u32> = handle.stream.collect().await;
        handle.report().await.unwrap();
        results
    })
}

fn multiset(items: &[u32]) -> HashMap<u32, usize> {
    let mut counts = HashMap::new();
    for &item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
}

fn stage_for_slot(slot: usize, transform_count: usize) -> StageIndex {
    if slot == 0 {
        StageIndex::SOURCE
    } else if slot <= transform_count {
        StageIndex::transform(slot - 1)
    } else {
        StageIndex::sink(transform_count)
    }
}

proptest! {
    /// Count conservation: a pure source emitting exactly `n` items through
    /// any chain of one-arg transforms, with no sink, yields exactly `n`
    /// items to the caller.
    #[test]
    fn count_is_conserved(n in 0u32..50, transform_count in 0usize..4) {
        let results = run_chain(n, 1, vec![1; transform_count]);
        prop_assert_eq!(results.len(), n as usize);
    }

    /// Permutation-of-image: with one worker per stage, the collected
    /// output is exactly the input (every transform here is the identity),
    /// not merely the same length.
    #[test]
    fn single_worker_preserves_order(n in 0u32..30) {
        let results = run_chain(n, 1, vec![1, 1]);
        let expected: Vec<u32> = (0..n).collect();
        prop_assert_eq!(results, expected);
    }

    /// Independence from worker count: the output *multiset* does not
    /// depend on how many workers ran the source or the transform, only on
    /// what was fed in — ordering may vary, membership and counts may not.
    /// Each of `source_workers` independent source workers emits the full
    /// `0..n` range, so every value in `0..n` appears exactly
    /// `source_workers` times in the output, regardless of how many
    /// transform workers processed it.
    #[test]
    fn output_multiset_is_independent_of_worker_count(
        n in 1u32..40,
        source_workers in 1usize..4,
        transform_workers in 1usize..4,
    ) {
        let source_workers = clamped(source_workers);
        let results = run_chain(n, source_workers, vec![transform_workers]);

        let mut expected_counts = HashMap::new();
        for i in 0..n {
            expected_counts.insert(i, source_workers);
        }
        prop_assert_eq!(multiset(&results), expected_counts);
    }

    /// EOS uniqueness: whatever shape the pipeline has and whatever order
    /// its workers happen to report `Stop` in, the coordinator pushes
    /// exactly one `Eos` onto each queue — never zero (a hung downstream
    /// stage) and never two (a downstream worker waking up a second time
    /// expecting an item and finding a bare marker instead).
    #[test]
    fn coordinator_closes_every_queue_exactly_once(
        jobs in prop::collection::vec(1usize..=3usize, 2..=5),
        keys in prop::collection::vec(any::<u32>(), 20),
    ) {
        let transform_count = jobs.len() - 2;
        let queue_count = jobs.len() - 1;

        let mut stops: Vec<StageIndex> = Vec::new();
        for (slot, &count) in jobs.iter().enumerate() {
            let stage = stage_for_slot(slot, transform_count);
            stops.extend(std::iter::repeat(stage).take(count));
        }
        // Reorder the stops with the proptest-provided key stream so each
        // run exercises a different interleaving of worker completions.
        let mut keyed: Vec<(u32, StageIndex)> =
            stops.into_iter().enumerate().map(|(i, stage)| (keys[i % keys.len()], stage)).collect();
        keyed.sort_by_key(|(key, _)| *key);
        let stops: Vec<StageIndex> = keyed.into_iter().map(|(_, stage)| stage).collect();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let queues: Arc<Vec<Arc<Queue<u32>>>> =
                Arc::new((0..queue_count).map(|_| Arc::new(Queue::new(None))).collect());
            let (signal_tx, signal_rx) = mpsc::unbounded_channel();
            let (_error_tx, error_rx) = mpsc::unbounded_channel();

            for stage in &stops {
                signal_tx.send(Signal::stop(*stage)).unwrap();
            }
            drop(signal_tx);

            let coordinator = Coordinator::new(jobs.clone(), queues.clone(), signal_rx, error_rx, Cancel::new());
            coordinator.run().await;

            for queue in queues.iter() {
                let first = queue.dequeue().await;
                prop_assert!(matches!(first, Slot::Eos));
                let second = tokio::time::timeout(Duration::from_millis(5), queue.dequeue()).await;
                prop_assert!(second.is_err(), "a second Eos or item arrived on an already-closed queue");
            }
            Ok(())
        })?;
    }
}
