// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Full-pipeline scenario tests exercised against the public API, one per
//! scenario a staged pipeline needs to get right: a plain chain, workers
//! sharing a stage, workers sharing the source, a sink in place of a
//! collector, the fan-out transform shape, and a fatal error mid-run.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;

use stagepipe::pipeline::{CollectingPipeline, SinkPipeline, StartOptions};
use stagepipe::{default_thread_ceiling, flat_transform, sink, source, transform, PipelineConfig, PipelineError};
use stagepipe::{SinkStage, SourceStage, StageBody, TransformStage, WorkerCount};

/// Two workers is the point of "parallel workers on one stage" scenarios,
/// but `PipelineConfig::validate` rejects a stage that oversubscribes the
/// machine's hardware threads — fall back to one worker on a single-core
/// box rather than have the scenario fail there.
fn parallel_workers() -> WorkerCount {
    WorkerCount::new(default_thread_ceiling().min(2)).unwrap()
}

fn counting_source(n: u32) -> stagepipe_domain::SourceFn<u32> {
    source(move |emit| async move {
        for i in 0..n {
            emit.emit(i).await;
        }
        Ok(())
    })
}

#[tokio::test]
async fn scenario_1_single_thread_happy_path() {
    let config = PipelineConfig::new(
        SourceStage::new(counting_source(10), WorkerCount::new(1).unwrap()),
        vec![
            TransformStage::new(StageBody::OneToOne(transform(|n: u32| async move { Ok(n * 2) })), WorkerCount::new(1).unwrap()),
            TransformStage::new(StageBody::OneToOne(transform(|n: u32| async move { Ok(n / 2) })), WorkerCount::new(1).unwrap()),
        ],
        None,
    );

    // Three workers total (source, two transforms); capacity must also
    // cover the coordinator's own slot.
    let pipeline = CollectingPipeline::new(config).unwrap();
    let handle = pipeline.run(StartOptions { n_jobs: Some(4), ..Default::default() }).unwrap();
    let mut results: Vec<u32> = handle.stream.collect().await;
    results.sort_unstable();

    let mut expected: Vec<u32> = (0..10).collect();
    expected.sort_unstable();
    assert_eq!(results, expected);
    assert!(handle.report().await.unwrap().trace.is_empty());
}

#[tokio::test]
async fn scenario_2_parallel_workers_on_one_stage() {
    let config = PipelineConfig::new(
        SourceStage::new(counting_source(10), WorkerCount::new(1).unwrap()),
        vec![
            TransformStage::new(StageBody::OneToOne(transform(|n: u32| async move { Ok(n * 2) })), parallel_workers()),
            TransformStage::new(StageBody::OneToOne(transform(|n: u32| async move { Ok(n / 2) })), WorkerCount::new(1).unwrap()),
        ],
        None,
    );

    // Four workers total (source, transform #1 x2, transform #2); plus one
    // slot for the coordinator.
    let pipeline = CollectingPipeline::new(config).unwrap();
    let handle = pipeline.run(StartOptions { n_jobs: Some(5), ..Default::default() }).unwrap();
    let mut results: Vec<u32> = handle.stream.collect().await;
    results.sort_unstable();

    let mut expected: Vec<u32> = (0..10).collect();
    expected.sort_unstable();
    assert_eq!(results, expected);
    handle.report().await.unwrap();
}

#[tokio::test]
async fn scenario_3_parallel_sources() {
    let config = PipelineConfig::new(
        SourceStage::new(counting_source(10), parallel_workers()),
        vec![TransformStage::new(
            StageBody::OneToOne(transform(|n: u32| async move { Ok(n) })),
            WorkerCount::new(1).unwrap(),
        )],
        None,
    );

    let source_workers = parallel_workers().get();
    let pipeline = CollectingPipeline::new(config).unwrap();
    let handle = pipeline.run(StartOptions { n_jobs: Some(4), ..Default::default() }).unwrap();
    let results: Vec<u32> = handle.stream.collect().await;

    assert_eq!(results.len(), 10 * source_workers);
    handle.report().await.unwrap();
}

#[tokio::test]
async fn scenario_4_sink_replaces_collector() {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let collected2 = collected.clone();
    let print_sink = sink(move |n: u32| {
        let collected = collected2.clone();
        async move {
            collected.lock().push(n);
            Ok(())
        }
    });

    let config = PipelineConfig::new(
        SourceStage::new(counting_source(10), WorkerCount::new(1).unwrap()),
        vec![
            TransformStage::new(StageBody::OneToOne(transform(|n: u32| async move { Ok(n * 2) })), WorkerCount::new(1).unwrap()),
            TransformStage::new(StageBody::OneToOne(transform(|n: u32| async move { Ok(n / 2) })), WorkerCount::new(1).unwrap()),
        ],
        Some(SinkStage::new(print_sink, WorkerCount::new(1).unwrap())),
    );

    let pipeline = SinkPipeline::new(config).unwrap();
    let report = pipeline.run(StartOptions::default()).await.unwrap();
    assert!(report.trace.is_empty());

    let mut observed = collected.lock().clone();
    observed.sort_unstable();
    assert_eq!(observed.len(), 10);
}

#[tokio::test]
async fn scenario_5_fan_out_transform_two_arg_form() {
    let fan_out = flat_transform(|n: u32, emit: Arc<dyn stagepipe_domain::Emit<u32>>| async move {
        emit.emit(n).await;
        emit.emit(n).await;
        Ok(())
    });

    let config = PipelineConfig::new(
        SourceStage::new(counting_source(5), WorkerCount::new(1).unwrap()),
        vec![TransformStage::new(StageBody::OneToMany(fan_out), WorkerCount::new(1).unwrap())],
        None,
    );

    let pipeline = CollectingPipeline::new(config).unwrap();
    let handle = pipeline.run(StartOptions::default()).unwrap();
    let results: Vec<u32> = handle.stream.collect().await;

    assert_eq!(results.len(), 10);
    handle.report().await.unwrap();
}

#[tokio::test]
async fn scenario_6_user_function_error_fails_fast() {
    let seen = Arc::new(AtomicU32::new(0));
    let seen2 = seen.clone();
    // Fails on the third item (index 2); any item processed after that one
    // would mean the worker kept draining the queue instead of stopping.
    let flaky = transform(move |n: u32| {
        let seen = seen2.clone();
        async move {
            let count = seen.fetch_add(1, Ordering::SeqCst);
            if count == 2 {
                Err(PipelineError::processing_failed("boom on the third item"))
            } else {
                Ok(n)
            }
        }
    });

    let config = PipelineConfig::new(
        SourceStage::new(counting_source(100), WorkerCount::new(1).unwrap()),
        vec![
            TransformStage::new(StageBody::OneToOne(transform(|n: u32| async move { Ok(n) })), WorkerCount::new(1).unwrap()),
            TransformStage::new(StageBody::OneToOne(flaky), WorkerCount::new(1).unwrap()),
        ],
        None,
    );

    let pipeline = CollectingPipeline::new(config).unwrap();
    let handle = pipeline.run(StartOptions::default()).unwrap();
    let _results: Vec<u32> = handle.stream.collect().await;
    let err = handle.report().await.unwrap_err();
    assert!(matches!(err, PipelineError::StageFailed { .. }));
}
