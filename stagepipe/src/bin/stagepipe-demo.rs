// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stagepipe Demo Binary
//!
//! A runnable example wiring the three workspace crates together: CLI
//! parsing, signal handling, and exit codes from `stagepipe_bootstrap`; the
//! topology types from `stagepipe_domain`; and the engine itself. The
//! pipeline is always the same three stages, sized by CLI flags:
//!
//! - **source** — counts up from `0` to `--item-count`;
//! - **transform** — doubles each number;
//! - **sink** — prints each result.
//!
//! `main` does not use `#[tokio::main]`: `n_jobs` (from `--config`/the
//! environment, overridden by `--n-jobs`) has to be known *before* the
//! Tokio runtime exists, so it can size that runtime's own worker-thread
//! count (`Builder::new_multi_thread().worker_threads(n)`) rather than
//! leaving it at Tokio's default. Everything from CLI parsing through
//! runtime construction is synchronous; only the pipeline run itself is
//! handed to `runtime.block_on`.
//!
//! Ctrl+C (or SIGTERM/SIGHUP) races the run: if a shutdown signal arrives
//! before the pipeline drains on its own, the process exits with
//! [`ExitCode::Interrupted`] without waiting for the source to finish
//! emitting. This mirrors the same race the bootstrap crate's own doc
//! examples describe, now with an actual pipeline on the other end of it.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use stagepipe::infrastructure::EngineSettings;
use stagepipe::pipeline::{SinkPipeline, StartOptions};
use stagepipe::{
    default_thread_ceiling, sink, source, transform, PipelineConfig, PipelineError, SinkStage, SourceStage, StageBody,
    TransformStage, WorkerCount,
};
use stagepipe_bootstrap::exit_code::ExitCode;
use stagepipe_bootstrap::shutdown::ShutdownToken;
use stagepipe_bootstrap::signals::{create_signal_handler, SystemSignals};
use stagepipe_bootstrap::{bootstrap_cli, ValidatedCommand};

fn build_config(
    item_count: usize,
    source_workers: usize,
    transform_workers: usize,
    sink_workers: usize,
) -> Result<PipelineConfig<u32>, PipelineError> {
    // Source workers share one counter, so `--source-workers` only changes
    // how many tasks race to pull from it, not how many items come out:
    // the pipeline still emits exactly `item_count` numbers in total.
    let counter = Arc::new(AtomicU32::new(0));
    let limit = item_count as u32;
    let emit_numbers = source(move |emit| {
        let counter = counter.clone();
        async move {
            loop {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n >= limit {
                    break;
                }
                emit.emit(n).await;
            }
            Ok(())
        }
    });

    let double = transform(|n: u32| async move { Ok(n * 2) });

    let print_sink = sink(|n: u32| async move {
        println!("{n}");
        Ok(())
    });

    Ok(PipelineConfig::new(
        SourceStage::new(emit_numbers, WorkerCount::new(source_workers)?),
        vec![TransformStage::new(StageBody::OneToOne(double), WorkerCount::new(transform_workers)?)],
        Some(SinkStage::new(print_sink, WorkerCount::new(sink_workers)?)),
    ))
}

fn main() -> std::process::ExitCode {
    let cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}");
            return to_process_exit_code(ExitCode::UsageError);
        }
    };

    if let Err(e) = stagepipe::infrastructure::init_tracing(cli.verbose) {
        eprintln!("warning: failed to install tracing subscriber: {e}");
    }

    let ValidatedCommand::Run { n_jobs, queue_capacity, item_count, source_workers, transform_workers, sink_workers } =
        cli.command;

    // Layered config (file, then `STAGEPIPE_*` env) supplies the defaults;
    // explicit CLI flags win over both when present.
    let mut opts = match EngineSettings::load(cli.config.as_deref()) {
        Ok(settings) => settings.into_start_options(),
        Err(err) => return exit_for_pipeline_error(&err),
    };
    if n_jobs.is_some() {
        opts.n_jobs = n_jobs;
    }
    if queue_capacity.is_some() {
        opts.queue_capacity = queue_capacity;
    }
    opts.verbose = opts.verbose || cli.verbose;

    let worker_threads = opts.n_jobs.unwrap_or_else(default_thread_ceiling).max(1);
    let runtime = match tokio::runtime::Builder::new_multi_thread().worker_threads(worker_threads).enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to build tokio runtime: {e}");
            return to_process_exit_code(ExitCode::OsError);
        }
    };

    runtime.block_on(run_pipeline(opts, item_count, source_workers, transform_workers, sink_workers))
}

async fn run_pipeline(
    opts: StartOptions,
    item_count: usize,
    source_workers: usize,
    transform_workers: usize,
    sink_workers: usize,
) -> std::process::ExitCode {
    let verbose = opts.verbose;

    let config = match build_config(item_count, source_workers, transform_workers, sink_workers) {
        Ok(config) => config,
        Err(err) => return exit_for_pipeline_error(&err),
    };

    let pipeline = match SinkPipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(err) => return exit_for_pipeline_error(&err),
    };

    let shutdown = ShutdownToken::new();
    let signal_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let handler = create_signal_handler();
            handler
                .wait_for_signal(Box::new(move || {
                    shutdown.request();
                }))
                .await;
        })
    };

    tokio::select! {
        result = pipeline.run(opts) => {
            signal_task.abort();
            match result {
                Ok(report) => {
                    if verbose {
                        for entry in &report.trace {
                            tracing::debug!(?entry, "trace entry");
                        }
                    }
                    to_process_exit_code(ExitCode::Success)
                }
                Err(err) => exit_for_pipeline_error(&err),
            }
        }
        _ = shutdown.wait() => {
            tracing::warn!("shutdown requested, exiting without waiting for the pipeline to drain");
            to_process_exit_code(ExitCode::Interrupted)
        }
    }
}

/// Maps a [`PipelineError`] to an [`ExitCode`]. Bootstrap carries no
/// dependency on the domain crate, so this mapping lives here, in the one
/// binary that depends on all three workspace crates.
fn exit_for_pipeline_error(err: &PipelineError) -> std::process::ExitCode {
    eprintln!("{err}");
    let code = if err.is_configuration_error() { ExitCode::Config } else { ExitCode::Software };
    to_process_exit_code(code)
}

fn to_process_exit_code(code: ExitCode) -> std::process::ExitCode {
    std::process::ExitCode::from(code.as_i32() as u8)
}
