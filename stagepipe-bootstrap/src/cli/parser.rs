// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parser
//!
//! Command-line interface parsing using clap.
//!
//! This module defines the CLI structure and handles argument parsing.
//! Security validation happens in the validator module after parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Main CLI structure
#[derive(Parser, Debug, Clone)]
#[command(name = "stagepipe")]
#[command(about = concat!("Stagepipe demo runner v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging and the in-memory trace sink
    #[arg(short, long)]
    pub verbose: bool,

    /// Engine settings file (TOML), layered under `STAGEPIPE_*` env vars
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the demo pipeline: a counting source, a doubling transform, and a
    /// printing sink, wired with the given worker counts.
    Run {
        /// Caps how many workers may run concurrently. Must cover every
        /// configured worker plus one slot for the coordinator.
        #[arg(long)]
        n_jobs: Option<usize>,

        /// Caps how many items may rest on each inter-stage queue at once.
        #[arg(long)]
        queue_capacity: Option<usize>,

        /// How many items the demo source emits.
        #[arg(long, default_value = "100")]
        item_count: usize,

        /// Worker count for the source stage.
        #[arg(long, default_value = "1")]
        source_workers: usize,

        /// Worker count for the doubling transform stage.
        #[arg(long, default_value = "1")]
        transform_workers: usize,

        /// Worker count for the sink stage.
        #[arg(long, default_value = "1")]
        sink_workers: usize,
    },
}

/// Parse CLI arguments
///
/// This is the entry point for CLI parsing. It uses clap to parse
/// arguments and returns the parsed CLI structure.
///
/// # Panics
///
/// Clap will exit the process with an appropriate error message if parsing
/// fails.
pub fn parse_cli() -> Cli {
    Cli::parse()
}
