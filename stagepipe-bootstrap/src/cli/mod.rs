// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with a parse-then-validate split.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse_cli()             │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validate_cli()                  │  Argument validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Argument validation layer

pub mod parser;
pub mod validator;

use std::path::PathBuf;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

/// Upper bound on a single stage's worker count; keeps a typo'd CLI flag
/// from spawning an unreasonable number of tokio tasks.
const MAX_WORKERS: u32 = 1024;

/// Validated CLI configuration
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

/// Validated command variants
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Run {
        n_jobs: Option<usize>,
        queue_capacity: Option<usize>,
        item_count: usize,
        source_workers: usize,
        transform_workers: usize,
        sink_workers: usize,
    },
}

/// Parse and validate CLI arguments
///
/// # Errors
///
/// Returns `ParseError` if any validation fails
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

/// Validate parsed CLI arguments
fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    if let Some(ref path) = cli.config {
        SecureArgParser::validate_argument(&path.to_string_lossy())?;
    }

    let command = match cli.command {
        Commands::Run {
            n_jobs,
            queue_capacity,
            item_count,
            source_workers,
            transform_workers,
            sink_workers,
        } => {
            if let Some(n) = n_jobs {
                SecureArgParser::validate_number("n-jobs", n as u32, Some(1), None)?;
            }
            if let Some(cap) = queue_capacity {
                SecureArgParser::validate_number("queue-capacity", cap as u32, Some(1), None)?;
            }
            SecureArgParser::validate_number("item-count", item_count as u32, Some(1), None)?;
            SecureArgParser::validate_number("source-workers", source_workers as u32, Some(1), Some(MAX_WORKERS))?;
            SecureArgParser::validate_number(
                "transform-workers",
                transform_workers as u32,
                Some(1),
                Some(MAX_WORKERS),
            )?;
            SecureArgParser::validate_number("sink-workers", sink_workers as u32, Some(1), Some(MAX_WORKERS))?;

            ValidatedCommand::Run {
                n_jobs,
                queue_capacity,
                item_count,
                source_workers,
                transform_workers,
                sink_workers,
            }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config: cli.config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_cli(source_workers: usize, transform_workers: usize, sink_workers: usize) -> Cli {
        Cli {
            command: Commands::Run {
                n_jobs: Some(4),
                queue_capacity: None,
                item_count: 10,
                source_workers,
                transform_workers,
                sink_workers,
            },
            verbose: false,
            config: None,
        }
    }

    #[test]
    fn accepts_reasonable_worker_counts() {
        let validated = validate_cli(run_cli(1, 2, 1)).unwrap();
        assert!(matches!(
            validated.command,
            ValidatedCommand::Run { transform_workers: 2, .. }
        ));
    }

    #[test]
    fn rejects_zero_workers() {
        let err = validate_cli(run_cli(0, 1, 1)).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_absurd_worker_counts() {
        let err = validate_cli(run_cli(1, 1, 100_000)).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { .. }));
    }
}
