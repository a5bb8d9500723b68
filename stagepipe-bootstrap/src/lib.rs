// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Enforce zero-panic production code at compile time
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # Bootstrap Module
//!
//! The bootstrap layer provides everything a process-level entry point
//! needs that the engine (`stagepipe`) and its domain (`stagepipe_domain`)
//! deliberately do not carry:
//!
//! - **Argument parsing** - `clap`-derived CLI, parsed then validated
//! - **Configuration** - bootstrap-phase settings (`AppConfig`)
//! - **Exit codes** - `sysexits.h`-style process exit codes
//! - **Logging** - a minimal bootstrap-phase logging trait
//! - **Signal handling** - graceful shutdown (SIGTERM, SIGINT, SIGHUP)
//! - **Shutdown coordination** - a `Notify`-based cancellation token
//! - **Platform sizing** - hardware thread count for `n_jobs` defaults
//!
//! ## Architecture Position
//!
//! This crate depends on none of the others — like the reference
//! project's own bootstrap crate, it knows nothing about pipelines,
//! stages, or queues, only about the process it is wrapping:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │         STAGEPIPE (the engine)               │
//! │  - Queues, workers, coordinator, pipeline    │
//! │  - depends on: stagepipe-domain, bootstrap   │
//! │  - owns the demo binary (src/bin/)           │
//! └─────────────────────────────────────────────┘
//!             │                      │
//!             ▼                      ▼
//! ┌───────────────────────┐ ┌─────────────────────────┐
//! │   STAGEPIPE-DOMAIN     │ │  BOOTSTRAP (this crate)  │
//! │  topology, stage fns   │ │  CLI, signals, exit code │
//! └───────────────────────┘ └─────────────────────────┘
//! ```
//!
//! The engine depends on bootstrap (to build a runnable demo binary) and
//! on domain (for pipeline topology); bootstrap and domain depend on
//! neither the engine nor each other. A caller embedding `stagepipe` as a
//! library without the demo binary can ignore this crate entirely; it
//! never comes along transitively on its own.
//!
//! ## Usage Example
//!
//! ```no_run
//! use stagepipe_bootstrap::{bootstrap_cli, exit_code::ExitCode};
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     let validated_cli = match bootstrap_cli() {
//!         Ok(cli) => cli,
//!         Err(e) => {
//!             eprintln!("CLI error: {e}");
//!             return std::process::ExitCode::from(ExitCode::UsageError.as_i32() as u8);
//!         }
//!     };
//!
//!     println!("{validated_cli:?}");
//!     std::process::ExitCode::from(ExitCode::Success.as_i32() as u8)
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`cli`] - parse-then-validate CLI argument handling
//! - [`config`] - bootstrap-phase `AppConfig`
//! - [`exit_code`] - Unix exit code enumeration
//! - [`logger`] - bootstrap-specific logging
//! - [`platform`] - hardware thread count and platform name
//! - [`shutdown`] - shutdown coordination
//! - [`signals`] - signal handling (SIGTERM, SIGINT, SIGHUP)

pub mod cli;
pub mod config;
pub mod exit_code;
pub mod logger;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use cli::{ValidatedCli, ValidatedCommand};
pub use exit_code::ExitCode;

/// Bootstrap and parse CLI arguments.
///
/// This is the main entry point for the bootstrap layer: parses CLI
/// arguments with `clap`, validates them, and returns a [`ValidatedCli`]
/// ready for a caller (such as the engine crate's demo binary) to turn
/// into a `StartOptions` and a demo `PipelineConfig`.
///
/// # Errors
///
/// Returns [`cli::ParseError`] if validation fails. Clap itself handles
/// `--help` and `--version` and exits the process before this function
/// returns.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}
