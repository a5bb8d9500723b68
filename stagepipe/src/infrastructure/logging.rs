// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tracing Setup
//!
//! A single initialization function for the engine's always-on `tracing`
//! output (distinct from the opt-in, in-memory [`crate::trace::TraceSink`]
//! of §4.5). Callers embedding `stagepipe` as a library are free to
//! install their own subscriber instead — this is a convenience for the
//! bootstrap binary, not something the engine depends on internally.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing-subscriber` formatter as the global default.
///
/// The filter defaults to `info` for the whole process, `debug` for this
/// crate and its domain crate when `verbose` is set, and always honors
/// `RUST_LOG` if it is present (an explicit `RUST_LOG` always wins over
/// `verbose`). Returns an error if a global subscriber is already
/// installed; this is intentionally non-fatal to callers that install
/// their own and call this function defensively.
pub fn init_tracing(verbose: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    let default_directive = if verbose {
        "info,stagepipe=debug,stagepipe_domain=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init()
}
