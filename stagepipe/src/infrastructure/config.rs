// /////////////////////////////////////////////////////////////////////////////
// Stagepipe
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Configuration
//!
//! [`EngineSettings`] is the layered-configuration counterpart to
//! [`crate::pipeline::StartOptions`]: a convenience for callers that want
//! `n_jobs`/`verbose`/`queue_capacity` sourced from a TOML file and
//! environment overrides instead of hard-coded in the binary, following
//! the same file-then-environment layering the reference project's
//! infrastructure configuration uses. Nothing in the engine itself
//! requires this — a caller embedding `stagepipe` as a library can
//! construct [`crate::pipeline::StartOptions`] directly and skip this
//! module entirely.

use std::path::Path;

use serde::{Deserialize, Serialize};

use stagepipe_domain::PipelineError;

use crate::pipeline::StartOptions;

/// Engine-level settings loadable from a TOML file, overridable by
/// `STAGEPIPE_*` environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    /// See [`StartOptions::n_jobs`].
    pub n_jobs: Option<usize>,
    /// See [`StartOptions::queue_capacity`].
    pub queue_capacity: Option<usize>,
    /// See [`StartOptions::verbose`].
    #[serde(default)]
    pub verbose: bool,
}

impl EngineSettings {
    /// Loads settings from an optional TOML file, then lets any
    /// `STAGEPIPE_N_JOBS` / `STAGEPIPE_QUEUE_CAPACITY` / `STAGEPIPE_VERBOSE`
    /// environment variable override the corresponding field.
    pub fn load(file: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("STAGEPIPE").try_parsing(true));

        let loaded = builder
            .build()
            .map_err(|err| PipelineError::ConfigLoad(err.to_string()))?;

        loaded.try_deserialize().map_err(|err| PipelineError::ConfigLoad(err.to_string()))
    }

    /// Turns these settings into the [`StartOptions`] the engine actually
    /// consumes.
    pub fn into_start_options(self) -> StartOptions {
        StartOptions {
            n_jobs: self.n_jobs,
            queue_capacity: self.queue_capacity,
            verbose: self.verbose,
            metrics_registry: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unset() {
        let settings = EngineSettings::default();
        assert!(settings.n_jobs.is_none());
        assert!(settings.queue_capacity.is_none());
        assert!(!settings.verbose);
    }

    #[test]
    fn loads_with_no_file_and_no_env() {
        let settings = EngineSettings::load(None).expect("environment-only load should succeed");
        assert_eq!(settings.n_jobs, None);
    }

    #[test]
    fn into_start_options_carries_fields_through() {
        let settings = EngineSettings {
            n_jobs: Some(4),
            queue_capacity: Some(16),
            verbose: true,
        };
        let opts = settings.into_start_options();
        assert_eq!(opts.n_jobs, Some(4));
        assert_eq!(opts.queue_capacity, Some(16));
        assert!(opts.verbose);
    }
}
