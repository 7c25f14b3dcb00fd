//! Declarative configuration.
//!
//! Lets operators describe the policy table and reaper schedule in TOML:
//!
//! ```toml
//! [default]
//! requests = 100
//! window_secs = 60
//!
//! [endpoints.search]
//! requests = 3
//! window_secs = 60
//!
//! [reaper]
//! interval_secs = 300
//! staleness_secs = 600
//! ```
//!
//! Every section is optional and falls back to the builder defaults.

use crate::application::admission::AdmissionController;
use crate::domain::policy::{EndpointPolicy, PolicyError};
use crate::infrastructure::builder::{AdmissionControllerBuilder, BuildError};
use crate::infrastructure::storage::DefaultStorage;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Error returned when configuration cannot be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The document is not valid TOML or does not match the schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A policy entry is invalid
    #[error("invalid policy for `{endpoint}`: {source}")]
    Policy {
        /// Endpoint id, or `default` for the default section
        endpoint: String,
        /// Underlying validation error
        #[source]
        source: PolicyError,
    },
}

/// One "N requests per window" entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Requests allowed per window
    pub requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl PolicyConfig {
    fn to_policy(self, endpoint: &str) -> Result<EndpointPolicy, ConfigError> {
        EndpointPolicy::new(self.requests, Duration::from_secs(self.window_secs)).map_err(
            |source| ConfigError::Policy {
                endpoint: endpoint.to_string(),
                source,
            },
        )
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            requests: 100,
            window_secs: 60,
        }
    }
}

/// Reaper section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaperSection {
    /// Seconds between sweeps
    pub interval_secs: u64,
    /// Idle seconds before a full bucket may be evicted
    pub staleness_secs: u64,
}

impl Default for ReaperSection {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            staleness_secs: 600,
        }
    }
}

/// Full admission configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdmissionConfig {
    /// Policy for endpoints without an override
    pub default: PolicyConfig,
    /// Per-endpoint overrides keyed by endpoint id
    pub endpoints: BTreeMap<String, PolicyConfig>,
    /// Reaper schedule
    pub reaper: ReaperSection,
}

impl AdmissionConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed input or unknown keys.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    /// Convert into a builder, validating every policy entry.
    ///
    /// Further settings such as a custom clock can be applied to the
    /// returned builder before calling `build`.
    ///
    /// # Errors
    /// Returns `ConfigError::Policy` for a zero-length window.
    pub fn into_builder(self) -> Result<AdmissionControllerBuilder, ConfigError> {
        let mut builder = AdmissionController::builder()
            .with_default_policy(self.default.to_policy("default")?)
            .with_reaper_interval(Duration::from_secs(self.reaper.interval_secs))
            .with_staleness_threshold(Duration::from_secs(self.reaper.staleness_secs));

        for (endpoint, entry) in self.endpoints {
            let policy = entry.to_policy(&endpoint)?;
            builder = builder.with_endpoint_policy(endpoint, policy);
        }

        Ok(builder)
    }

    /// Build a controller directly from this configuration.
    ///
    /// # Errors
    /// Returns `BuildError` if a policy or the reaper schedule is invalid.
    pub fn build(self) -> Result<AdmissionController<DefaultStorage>, BuildError> {
        self.into_builder()?.build()
    }
}
