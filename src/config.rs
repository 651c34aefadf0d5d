//! Engine settings loaded via `ortho-config`.
//!
//! These tune how the lifecycle waits for the provider; the resource itself
//! is described by [`crate::DriverConfig`]. Values merge defaults,
//! configuration files and `KITCHEN_OCI_*` environment variables.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::lifecycle::PollPolicy;

/// Poll cadence and ceilings per resource kind, in seconds.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "KITCHEN_OCI")]
pub struct LifecycleConfig {
    /// First delay between compute status polls.
    #[ortho_config(default = 1)]
    pub compute_poll_interval_secs: u64,
    /// Longest delay between compute status polls.
    #[ortho_config(default = 30)]
    pub compute_max_interval_secs: u64,
    /// Time allowed for a compute instance to become ready or gone.
    #[ortho_config(default = 1200)]
    pub compute_max_wait_secs: u64,
    /// First delay between database status polls.
    #[ortho_config(default = 1)]
    pub dbaas_poll_interval_secs: u64,
    /// Longest delay between database status polls.
    #[ortho_config(default = 900)]
    pub dbaas_max_interval_secs: u64,
    /// Time allowed for a database system to become ready or gone. Defaults
    /// to six hours.
    #[ortho_config(default = 21_600)]
    pub dbaas_max_wait_secs: u64,
    /// First delay between attachment status polls.
    #[ortho_config(default = 1)]
    pub attachment_poll_interval_secs: u64,
    /// Longest delay between attachment status polls.
    #[ortho_config(default = 30)]
    pub attachment_max_interval_secs: u64,
    /// Time allowed for a volume to attach or detach.
    #[ortho_config(default = 1200)]
    pub attachment_max_wait_secs: u64,
    /// Seed for generated names and credentials. Leave unset outside tests.
    pub naming_seed: Option<u64>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            compute_poll_interval_secs: 1,
            compute_max_interval_secs: 30,
            compute_max_wait_secs: 1200,
            dbaas_poll_interval_secs: 1,
            dbaas_max_interval_secs: 900,
            dbaas_max_wait_secs: 21_600,
            attachment_poll_interval_secs: 1,
            attachment_max_interval_secs: 30,
            attachment_max_wait_secs: 1200,
            naming_seed: None,
        }
    }
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

const FIELDS: [FieldMetadata; 9] = [
    FieldMetadata::new(
        "compute poll interval",
        "KITCHEN_OCI_COMPUTE_POLL_INTERVAL_SECS",
        "compute_poll_interval_secs",
    ),
    FieldMetadata::new(
        "compute maximum poll interval",
        "KITCHEN_OCI_COMPUTE_MAX_INTERVAL_SECS",
        "compute_max_interval_secs",
    ),
    FieldMetadata::new(
        "compute wait ceiling",
        "KITCHEN_OCI_COMPUTE_MAX_WAIT_SECS",
        "compute_max_wait_secs",
    ),
    FieldMetadata::new(
        "database poll interval",
        "KITCHEN_OCI_DBAAS_POLL_INTERVAL_SECS",
        "dbaas_poll_interval_secs",
    ),
    FieldMetadata::new(
        "database maximum poll interval",
        "KITCHEN_OCI_DBAAS_MAX_INTERVAL_SECS",
        "dbaas_max_interval_secs",
    ),
    FieldMetadata::new(
        "database wait ceiling",
        "KITCHEN_OCI_DBAAS_MAX_WAIT_SECS",
        "dbaas_max_wait_secs",
    ),
    FieldMetadata::new(
        "attachment poll interval",
        "KITCHEN_OCI_ATTACHMENT_POLL_INTERVAL_SECS",
        "attachment_poll_interval_secs",
    ),
    FieldMetadata::new(
        "attachment maximum poll interval",
        "KITCHEN_OCI_ATTACHMENT_MAX_INTERVAL_SECS",
        "attachment_max_interval_secs",
    ),
    FieldMetadata::new(
        "attachment wait ceiling",
        "KITCHEN_OCI_ATTACHMENT_MAX_WAIT_SECS",
        "attachment_max_wait_secs",
    ),
];

impl LifecycleConfig {
    fn require_positive(value: u64, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::MissingField(format!(
                "{} must be greater than zero: set {} or {} in [lifecycle] of kitchen-oci.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    fn values(&self) -> [u64; 9] {
        [
            self.compute_poll_interval_secs,
            self.compute_max_interval_secs,
            self.compute_max_wait_secs,
            self.dbaas_poll_interval_secs,
            self.dbaas_max_interval_secs,
            self.dbaas_max_wait_secs,
            self.attachment_poll_interval_secs,
            self.attachment_max_interval_secs,
            self.attachment_max_wait_secs,
        ]
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("kitchen-oci")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Rejects zero intervals and ceilings. Error messages name the
    /// environment variable and TOML key that set the value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for the first zero value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (value, metadata) in self.values().into_iter().zip(FIELDS.iter()) {
            Self::require_positive(value, metadata)?;
        }
        Ok(())
    }

    /// Poll policy for compute instances.
    #[must_use]
    pub const fn compute_policy(&self) -> PollPolicy {
        policy(
            self.compute_poll_interval_secs,
            self.compute_max_interval_secs,
            self.compute_max_wait_secs,
        )
    }

    /// Poll policy for database systems.
    #[must_use]
    pub const fn dbaas_policy(&self) -> PollPolicy {
        policy(
            self.dbaas_poll_interval_secs,
            self.dbaas_max_interval_secs,
            self.dbaas_max_wait_secs,
        )
    }

    /// Poll policy for volume attachments.
    #[must_use]
    pub const fn attachment_policy(&self) -> PollPolicy {
        policy(
            self.attachment_poll_interval_secs,
            self.attachment_max_interval_secs,
            self.attachment_max_wait_secs,
        )
    }
}

const fn policy(interval: u64, max_interval: u64, max_wait: u64) -> PollPolicy {
    PollPolicy::new(
        Duration::from_secs(interval),
        Duration::from_secs(max_interval),
        Duration::from_secs(max_wait),
    )
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty, zero or missing.
    #[error("invalid configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
