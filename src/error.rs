//! Error type surfaced by the provisioning engine.

use std::time::Duration;

use thiserror::Error;

use crate::client::ClientError;
use crate::config::ConfigError;

/// Errors raised while building, launching, polling or tearing down a
/// resource.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProvisionError {
    /// Raised when a user-data item has neither a path nor inline content.
    #[error("invalid user data: item {index} ({filename}) has neither a path nor inline content")]
    InvalidUserData {
        /// Position of the offending item in the user-data list.
        index: usize,
        /// Filename declared by the item.
        filename: String,
    },
    /// Raised when a referenced file cannot be read.
    #[error("failed to read `{path}`: {message}")]
    Io {
        /// Expanded path that failed to read.
        path: String,
        /// Underlying error message.
        message: String,
    },
    /// Raised when a launched resource reports no network interfaces.
    #[error("could not find any VNIC attachments for {resource_id}")]
    NoAttachmentsFound {
        /// Provider identifier of the resource.
        resource_id: String,
    },
    /// Raised when none of an instance's interfaces is marked primary.
    #[error("no primary VNIC found for {resource_id}")]
    NoPrimaryInterface {
        /// Provider identifier of the resource.
        resource_id: String,
    },
    /// Raised when the selected interface lacks the requested address.
    #[error("VNIC {vnic_id} of {resource_id} has no usable {visibility} IP address")]
    MissingAddress {
        /// Provider identifier of the resource.
        resource_id: String,
        /// Interface that was selected.
        vnic_id: String,
        /// Either `public` or `private`.
        visibility: String,
    },
    /// Raised when a field required by the resource kind is absent.
    #[error("missing required configuration: {field}")]
    MissingRequiredConfig {
        /// Name of the missing field.
        field: String,
    },
    /// Raised when the provider rejects a launch or terminate request.
    #[error("{kind} request rejected by provider: {message}")]
    Submission {
        /// Resource kind being submitted.
        kind: String,
        /// Message returned by the client.
        message: String,
    },
    /// Raised when the terminal status is not observed in time.
    #[error("timed out after {waited:?} waiting for {kind} {resource_id} to reach {target}")]
    PollTimeout {
        /// Resource kind being polled.
        kind: String,
        /// Provider identifier of the resource.
        resource_id: String,
        /// Status (or statuses) that were awaited.
        target: String,
        /// Time spent polling before giving up.
        waited: Duration,
    },
    /// Raised when polling observes a status that can never lead to the
    /// awaited one.
    #[error("{kind} {resource_id} entered status {status} while waiting for {target}")]
    UnexpectedStatus {
        /// Resource kind being polled.
        kind: String,
        /// Provider identifier of the resource.
        resource_id: String,
        /// Status reported by the provider.
        status: String,
        /// Status that was awaited.
        target: String,
    },
    /// Wrapper for failures of read-only client calls.
    #[error("provider error: {message}")]
    Client {
        /// Message returned by the client.
        message: String,
    },
    /// Raised when engine settings are invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProvisionError {
    /// Shorthand for [`ProvisionError::MissingRequiredConfig`].
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingRequiredConfig {
            field: field.into(),
        }
    }

    pub(crate) fn submission(kind: &str, err: &ClientError) -> Self {
        Self::Submission {
            kind: kind.to_owned(),
            message: err.to_string(),
        }
    }
}

impl From<ClientError> for ProvisionError {
    fn from(value: ClientError) -> Self {
        Self::Client {
            message: value.to_string(),
        }
    }
}

impl From<ConfigError> for ProvisionError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
