//! Declarative description of the resource to provision.
//!
//! The host tool hands the engine a [`DriverConfig`] per provisioning
//! attempt. The lifecycle clones it into an effective copy before building,
//! so defaults filled in by builder steps (generated passwords, sizing) stay
//! stable for the rest of that attempt without touching the caller's value.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::ProvisionError;

/// Default user created by the Windows bootstrap script.
pub const DEFAULT_WINRM_USER: &str = "opc";

/// Configuration for one provisioning attempt.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Compartment that owns the resource.
    pub compartment_id: Option<String>,
    /// Availability domain to launch into.
    pub availability_domain: Option<String>,
    /// Shape name (for example `VM.Standard.E4.Flex`).
    pub shape: Option<String>,
    /// Prefix used to derive hostnames and display names.
    pub hostname_prefix: Option<String>,
    /// Subnet receiving the primary interface.
    pub subnet_id: Option<String>,
    /// Network security groups applied to the primary interface.
    pub nsg_ids: Vec<String>,
    /// Boot image for compute instances.
    pub image_id: Option<String>,
    /// Optional boot volume size for compute instances.
    pub boot_volume_size_in_gbs: Option<u64>,
    /// Report the private address even when a public one is available.
    pub use_private_ip: bool,
    /// Path to the SSH public key installed on the resource.
    pub ssh_keypath: Option<Utf8PathBuf>,
    /// Extra instance metadata entries.
    pub custom_metadata: BTreeMap<String, String>,
    /// Freeform tags applied to the resource.
    pub freeform_tags: BTreeMap<String, String>,
    /// Defined tags keyed by namespace.
    pub defined_tags: BTreeMap<String, BTreeMap<String, String>>,
    /// Optional cloud-init user-data.
    pub user_data: Option<UserData>,
    /// Launch the instance as preemptible capacity.
    pub preemptible_instance: bool,
    /// Flexible shape sizing.
    pub shape_config: Option<ShapeConfig>,
    /// Inject the Windows remote-management bootstrap script.
    pub setup_winrm: bool,
    /// User created by the bootstrap script.
    pub winrm_user: String,
    /// Password for [`Self::winrm_user`]; generated when absent.
    pub winrm_password: Option<String>,
    /// Database system options.
    pub dbaas: DbaasOptions,
    /// Block volumes that may be attached to the instance.
    pub volumes: Vec<VolumeConfig>,
    /// Values borrowed from the provisioner for tagging.
    pub provisioner: ProvisionerContext,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            compartment_id: None,
            availability_domain: None,
            shape: None,
            hostname_prefix: None,
            subnet_id: None,
            nsg_ids: Vec::new(),
            image_id: None,
            boot_volume_size_in_gbs: None,
            use_private_ip: false,
            ssh_keypath: None,
            custom_metadata: BTreeMap::new(),
            freeform_tags: BTreeMap::new(),
            defined_tags: BTreeMap::new(),
            user_data: None,
            preemptible_instance: false,
            shape_config: None,
            setup_winrm: false,
            winrm_user: DEFAULT_WINRM_USER.to_owned(),
            winrm_password: None,
            dbaas: DbaasOptions::default(),
            volumes: Vec::new(),
            provisioner: ProvisionerContext::default(),
        }
    }
}

impl DriverConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the document does not match the
    /// expected shape.
    pub fn from_json(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }

    /// Returns the value of a required field.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MissingRequiredConfig`] when the value is
    /// absent or blank.
    pub fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ProvisionError> {
        match value {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ProvisionError::missing(field)),
        }
    }

    /// Required subnet identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MissingRequiredConfig`] when unset.
    pub fn require_subnet_id(&self) -> Result<&str, ProvisionError> {
        Self::require(self.subnet_id.as_deref(), "subnet_id")
    }

    /// Required compartment identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MissingRequiredConfig`] when unset.
    pub fn require_compartment_id(&self) -> Result<&str, ProvisionError> {
        Self::require(self.compartment_id.as_deref(), "compartment_id")
    }

    /// Required hostname prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MissingRequiredConfig`] when unset.
    pub fn require_hostname_prefix(&self) -> Result<&str, ProvisionError> {
        Self::require(self.hostname_prefix.as_deref(), "hostname_prefix")
    }

    /// Looks up a configured volume by identifier.
    #[must_use]
    pub fn volume(&self, volume_id: &str) -> Option<&VolumeConfig> {
        self.volumes.iter().find(|volume| volume.volume_id == volume_id)
    }
}

/// Cloud-init user-data: a single inline document or a multi-part list.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UserData {
    /// One document sent as-is.
    Inline(String),
    /// Parts assembled into a MIME multi-part message.
    Parts(Vec<UserDataItem>),
}

/// One part of a multi-part user-data payload.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UserDataItem {
    /// MIME subtype placed after `text/` (for example `x-shellscript`).
    #[serde(rename = "type")]
    pub content_type: String,
    /// Filename advertised in the part's disposition header.
    pub filename: String,
    /// File supplying the content.
    #[serde(default)]
    pub path: Option<Utf8PathBuf>,
    /// Content supplied verbatim; ignored when `path` is set.
    #[serde(default)]
    pub inline: Option<String>,
}

impl UserDataItem {
    /// Builds an inline part.
    #[must_use]
    pub fn inline(
        content_type: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            filename: filename.into(),
            path: None,
            inline: Some(content.into()),
        }
    }

    /// Builds a part read from `path`.
    #[must_use]
    pub fn file(
        content_type: impl Into<String>,
        filename: impl Into<String>,
        path: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            filename: filename.into(),
            path: Some(path.into()),
            inline: None,
        }
    }
}

/// Flexible shape sizing for compute instances.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ShapeConfig {
    /// Number of OCPUs.
    pub ocpus: Option<f32>,
    /// Memory in gigabytes.
    pub memory_in_gbs: Option<f32>,
    /// Burstable baseline; defaults to `BASELINE_1_1`.
    pub baseline_ocpu_utilization: Option<String>,
}

/// Database system options. Absent values are filled with defaults by the
/// database builder steps.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct DbaasOptions {
    /// Database version; required.
    pub db_version: Option<String>,
    /// CPU cores for the system.
    pub cpu_core_count: Option<u32>,
    /// Initial data storage in gigabytes.
    pub initial_data_storage_size_in_gb: Option<u32>,
    /// License model.
    pub license_model: Option<String>,
    /// Database edition.
    pub database_edition: Option<String>,
    /// Database name.
    pub db_name: Option<String>,
    /// Pluggable database name.
    pub pdb_name: Option<String>,
    /// Administrator password.
    pub admin_password: Option<String>,
    /// Database character set.
    pub character_set: Option<String>,
    /// National character set.
    pub ncharacter_set: Option<String>,
    /// Workload type.
    pub db_workload: Option<String>,
}

/// How a block volume is attached.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    /// iSCSI attachment; the guest logs in to the reported target.
    #[default]
    Iscsi,
    /// Paravirtualized attachment handled by the hypervisor.
    Paravirtual,
}

impl AttachmentType {
    /// Provider name of the attachment type.
    #[must_use]
    pub const fn provider_name(self) -> &'static str {
        match self {
            Self::Iscsi => "iscsi",
            Self::Paravirtual => "paravirtualized",
        }
    }

    /// Display name used when the volume does not set one.
    #[must_use]
    pub const fn default_display_name(self) -> &'static str {
        match self {
            Self::Iscsi => "iSCSIAttachment",
            Self::Paravirtual => "ParavirtualAttachment",
        }
    }
}

/// A block volume to attach to the launched instance.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Existing volume identifier.
    pub volume_id: String,
    /// Attachment mechanism.
    pub attachment_type: AttachmentType,
    /// Optional display name for the attachment.
    pub display_name: Option<String>,
    /// Attach read-only.
    pub read_only: bool,
}

/// Provisioner settings copied into freeform tags.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ProvisionerContext {
    /// Run list entries.
    pub run_list: Vec<String>,
    /// Policyfile path.
    pub policyfile: Option<String>,
}
