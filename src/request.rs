//! Launch-request shapes assembled by the builder pipeline.
//!
//! Field names serialise in the provider's camelCase form. Every field is
//! optional or empty by default; builder steps fill them in order.

use std::collections::BTreeMap;

use serde::Serialize;

/// Fields shared by every launch request, written by the shared steps.
pub trait LaunchDetails {
    /// Sets the owning compartment.
    fn set_compartment_id(&mut self, value: String);
    /// Sets the availability domain.
    fn set_availability_domain(&mut self, value: String);
    /// Sets the shape.
    fn set_shape(&mut self, value: String);
    /// Replaces the freeform tags.
    fn set_freeform_tags(&mut self, value: BTreeMap<String, String>);
    /// Replaces the defined tags.
    fn set_defined_tags(&mut self, value: BTreeMap<String, BTreeMap<String, String>>);
}

macro_rules! launch_details {
    ($name:ident) => {
        impl LaunchDetails for $name {
            fn set_compartment_id(&mut self, value: String) {
                self.compartment_id = Some(value);
            }

            fn set_availability_domain(&mut self, value: String) {
                self.availability_domain = Some(value);
            }

            fn set_shape(&mut self, value: String) {
                self.shape = Some(value);
            }

            fn set_freeform_tags(&mut self, value: BTreeMap<String, String>) {
                self.freeform_tags = value;
            }

            fn set_defined_tags(&mut self, value: BTreeMap<String, BTreeMap<String, String>>) {
                self.defined_tags = value;
            }
        }
    };
}

/// Request to launch a compute instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchInstanceDetails {
    /// Owning compartment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compartment_id: Option<String>,
    /// Availability domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_domain: Option<String>,
    /// Shape name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Primary interface.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_vnic_details: Option<CreateVnicDetails>,
    /// Boot source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_details: Option<InstanceSourceViaImageDetails>,
    /// Instance metadata (SSH keys, user-data, custom entries).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Preemptible capacity settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preemptible_instance_config: Option<PreemptibleInstanceConfigDetails>,
    /// Flexible shape sizing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_config: Option<LaunchInstanceShapeConfigDetails>,
    /// Freeform tags.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub freeform_tags: BTreeMap<String, String>,
    /// Defined tags.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub defined_tags: BTreeMap<String, BTreeMap<String, String>>,
}

launch_details!(LaunchInstanceDetails);

/// Primary interface of a new instance.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVnicDetails {
    /// Whether to assign a public address.
    pub assign_public_ip: bool,
    /// Interface display name.
    pub display_name: String,
    /// DNS hostname label.
    pub hostname_label: String,
    /// Network security groups.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nsg_ids: Vec<String>,
    /// Subnet for the interface.
    pub subnet_id: String,
}

/// Boot from an image.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSourceViaImageDetails {
    /// Always `image`.
    pub source_type: String,
    /// Image identifier.
    pub image_id: String,
    /// Boot volume size override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_volume_size_in_gbs: Option<u64>,
}

/// Preemptible capacity settings.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreemptibleInstanceConfigDetails {
    /// Action taken on preemption.
    pub preemption_action: PreemptionAction,
}

/// What happens when capacity is reclaimed.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreemptionAction {
    /// Action type; `TERMINATE` is the only one offered.
    #[serde(rename = "type")]
    pub action_type: String,
    /// Keep the boot volume after preemption.
    pub preserve_boot_volume: bool,
}

/// Flexible shape sizing.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchInstanceShapeConfigDetails {
    /// Number of OCPUs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocpus: Option<f32>,
    /// Memory in gigabytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_in_gbs: Option<f32>,
    /// Burstable baseline.
    pub baseline_ocpu_utilization: String,
}

/// Request to launch a database system.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchDbSystemDetails {
    /// Owning compartment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compartment_id: Option<String>,
    /// Availability domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_domain: Option<String>,
    /// Shape name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    /// Node hostname (16 characters at most).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Cluster name (11 characters at most).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    /// CPU cores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_core_count: Option<u32>,
    /// Database home and its first database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_home: Option<CreateDbHomeDetails>,
    /// Database edition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_edition: Option<String>,
    /// Subnet for the nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    /// Network security groups.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nsg_ids: Vec<String>,
    /// SSH public keys installed on the nodes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_public_keys: Vec<String>,
    /// Initial data storage in gigabytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_data_storage_size_in_gb: Option<u32>,
    /// Number of nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<u32>,
    /// License model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_model: Option<String>,
    /// Freeform tags.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub freeform_tags: BTreeMap<String, String>,
    /// Defined tags.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub defined_tags: BTreeMap<String, BTreeMap<String, String>>,
}

launch_details!(LaunchDbSystemDetails);

/// Database home created with the system.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDbHomeDetails {
    /// Database version.
    pub db_version: String,
    /// Home display name.
    pub display_name: String,
    /// First database in the home.
    pub database: CreateDatabaseDetails,
}

/// First database of a new database home.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseDetails {
    /// Database name.
    pub db_name: String,
    /// Pluggable database name.
    pub pdb_name: String,
    /// Administrator password.
    pub admin_password: String,
    /// Character set.
    pub character_set: String,
    /// National character set.
    pub ncharacter_set: String,
    /// Workload type.
    pub db_workload: String,
    /// Backup settings.
    pub db_backup_config: DbBackupConfig,
}

/// Automatic backup settings.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbBackupConfig {
    /// Whether automatic backups run.
    pub auto_backup_enabled: bool,
}

/// Request to attach a block volume to an instance.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachVolumeDetails {
    /// `iscsi` or `paravirtualized`.
    #[serde(rename = "type")]
    pub attachment_type: String,
    /// Attachment display name.
    pub display_name: String,
    /// Volume to attach.
    pub volume_id: String,
    /// Instance receiving the volume.
    pub instance_id: String,
    /// Attach read-only.
    pub is_read_only: bool,
}
