//! Shared fixtures for lifecycle BDD scenarios.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use kitchen_oci::client::Vnic;
use kitchen_oci::driver_config::{AttachmentType, DbaasOptions, VolumeConfig};
use kitchen_oci::test_support::ScriptedCloud;
use kitchen_oci::{DriverConfig, LaunchOutcome, PollPolicy, StateRecord, TerminateOutcome};
use rstest::fixture;
use tempfile::TempDir;

pub const RESOURCE_ID: &str = "ocid1.resource.oc1..bdd";
pub const PUBLIC_IP: &str = "203.0.113.7";
pub const PRIVATE_IP: &str = "10.0.0.5";

/// Kind exercised by a scenario.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KindChoice {
    Compute,
    Dbaas,
    Attachment(String),
}

#[derive(Clone, Debug)]
pub struct LifecycleContext {
    pub cloud: ScriptedCloud,
    pub kind: KindChoice,
    pub config: DriverConfig,
    pub state: StateRecord,
    pub policy: PollPolicy,
    pub launch: Option<Result<LaunchOutcome, String>>,
    pub terminate: Option<Result<TerminateOutcome, String>>,
    pub keys: Option<Arc<TempDir>>,
}

#[fixture]
pub fn lifecycle_context() -> LifecycleContext {
    let cloud = ScriptedCloud::new();
    cloud.set_resource_id(RESOURCE_ID);
    LifecycleContext {
        cloud,
        kind: KindChoice::Compute,
        config: DriverConfig::default(),
        state: StateRecord::new(),
        policy: PollPolicy::new(
            Duration::from_millis(1),
            Duration::from_millis(2),
            Duration::from_millis(200),
        ),
        launch: None,
        terminate: None,
        keys: None,
    }
}

fn primary_vnic() -> Vnic {
    Vnic {
        id: String::from("vnic-primary"),
        is_primary: true,
        public_ip: Some(String::from(PUBLIC_IP)),
        private_ip: Some(String::from(PRIVATE_IP)),
    }
}

fn write_public_key() -> (Arc<TempDir>, Utf8PathBuf) {
    let keys = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let key_file = keys.path().join("id_rsa.pub");
    std::fs::write(&key_file, "ssh-rsa AAAAB3Nza bdd@kitchen\n")
        .unwrap_or_else(|err| panic!("write key: {err}"));
    let keypath = Utf8PathBuf::from_path_buf(key_file)
        .unwrap_or_else(|path| panic!("key path should be utf8: {}", path.display()));
    (Arc::new(keys), keypath)
}

fn base_config(prefix: &str, keypath: Utf8PathBuf) -> DriverConfig {
    DriverConfig {
        compartment_id: Some(String::from("ocid1.compartment.oc1..bdd")),
        availability_domain: Some(String::from("Uocm:PHX-AD-1")),
        shape: Some(String::from("VM.Standard.E4.Flex")),
        subnet_id: Some(String::from("ocid1.subnet.oc1..bdd")),
        image_id: Some(String::from("ocid1.image.oc1..bdd")),
        hostname_prefix: Some(prefix.to_owned()),
        ssh_keypath: Some(keypath),
        ..DriverConfig::default()
    }
}

pub fn configure_compute(mut context: LifecycleContext, prefix: &str) -> LifecycleContext {
    let (keys, keypath) = write_public_key();
    context.cloud.add_vnic(primary_vnic());
    context.config = base_config(prefix, keypath);
    context.kind = KindChoice::Compute;
    context.keys = Some(keys);
    context
}

pub fn configure_dbaas(mut context: LifecycleContext, prefix: &str) -> LifecycleContext {
    let (keys, keypath) = write_public_key();
    context.cloud.add_db_node(primary_vnic());
    context.config = DriverConfig {
        shape: Some(String::from("VM.Standard2.1")),
        dbaas: DbaasOptions {
            db_version: Some(String::from("19.0.0.0")),
            ..DbaasOptions::default()
        },
        ..base_config(prefix, keypath)
    };
    context.kind = KindChoice::Dbaas;
    context.keys = Some(keys);
    context
}

pub fn configure_attachment(mut context: LifecycleContext, volume_id: &str) -> LifecycleContext {
    context.cloud.set_iscsi_target("iqn.2015-12.com.oracleiaas:bdd", "169.254.2.2", 3260);
    context.config = DriverConfig {
        volumes: vec![VolumeConfig {
            volume_id: volume_id.to_owned(),
            attachment_type: AttachmentType::Iscsi,
            display_name: None,
            read_only: false,
        }],
        ..DriverConfig::default()
    };
    context.kind = KindChoice::Attachment(volume_id.to_owned());
    context
}
