//! Tests for engine settings and driver configuration parsing.

use std::time::Duration;

use kitchen_oci::config::ConfigError;
use kitchen_oci::driver_config::AttachmentType;
use kitchen_oci::test_support::ScopedEnv;
use kitchen_oci::{DriverConfig, LifecycleConfig, PollPolicy, UserData};
use rstest::*;

#[fixture]
fn valid_config() -> LifecycleConfig {
    LifecycleConfig::default()
}

#[test]
fn config_validation_rejects_zero_wait_with_actionable_error() {
    let cfg = LifecycleConfig {
        compute_max_wait_secs: 0,
        ..valid_config()
    };

    let error = cfg.validate().expect_err("zero wait is rejected");
    let ConfigError::MissingField(ref message) = error else {
        panic!("expected MissingField error");
    };
    assert!(
        message.contains("KITCHEN_OCI_COMPUTE_MAX_WAIT_SECS"),
        "error should mention env var: {message}"
    );
    assert!(
        message.contains("kitchen-oci.toml"),
        "error should mention config file: {message}"
    );
    assert!(
        message.contains("compute_max_wait_secs"),
        "error should mention TOML key: {message}"
    );
}

#[rstest]
#[case(|cfg: &mut LifecycleConfig| cfg.compute_poll_interval_secs = 0, "KITCHEN_OCI_COMPUTE_POLL_INTERVAL_SECS", "compute_poll_interval_secs")]
#[case(|cfg: &mut LifecycleConfig| cfg.dbaas_max_interval_secs = 0, "KITCHEN_OCI_DBAAS_MAX_INTERVAL_SECS", "dbaas_max_interval_secs")]
#[case(|cfg: &mut LifecycleConfig| cfg.dbaas_max_wait_secs = 0, "KITCHEN_OCI_DBAAS_MAX_WAIT_SECS", "dbaas_max_wait_secs")]
#[case(|cfg: &mut LifecycleConfig| cfg.attachment_poll_interval_secs = 0, "KITCHEN_OCI_ATTACHMENT_POLL_INTERVAL_SECS", "attachment_poll_interval_secs")]
fn config_validation_produces_actionable_errors(
    valid_config: LifecycleConfig,
    #[case] mutate: fn(&mut LifecycleConfig),
    #[case] env_var: &str,
    #[case] toml_key: &str,
) {
    let mut cfg = valid_config;
    mutate(&mut cfg);
    let message = cfg
        .validate()
        .expect_err("validation should fail")
        .to_string();
    assert!(
        message.contains(env_var),
        "error should mention env var {env_var}: {message}"
    );
    assert!(
        message.contains(toml_key),
        "error should mention TOML key {toml_key}: {message}"
    );
}

#[rstest]
fn config_converts_seconds_to_poll_policies(valid_config: LifecycleConfig) {
    let cfg = LifecycleConfig {
        dbaas_poll_interval_secs: 5,
        dbaas_max_interval_secs: 60,
        dbaas_max_wait_secs: 600,
        ..valid_config
    };
    assert_eq!(
        cfg.dbaas_policy(),
        PollPolicy::new(
            Duration::from_secs(5),
            Duration::from_secs(60),
            Duration::from_secs(600)
        )
    );
    assert_eq!(cfg.compute_policy(), PollPolicy::COMPUTE);
}

#[tokio::test]
async fn config_reads_wait_ceiling_from_environment() {
    let _env = ScopedEnv::set(&[("KITCHEN_OCI_COMPUTE_MAX_WAIT_SECS", "45")]).await;

    let cfg = LifecycleConfig::load_without_cli_args()
        .unwrap_or_else(|err| panic!("config should load: {err}"));

    assert_eq!(cfg.compute_max_wait_secs, 45);
    assert_eq!(cfg.compute_policy().max_wait, Duration::from_secs(45));
}

#[tokio::test]
async fn cleared_variable_falls_back_to_default() {
    let _env = ScopedEnv::apply([
        ("KITCHEN_OCI_DBAAS_MAX_WAIT_SECS", Some("30")),
        ("KITCHEN_OCI_DBAAS_MAX_WAIT_SECS", None),
    ])
    .await;

    let cfg = LifecycleConfig::load_without_cli_args()
        .unwrap_or_else(|err| panic!("config should load: {err}"));

    assert_eq!(
        cfg.dbaas_max_wait_secs,
        LifecycleConfig::default().dbaas_max_wait_secs
    );
}

#[test]
fn driver_config_parses_volumes_and_inline_user_data() {
    let cfg = DriverConfig::from_json(
        r##"{
            "compartment_id": "ocid1.compartment.oc1..example",
            "hostname_prefix": "kitchen",
            "user_data": "#!/bin/sh\necho ready\n",
            "volumes": [
                {"volume_id": "vol-1"},
                {"volume_id": "vol-2", "attachment_type": "paravirtual", "read_only": true}
            ]
        }"##,
    )
    .unwrap_or_else(|err| panic!("config should parse: {err}"));

    assert_eq!(
        cfg.user_data,
        Some(UserData::Inline(String::from("#!/bin/sh\necho ready\n")))
    );
    assert_eq!(
        cfg.volume("vol-1").map(|volume| volume.attachment_type),
        Some(AttachmentType::Iscsi)
    );
    assert_eq!(
        cfg.volume("vol-2").map(|volume| volume.read_only),
        Some(true)
    );
    assert_eq!(cfg.winrm_user, "opc");
}

#[test]
fn driver_config_reports_missing_required_fields() {
    let cfg = DriverConfig::default();
    let err = cfg
        .require_compartment_id()
        .expect_err("compartment is required");
    assert!(
        err.to_string().contains("compartment_id"),
        "unexpected error: {err}"
    );
}
