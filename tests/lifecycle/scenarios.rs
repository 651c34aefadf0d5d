//! BDD scenarios for resource launch and teardown.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LifecycleContext, lifecycle_context};

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Launch a compute instance and record its public address"
)]
fn scenario_compute_launch(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Report the private address when requested"
)]
fn scenario_private_address(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Give up when the instance never becomes ready"
)]
fn scenario_launch_timeout(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Launch a database system"
)]
fn scenario_database_launch(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Reject a database configuration without a version"
)]
fn scenario_database_missing_version(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Terminate a recorded instance"
)]
fn scenario_terminate_instance(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Terminate when nothing was launched"
)]
fn scenario_terminate_noop(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Attach and detach an iSCSI volume"
)]
fn scenario_volume_attachment(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}
