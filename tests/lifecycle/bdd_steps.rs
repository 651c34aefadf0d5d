//! BDD step definitions for resource launch and teardown.

use kitchen_oci::state::SERVER_ID;
use kitchen_oci::{
    AttachmentKind, ComputeKind, DbaasKind, Lifecycle, PollPolicy, ProvisionError, ResourceKind,
    StateRecord, TerminateOutcome,
};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{
    KindChoice, LifecycleContext, RESOURCE_ID, configure_attachment, configure_compute,
    configure_dbaas,
};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a compute configuration with prefix \"{prefix}\"")]
fn compute_configuration(lifecycle_context: LifecycleContext, prefix: String) -> LifecycleContext {
    configure_compute(lifecycle_context, &prefix)
}

#[given("a database configuration with prefix \"{prefix}\"")]
fn database_configuration(
    lifecycle_context: LifecycleContext,
    prefix: String,
) -> LifecycleContext {
    configure_dbaas(lifecycle_context, &prefix)
}

#[given("an attachment configuration for volume \"{volume}\"")]
fn attachment_configuration(
    lifecycle_context: LifecycleContext,
    volume: String,
) -> LifecycleContext {
    configure_attachment(lifecycle_context, &volume)
}

#[given("the configuration requests the private address")]
fn private_address(mut lifecycle_context: LifecycleContext) -> LifecycleContext {
    lifecycle_context.config.use_private_ip = true;
    lifecycle_context
}

#[given("the database version is unset")]
fn database_version_unset(mut lifecycle_context: LifecycleContext) -> LifecycleContext {
    lifecycle_context.config.dbaas.db_version = None;
    lifecycle_context
}

#[given("the state already records server \"{server_id}\"")]
fn recorded_server(
    mut lifecycle_context: LifecycleContext,
    server_id: String,
) -> LifecycleContext {
    lifecycle_context.state.insert(SERVER_ID, server_id);
    lifecycle_context
}

#[given("the provider reports statuses \"{statuses}\"")]
fn provider_statuses(lifecycle_context: LifecycleContext, statuses: String) -> LifecycleContext {
    for status in statuses.split(',').map(str::trim) {
        lifecycle_context.cloud.push_status(status);
    }
    lifecycle_context
}

#[given("the provider keeps reporting \"{status}\"")]
fn provider_keeps_reporting(
    lifecycle_context: LifecycleContext,
    status: String,
) -> LifecycleContext {
    lifecycle_context.cloud.set_default_status(Some(&status));
    lifecycle_context
}

#[when("I launch the resource")]
fn launch_resource(mut lifecycle_context: LifecycleContext) -> Result<LifecycleContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let cloud = lifecycle_context.cloud.clone();
    let policy = lifecycle_context.policy;
    let config = lifecycle_context.config.clone();
    let mut state = lifecycle_context.state.clone();

    let result = runtime.block_on(async {
        match lifecycle_context.kind.clone() {
            KindChoice::Compute => {
                let lifecycle = Lifecycle::new(ComputeKind::new(cloud)).with_policy(policy);
                lifecycle.launch(&config, &mut state).await
            }
            KindChoice::Dbaas => {
                let lifecycle = Lifecycle::new(DbaasKind::new(cloud)).with_policy(policy);
                lifecycle.launch(&config, &mut state).await
            }
            KindChoice::Attachment(volume_id) => {
                let lifecycle =
                    Lifecycle::new(AttachmentKind::new(cloud, volume_id)).with_policy(policy);
                lifecycle.launch(&config, &mut state).await
            }
        }
    });

    lifecycle_context.state = state;
    lifecycle_context.launch = Some(result.map_err(|err| err.to_string()));
    Ok(lifecycle_context)
}

#[when("I terminate the resource")]
fn terminate_resource(
    mut lifecycle_context: LifecycleContext,
) -> Result<LifecycleContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let cloud = lifecycle_context.cloud.clone();
    let policy = lifecycle_context.policy;
    let mut state = lifecycle_context.state.clone();

    let result = runtime.block_on(async {
        match lifecycle_context.kind.clone() {
            KindChoice::Compute => {
                terminate_with(ComputeKind::new(cloud), policy, &mut state).await
            }
            KindChoice::Dbaas => terminate_with(DbaasKind::new(cloud), policy, &mut state).await,
            KindChoice::Attachment(volume_id) => {
                terminate_with(AttachmentKind::new(cloud, volume_id), policy, &mut state).await
            }
        }
    });

    lifecycle_context.state = state;
    lifecycle_context.terminate = Some(result.map_err(|err| err.to_string()));
    Ok(lifecycle_context)
}

async fn terminate_with<K: ResourceKind>(
    kind: K,
    policy: PollPolicy,
    state: &mut StateRecord,
) -> Result<TerminateOutcome, ProvisionError> {
    Lifecycle::new(kind).with_policy(policy).terminate(state).await
}

#[then("the launch succeeds after {polls:u32} polls")]
fn launch_succeeds(lifecycle_context: &LifecycleContext, polls: u32) -> Result<(), StepError> {
    match &lifecycle_context.launch {
        Some(Ok(outcome)) if outcome.polls == polls => Ok(()),
        Some(Ok(outcome)) => Err(StepError::Assertion(format!(
            "expected {polls} polls, got {}",
            outcome.polls
        ))),
        Some(Err(message)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("missing launch outcome"))),
    }
}

#[then("the launch fails with an error mentioning \"{fragment}\"")]
fn launch_fails(lifecycle_context: &LifecycleContext, fragment: String) -> Result<(), StepError> {
    match &lifecycle_context.launch {
        Some(Err(message)) if message.contains(&fragment) => Ok(()),
        Some(Err(message)) => Err(StepError::Assertion(format!(
            "expected error mentioning {fragment}, got: {message}"
        ))),
        Some(Ok(outcome)) => Err(StepError::Assertion(format!(
            "expected failure, got success for {}",
            outcome.resource_id
        ))),
        None => Err(StepError::Assertion(String::from("missing launch outcome"))),
    }
}

#[then("the state records the server id")]
fn state_has_server_id(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    match lifecycle_context.state.server_id() {
        Some(RESOURCE_ID) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected recorded server id, got {other:?}"
        ))),
    }
}

#[then("the state has no server id")]
fn state_without_server_id(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    lifecycle_context.state.server_id().map_or(Ok(()), |id| {
        Err(StepError::Assertion(format!("server id {id} should be forgotten")))
    })
}

#[then("the state records hostname \"{address}\"")]
fn state_has_hostname(lifecycle_context: &LifecycleContext, address: String) -> Result<(), StepError> {
    let hostname = lifecycle_context.state.hostname();
    if hostname == Some(address.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected hostname {address}, got {hostname:?}"
        )))
    }
}

#[then("the state has no hostname")]
fn state_without_hostname(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    lifecycle_context.state.hostname().map_or(Ok(()), |hostname| {
        Err(StepError::Assertion(format!(
            "hostname {hostname} should not be recorded"
        )))
    })
}

#[then("the instance request carries the kitchen tag")]
fn instance_request_tagged(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let requests = lifecycle_context.cloud.instance_requests();
    let request = requests
        .first()
        .ok_or_else(|| StepError::Assertion(String::from("missing launch request")))?;
    match request.freeform_tags.get("kitchen").map(String::as_str) {
        Some("true") => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected kitchen tag, got {other:?}"
        ))),
    }
}

#[then("the database request hostname has at most {limit:usize} characters")]
fn database_hostname_bounded(
    lifecycle_context: &LifecycleContext,
    limit: usize,
) -> Result<(), StepError> {
    let requests = lifecycle_context.cloud.db_system_requests();
    let hostname = requests
        .first()
        .and_then(|request| request.hostname.clone())
        .ok_or_else(|| StepError::Assertion(String::from("missing database hostname")))?;
    if hostname.chars().count() <= limit {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "hostname {hostname} exceeds {limit} characters"
        )))
    }
}

#[then("the effective configuration carries a generated admin password")]
fn admin_password_generated(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let Some(Ok(outcome)) = &lifecycle_context.launch else {
        return Err(StepError::Assertion(String::from(
            "expected successful launch",
        )));
    };
    match outcome.config.dbaas.admin_password.as_deref() {
        Some(password) if !password.is_empty() => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected generated password, got {other:?}"
        ))),
    }
}

#[then("nothing was submitted")]
fn nothing_submitted(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let operations = lifecycle_context.cloud.operations();
    let launched = operations
        .iter()
        .any(|operation| operation.starts_with("launch_") || *operation == "attach_volume");
    if launched {
        Err(StepError::Assertion(format!(
            "expected no submission, got {operations:?}"
        )))
    } else {
        Ok(())
    }
}

#[then("the termination completes after {polls:u32} polls")]
fn termination_completes(
    lifecycle_context: &LifecycleContext,
    polls: u32,
) -> Result<(), StepError> {
    match &lifecycle_context.terminate {
        Some(Ok(outcome)) if outcome.polls == polls => Ok(()),
        Some(Ok(outcome)) => Err(StepError::Assertion(format!(
            "expected {polls} polls, got {}",
            outcome.polls
        ))),
        Some(Err(message)) => Err(StepError::Assertion(format!(
            "expected teardown to succeed, got: {message}"
        ))),
        None => Err(StepError::Assertion(String::from(
            "missing terminate outcome",
        ))),
    }
}

#[then("no provider calls were made")]
fn no_provider_calls(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let calls = lifecycle_context.cloud.calls();
    if calls.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no calls, got {calls:?}"
        )))
    }
}

#[then("the state records an iscsi attachment for volume \"{volume}\" on port {port:u16}")]
fn iscsi_attachment_recorded(
    lifecycle_context: &LifecycleContext,
    volume: String,
    port: u16,
) -> Result<(), StepError> {
    let attachment = lifecycle_context
        .state
        .attachment(&volume)
        .ok_or_else(|| StepError::Assertion(format!("no attachment recorded for {volume}")))?;
    if attachment.port == Some(port) && attachment.iqn.is_some() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "unexpected attachment state: {attachment:?}"
        )))
    }
}

#[then("the state has no attachment for volume \"{volume}\"")]
fn attachment_forgotten(
    lifecycle_context: &LifecycleContext,
    volume: String,
) -> Result<(), StepError> {
    lifecycle_context.state.attachment(&volume).map_or(Ok(()), |attachment| {
        Err(StepError::Assertion(format!(
            "attachment {} should be forgotten",
            attachment.attachment_id
        )))
    })
}
