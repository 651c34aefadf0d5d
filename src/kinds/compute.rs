//! Compute instance kind.

use std::fmt;
use std::sync::Arc;

use crate::bootstrap::{BOOTSTRAP_CONTENT_TYPE, BOOTSTRAP_FILENAME, BootstrapParams, BootstrapRenderer};
use crate::client::{ComputeApi, NetworkApi};
use crate::cloud_init;
use crate::config::LifecycleConfig;
use crate::driver_config::{DriverConfig, UserData, UserDataItem};
use crate::error::ProvisionError;
use crate::files;
use crate::lifecycle::{KindFuture, PollPolicy, ResourceKind, StatusSet};
use crate::network::{self, NetworkResolver};
use crate::pipeline::{BuilderStep, LaunchContext, Pipeline, shared_steps};
use crate::request::{
    CreateVnicDetails, InstanceSourceViaImageDetails, LaunchInstanceDetails,
    LaunchInstanceShapeConfigDetails, PreemptibleInstanceConfigDetails, PreemptionAction,
};
use crate::secrets::{SecretGenerator, WINRM_SPECIAL_CHARS};
use crate::state::{HOSTNAME, PASSWORD, StateRecord, USERNAME};

const LABEL: &str = "compute";

/// Maximum length of a DNS hostname label.
pub const HOSTNAME_LIMIT: usize = 63;

/// Random lowercase characters appended to the hostname prefix.
pub const HOSTNAME_SUFFIX_LENGTH: usize = 6;

/// Baseline used when the shape config does not name one.
pub const DEFAULT_BASELINE_OCPU_UTILIZATION: &str = "BASELINE_1_1";

/// Status vocabulary of compute instances.
pub const COMPUTE_STATUSES: StatusSet = StatusSet {
    ready: &["RUNNING"],
    gone: &["TERMINATING", "TERMINATED"],
    launch_failure: &["TERMINATING", "TERMINATED"],
};

/// Compute instances launched from an image.
pub struct ComputeKind<C> {
    client: C,
    bootstrap: Option<Arc<dyn BootstrapRenderer>>,
}

impl<C> ComputeKind<C> {
    /// Creates the kind around a client that speaks both compute and
    /// network APIs.
    #[must_use]
    pub const fn new(client: C) -> Self {
        Self {
            client,
            bootstrap: None,
        }
    }

    /// Supplies the renderer used when `setup_winrm` is set.
    #[must_use]
    pub fn with_bootstrap(mut self, renderer: impl BootstrapRenderer + 'static) -> Self {
        self.bootstrap = Some(Arc::new(renderer));
        self
    }
}

impl<C: fmt::Debug> fmt::Debug for ComputeKind<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeKind")
            .field("client", &self.client)
            .field("bootstrap", &self.bootstrap.is_some())
            .finish()
    }
}

/// Compute-specific steps, in order.
#[must_use]
pub fn compute_steps() -> Vec<BuilderStep<LaunchInstanceDetails>> {
    vec![
        BuilderStep::new("hostname_display_name", hostname_display_name),
        BuilderStep::new("instance_source_details", instance_source_details),
        BuilderStep::new("inject_bootstrap", inject_bootstrap),
        BuilderStep::new("instance_metadata", instance_metadata),
        BuilderStep::new("preemptible_instance_config", preemptible_instance_config),
        BuilderStep::new("shape_config", shape_config),
    ]
}

/// Derives `<prefix>-<6 lowercase>`, truncating the prefix so the result is
/// a valid hostname label.
#[must_use]
pub fn compute_hostname(prefix: Option<&str>, secrets: &mut SecretGenerator) -> String {
    let suffix = secrets.random_string(HOSTNAME_SUFFIX_LENGTH);
    match prefix.filter(|value| !value.is_empty()) {
        None => suffix,
        Some(value) => {
            let room = HOSTNAME_LIMIT - HOSTNAME_SUFFIX_LENGTH - 1;
            let trimmed: String = value.chars().take(room).collect();
            format!("{trimmed}-{suffix}")
        }
    }
}

fn hostname_display_name(
    ctx: &mut LaunchContext,
    request: &mut LaunchInstanceDetails,
) -> Result<(), ProvisionError> {
    let name = compute_hostname(ctx.config.hostname_prefix.as_deref(), &mut ctx.secrets);
    let subnet_id = ctx.config.require_subnet_id()?.to_owned();
    request.create_vnic_details = Some(CreateVnicDetails {
        assign_public_ip: ctx.public_ip_allowed,
        display_name: name.clone(),
        hostname_label: name.clone(),
        nsg_ids: ctx.config.nsg_ids.clone(),
        subnet_id,
    });
    request.display_name = Some(name);
    Ok(())
}

fn instance_source_details(
    ctx: &mut LaunchContext,
    request: &mut LaunchInstanceDetails,
) -> Result<(), ProvisionError> {
    let image_id = DriverConfig::require(ctx.config.image_id.as_deref(), "image_id")?;
    request.source_details = Some(InstanceSourceViaImageDetails {
        source_type: String::from("image"),
        image_id: image_id.to_owned(),
        boot_volume_size_in_gbs: ctx.config.boot_volume_size_in_gbs,
    });
    Ok(())
}

fn inject_bootstrap(
    ctx: &mut LaunchContext,
    request: &mut LaunchInstanceDetails,
) -> Result<(), ProvisionError> {
    if !ctx.config.setup_winrm {
        return Ok(());
    }
    let renderer = ctx
        .bootstrap
        .clone()
        .ok_or_else(|| ProvisionError::missing("bootstrap_renderer"))?;
    let password = DriverConfig::require(ctx.config.winrm_password.as_deref(), "winrm_password")?;
    let params = BootstrapParams {
        username: ctx.config.winrm_user.clone(),
        password: password.to_owned(),
        hostname: request.display_name.clone(),
    };
    let script = UserDataItem::inline(
        BOOTSTRAP_CONTENT_TYPE,
        BOOTSTRAP_FILENAME,
        renderer.render(&params),
    );

    let mut parts = match ctx.config.user_data.take() {
        None => Vec::new(),
        Some(UserData::Inline(text)) if text.is_empty() => Vec::new(),
        Some(UserData::Inline(text)) => vec![promote_inline(text)],
        Some(UserData::Parts(parts)) => parts,
    };
    parts.push(script);
    ctx.config.user_data = Some(UserData::Parts(parts));
    Ok(())
}

fn promote_inline(text: String) -> UserDataItem {
    let content_type = if text.starts_with("#cloud-config") {
        "cloud-config"
    } else {
        "x-shellscript"
    };
    UserDataItem::inline(content_type, "user_data", text)
}

fn instance_metadata(
    ctx: &mut LaunchContext,
    request: &mut LaunchInstanceDetails,
) -> Result<(), ProvisionError> {
    let mut metadata = ctx.config.custom_metadata.clone();
    let keypath = ctx
        .config
        .ssh_keypath
        .as_deref()
        .ok_or_else(|| ProvisionError::missing("ssh_keypath"))?;
    metadata.insert(
        String::from("ssh_authorized_keys"),
        files::read_first_line(keypath)?,
    );
    if let Some(payload) =
        cloud_init::encode_user_data(ctx.config.user_data.as_ref(), &mut ctx.secrets)?
    {
        metadata.insert(String::from("user_data"), payload);
    }
    request.metadata = metadata;
    Ok(())
}

fn preemptible_instance_config(
    ctx: &mut LaunchContext,
    request: &mut LaunchInstanceDetails,
) -> Result<(), ProvisionError> {
    if ctx.config.preemptible_instance {
        request.preemptible_instance_config = Some(PreemptibleInstanceConfigDetails {
            preemption_action: PreemptionAction {
                action_type: String::from("TERMINATE"),
                preserve_boot_volume: true,
            },
        });
    }
    Ok(())
}

fn shape_config(
    ctx: &mut LaunchContext,
    request: &mut LaunchInstanceDetails,
) -> Result<(), ProvisionError> {
    let Some(shape) = ctx.config.shape_config.as_ref() else {
        return Ok(());
    };
    if shape.ocpus.is_none()
        && shape.memory_in_gbs.is_none()
        && shape.baseline_ocpu_utilization.is_none()
    {
        return Ok(());
    }
    request.shape_config = Some(LaunchInstanceShapeConfigDetails {
        ocpus: shape.ocpus,
        memory_in_gbs: shape.memory_in_gbs,
        baseline_ocpu_utilization: shape
            .baseline_ocpu_utilization
            .clone()
            .unwrap_or_else(|| DEFAULT_BASELINE_OCPU_UTILIZATION.to_owned()),
    });
    Ok(())
}

impl<C> ResourceKind for ComputeKind<C>
where
    C: ComputeApi + NetworkApi,
{
    type Request = LaunchInstanceDetails;

    fn label(&self) -> &'static str {
        LABEL
    }

    fn default_poll_policy(&self) -> PollPolicy {
        PollPolicy::COMPUTE
    }

    fn configured_poll_policy(&self, settings: &LifecycleConfig) -> PollPolicy {
        settings.compute_policy()
    }

    fn statuses(&self) -> StatusSet {
        COMPUTE_STATUSES
    }

    fn pipeline(&self) -> Pipeline<LaunchInstanceDetails> {
        Pipeline::new(shared_steps()).then(compute_steps())
    }

    fn prepare<'a>(
        &'a self,
        ctx: &'a mut LaunchContext,
        state: &'a StateRecord,
    ) -> KindFuture<'a, ()> {
        Box::pin(async move {
            let subnet_id = ctx.config.require_subnet_id()?.to_owned();
            ctx.public_ip_allowed = network::public_ip_allowed(&self.client, &subnet_id).await?;
            ctx.bootstrap.clone_from(&self.bootstrap);

            if ctx.config.setup_winrm {
                let password = ctx
                    .config
                    .winrm_password
                    .clone()
                    .filter(|value| !value.is_empty())
                    .or_else(|| state.get(PASSWORD).map(str::to_owned))
                    .unwrap_or_else(|| ctx.secrets.random_password(WINRM_SPECIAL_CHARS));
                ctx.config.winrm_password = Some(password);
            }
            Ok(())
        })
    }

    fn submit<'a>(&'a self, request: &'a LaunchInstanceDetails) -> KindFuture<'a, String> {
        Box::pin(async move {
            self.client
                .launch_instance(request)
                .await
                .map(|instance| instance.id)
                .map_err(|err| ProvisionError::submission(LABEL, &err))
        })
    }

    fn status<'a>(&'a self, resource_id: &'a str) -> KindFuture<'a, Option<String>> {
        Box::pin(async move {
            let instance = self.client.get_instance(resource_id).await?;
            Ok(instance.map(|found| found.lifecycle_state))
        })
    }

    fn resolve_state<'a>(
        &'a self,
        ctx: &'a LaunchContext,
        resource_id: &'a str,
        state: &'a mut StateRecord,
    ) -> KindFuture<'a, ()> {
        Box::pin(async move {
            let compartment_id = ctx.config.require_compartment_id()?;
            let resolver = NetworkResolver::new(&self.client, ctx.public_ip_allowed);
            let address = resolver
                .instance_address(
                    &self.client,
                    compartment_id,
                    resource_id,
                    ctx.config.use_private_ip,
                )
                .await?;
            state.insert(HOSTNAME, address.to_string());

            if ctx.config.setup_winrm {
                state.insert(USERNAME, ctx.config.winrm_user.as_str());
                if let Some(password) = ctx.config.winrm_password.as_deref() {
                    state.insert(PASSWORD, password);
                }
            }
            Ok(())
        })
    }

    fn terminate<'a>(&'a self, resource_id: &'a str) -> KindFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .terminate_instance(resource_id)
                .await
                .map_err(|err| ProvisionError::submission(LABEL, &err))
        })
    }
}
