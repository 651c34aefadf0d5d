//! Block volume attachment kind.
//!
//! Unlike the launch kinds this one augments an instance that already
//! exists: the host instance comes from `server_id` in the state record and
//! the result is an attachment fragment rather than an address.

use crate::client::BlockStorageApi;
use crate::config::LifecycleConfig;
use crate::driver_config::{DriverConfig, VolumeConfig};
use crate::error::ProvisionError;
use crate::lifecycle::{KindFuture, PollPolicy, ResourceKind, StatusSet};
use crate::pipeline::{BuilderStep, LaunchContext, Pipeline};
use crate::request::AttachVolumeDetails;
use crate::state::{StateRecord, VolumeAttachmentState};

const LABEL: &str = "volume_attachment";

/// Status vocabulary of volume attachments.
pub const ATTACHMENT_STATUSES: StatusSet = StatusSet {
    ready: &["ATTACHED"],
    gone: &["DETACHING", "DETACHED"],
    launch_failure: &["DETACHING", "DETACHED"],
};

/// Attaches one configured volume to the instance recorded in state.
#[derive(Debug)]
pub struct AttachmentKind<C> {
    client: C,
    volume_id: String,
}

impl<C> AttachmentKind<C> {
    /// Creates the kind for `volume_id`, which must appear in the
    /// configuration's `volumes` list.
    #[must_use]
    pub fn new(client: C, volume_id: impl Into<String>) -> Self {
        Self {
            client,
            volume_id: volume_id.into(),
        }
    }

    /// Volume this kind attaches.
    #[must_use]
    pub fn volume_id(&self) -> &str {
        &self.volume_id
    }

    fn volume<'c>(&self, config: &'c DriverConfig) -> Result<&'c VolumeConfig, ProvisionError> {
        config
            .volume(&self.volume_id)
            .ok_or_else(|| ProvisionError::missing(format!("volumes[{}]", self.volume_id)))
    }
}

/// Attachment steps, in order.
#[must_use]
pub fn attachment_steps() -> Vec<BuilderStep<AttachVolumeDetails>> {
    vec![
        BuilderStep::new("instance_id", instance_id),
        BuilderStep::new("volume_details", volume_details),
    ]
}

fn instance_id(
    ctx: &mut LaunchContext,
    request: &mut AttachVolumeDetails,
) -> Result<(), ProvisionError> {
    let host = ctx
        .host_instance_id
        .as_deref()
        .ok_or_else(|| ProvisionError::missing("server_id"))?;
    host.clone_into(&mut request.instance_id);
    Ok(())
}

fn volume_details(
    ctx: &mut LaunchContext,
    request: &mut AttachVolumeDetails,
) -> Result<(), ProvisionError> {
    let volume = ctx
        .volume
        .as_ref()
        .ok_or_else(|| ProvisionError::missing("volumes"))?;
    let attachment_type = volume.attachment_type;
    request.attachment_type = attachment_type.provider_name().to_owned();
    request.display_name = volume
        .display_name
        .clone()
        .unwrap_or_else(|| attachment_type.default_display_name().to_owned());
    request.volume_id.clone_from(&volume.volume_id);
    request.is_read_only = volume.read_only;
    Ok(())
}

impl<C> ResourceKind for AttachmentKind<C>
where
    C: BlockStorageApi,
{
    type Request = AttachVolumeDetails;

    fn label(&self) -> &'static str {
        LABEL
    }

    fn default_poll_policy(&self) -> PollPolicy {
        PollPolicy::ATTACHMENT
    }

    fn configured_poll_policy(&self, settings: &LifecycleConfig) -> PollPolicy {
        settings.attachment_policy()
    }

    fn statuses(&self) -> StatusSet {
        ATTACHMENT_STATUSES
    }

    fn pipeline(&self) -> Pipeline<AttachVolumeDetails> {
        Pipeline::new(attachment_steps())
    }

    fn prepare<'a>(
        &'a self,
        ctx: &'a mut LaunchContext,
        state: &'a StateRecord,
    ) -> KindFuture<'a, ()> {
        Box::pin(async move {
            let host = state
                .server_id()
                .ok_or_else(|| ProvisionError::missing("server_id"))?;
            ctx.host_instance_id = Some(host.to_owned());
            ctx.volume = Some(self.volume(&ctx.config)?.clone());
            Ok(())
        })
    }

    fn submit<'a>(&'a self, request: &'a AttachVolumeDetails) -> KindFuture<'a, String> {
        Box::pin(async move {
            self.client
                .attach_volume(request)
                .await
                .map(|attachment| attachment.id)
                .map_err(|err| ProvisionError::submission(LABEL, &err))
        })
    }

    fn status<'a>(&'a self, resource_id: &'a str) -> KindFuture<'a, Option<String>> {
        Box::pin(async move {
            let attachment = self.client.get_volume_attachment(resource_id).await?;
            Ok(attachment.map(|found| found.lifecycle_state))
        })
    }

    fn record_submission(&self, ctx: &LaunchContext, resource_id: &str, state: &mut StateRecord) {
        let attachment_type = ctx
            .volume
            .as_ref()
            .map(|volume| volume.attachment_type)
            .unwrap_or_default();
        state.upsert_attachment(VolumeAttachmentState {
            volume_id: self.volume_id.clone(),
            attachment_id: resource_id.to_owned(),
            attachment_type,
            ..VolumeAttachmentState::default()
        });
    }

    fn resolve_state<'a>(
        &'a self,
        ctx: &'a LaunchContext,
        resource_id: &'a str,
        state: &'a mut StateRecord,
    ) -> KindFuture<'a, ()> {
        Box::pin(async move {
            let attachment = self
                .client
                .get_volume_attachment(resource_id)
                .await?
                .ok_or_else(|| ProvisionError::Client {
                    message: format!("volume attachment {resource_id} disappeared"),
                })?;
            let attachment_type = self.volume(&ctx.config)?.attachment_type;
            state.upsert_attachment(VolumeAttachmentState {
                volume_id: self.volume_id.clone(),
                attachment_id: attachment.id,
                attachment_type,
                iqn: attachment.iqn,
                iqn_ipv4: attachment.ipv4,
                port: attachment.port,
            });
            Ok(())
        })
    }

    fn terminate<'a>(&'a self, resource_id: &'a str) -> KindFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .detach_volume(resource_id)
                .await
                .map_err(|err| ProvisionError::submission(LABEL, &err))
        })
    }

    fn stored_id(&self, state: &StateRecord) -> Option<String> {
        state
            .attachment(&self.volume_id)
            .map(|attachment| attachment.attachment_id.clone())
    }

    fn forget(&self, _resource_id: &str, state: &mut StateRecord) {
        state.remove_attachment(&self.volume_id);
    }
}
