//! Boundary to the cloud provider SDK.
//!
//! The engine never talks HTTP itself. It drives implementations of the
//! traits below, one per service, and only relies on the handful of fields
//! modelled here.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::request::{AttachVolumeDetails, LaunchDbSystemDetails, LaunchInstanceDetails};

/// Error reported by a client implementation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{operation} failed: {message}")]
pub struct ClientError {
    /// Client operation that failed (for example `launch_instance`).
    pub operation: String,
    /// Message returned by the SDK or service.
    pub message: String,
}

impl ClientError {
    /// Creates a new client error.
    #[must_use]
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Future returned by client operations.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send + 'a>>;

/// Compute instance as reported by the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instance {
    /// Instance identifier.
    pub id: String,
    /// Lifecycle state (for example `RUNNING`).
    pub lifecycle_state: String,
}

/// Database system as reported by the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DbSystem {
    /// Database system identifier.
    pub id: String,
    /// Lifecycle state (for example `AVAILABLE`).
    pub lifecycle_state: String,
}

/// Database node belonging to a database system.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DbNode {
    /// Node identifier.
    pub id: String,
    /// Interface attached to the node, once assigned.
    pub vnic_id: Option<String>,
}

/// Link between an instance and one of its interfaces.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VnicAttachment {
    /// Attachment identifier.
    pub id: String,
    /// Attached interface, once assigned.
    pub vnic_id: Option<String>,
}

/// Virtual network interface.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Vnic {
    /// Interface identifier.
    pub id: String,
    /// Whether this is the instance's primary interface.
    pub is_primary: bool,
    /// Public address, when one is assigned.
    pub public_ip: Option<String>,
    /// Private address, when one is assigned.
    pub private_ip: Option<String>,
}

/// Subnet settings relevant to address selection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subnet {
    /// Subnet identifier.
    pub id: String,
    /// Whether interfaces in the subnet are barred from public addresses.
    pub prohibit_public_ip_on_vnic: bool,
}

/// Volume attachment as reported by the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeAttachment {
    /// Attachment identifier.
    pub id: String,
    /// Lifecycle state (for example `ATTACHED`).
    pub lifecycle_state: String,
    /// iSCSI target qualified name.
    pub iqn: Option<String>,
    /// iSCSI target address.
    pub ipv4: Option<String>,
    /// iSCSI target port.
    pub port: Option<u16>,
}

/// Compute service operations.
pub trait ComputeApi: Send + Sync {
    /// Submits a launch request and returns the created instance.
    fn launch_instance<'a>(
        &'a self,
        details: &'a LaunchInstanceDetails,
    ) -> ClientFuture<'a, Instance>;

    /// Fetches an instance, returning `None` when it no longer exists.
    fn get_instance<'a>(&'a self, instance_id: &'a str) -> ClientFuture<'a, Option<Instance>>;

    /// Requests termination of an instance.
    fn terminate_instance<'a>(&'a self, instance_id: &'a str) -> ClientFuture<'a, ()>;

    /// Lists the interface attachments of an instance.
    fn list_vnic_attachments<'a>(
        &'a self,
        compartment_id: &'a str,
        instance_id: &'a str,
    ) -> ClientFuture<'a, Vec<VnicAttachment>>;
}

/// Database service operations.
pub trait DatabaseApi: Send + Sync {
    /// Submits a launch request and returns the created database system.
    fn launch_db_system<'a>(
        &'a self,
        details: &'a LaunchDbSystemDetails,
    ) -> ClientFuture<'a, DbSystem>;

    /// Fetches a database system, returning `None` when it no longer exists.
    fn get_db_system<'a>(&'a self, db_system_id: &'a str) -> ClientFuture<'a, Option<DbSystem>>;

    /// Requests termination of a database system.
    fn terminate_db_system<'a>(&'a self, db_system_id: &'a str) -> ClientFuture<'a, ()>;

    /// Lists the nodes of a database system.
    fn list_db_nodes<'a>(
        &'a self,
        compartment_id: &'a str,
        db_system_id: &'a str,
    ) -> ClientFuture<'a, Vec<DbNode>>;
}

/// Virtual network operations.
pub trait NetworkApi: Send + Sync {
    /// Fetches a subnet.
    fn get_subnet<'a>(&'a self, subnet_id: &'a str) -> ClientFuture<'a, Subnet>;

    /// Fetches an interface.
    fn get_vnic<'a>(&'a self, vnic_id: &'a str) -> ClientFuture<'a, Vnic>;
}

/// Block storage attachment operations.
pub trait BlockStorageApi: Send + Sync {
    /// Attaches a volume and returns the new attachment.
    fn attach_volume<'a>(
        &'a self,
        details: &'a AttachVolumeDetails,
    ) -> ClientFuture<'a, VolumeAttachment>;

    /// Fetches an attachment, returning `None` when it no longer exists.
    fn get_volume_attachment<'a>(
        &'a self,
        attachment_id: &'a str,
    ) -> ClientFuture<'a, Option<VolumeAttachment>>;

    /// Requests detachment.
    fn detach_volume<'a>(&'a self, attachment_id: &'a str) -> ClientFuture<'a, ()>;
}
