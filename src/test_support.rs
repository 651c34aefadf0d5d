//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeMap, VecDeque};
use std::env;
use std::ffi::OsString;
use std::future::ready;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::client::{
    BlockStorageApi, ClientError, ClientFuture, ComputeApi, DatabaseApi, DbNode, DbSystem,
    Instance, NetworkApi, Subnet, Vnic, VnicAttachment, VolumeAttachment,
};
use crate::request::{AttachVolumeDetails, LaunchDbSystemDetails, LaunchInstanceDetails};

/// Records a single call made through [`ScriptedCloud`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientCall {
    /// Trait method name, for example `get_instance`.
    pub operation: &'static str,
    /// Identifier the call targeted, empty for launches.
    pub target: String,
}

impl ClientCall {
    fn new(operation: &'static str, target: &str) -> Self {
        Self {
            operation,
            target: target.to_owned(),
        }
    }
}

#[derive(Debug)]
struct CloudScript {
    resource_id: String,
    statuses: VecDeque<Option<String>>,
    default_status: Option<String>,
    launch_error: Option<String>,
    terminate_error: Option<String>,
    public_ip_allowed: bool,
    vnic_attachments: Vec<VnicAttachment>,
    vnics: BTreeMap<String, Vnic>,
    db_nodes: Vec<DbNode>,
    iscsi_target: (Option<String>, Option<String>, Option<u16>),
    calls: Vec<ClientCall>,
    instance_requests: Vec<LaunchInstanceDetails>,
    db_system_requests: Vec<LaunchDbSystemDetails>,
    attach_requests: Vec<AttachVolumeDetails>,
}

impl Default for CloudScript {
    fn default() -> Self {
        Self {
            resource_id: String::from("ocid1.resource.test"),
            statuses: VecDeque::new(),
            default_status: None,
            launch_error: None,
            terminate_error: None,
            public_ip_allowed: true,
            vnic_attachments: Vec::new(),
            vnics: BTreeMap::new(),
            db_nodes: Vec::new(),
            iscsi_target: (None, None, None),
            calls: Vec::new(),
            instance_requests: Vec::new(),
            db_system_requests: Vec::new(),
            attach_requests: Vec::new(),
        }
    }
}

impl CloudScript {
    fn next_status(&mut self) -> Option<String> {
        self.statuses
            .pop_front()
            .unwrap_or_else(|| self.default_status.clone())
    }

    fn launch_result(&self, operation: &str) -> Result<String, ClientError> {
        self.launch_error.as_ref().map_or_else(
            || Ok(self.resource_id.clone()),
            |message| Err(ClientError::new(operation, message.clone())),
        )
    }

    fn terminate_result(&self, operation: &str) -> Result<(), ClientError> {
        self.terminate_error
            .as_ref()
            .map_or(Ok(()), |message| Err(ClientError::new(operation, message.clone())))
    }
}

/// Scripted cloud that answers every client trait from queued replies.
///
/// Status polls for any resource pop from one FIFO queue; once the queue is
/// empty the default status is returned (`None`, meaning the provider no
/// longer knows the resource, unless changed with
/// [`ScriptedCloud::set_default_status`]). Clones share the same script so a
/// test can keep a handle after moving one into a resource kind.
#[derive(Clone, Debug, Default)]
pub struct ScriptedCloud {
    script: Arc<Mutex<CloudScript>>,
}

impl ScriptedCloud {
    /// Creates a cloud with no queued statuses and public IPs allowed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, CloudScript> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the identifier returned by launch and attach calls.
    pub fn set_resource_id(&self, resource_id: &str) {
        resource_id.clone_into(&mut self.script().resource_id);
    }

    /// Queues a status reply.
    pub fn push_status(&self, status: &str) {
        self.script().statuses.push_back(Some(status.to_owned()));
    }

    /// Queues several status replies in order.
    pub fn push_statuses(&self, statuses: &[&str]) {
        for status in statuses {
            self.push_status(status);
        }
    }

    /// Queues a reply reporting the resource as unknown.
    pub fn push_missing(&self) {
        self.script().statuses.push_back(None);
    }

    /// Sets the reply used once the queue is drained.
    pub fn set_default_status(&self, status: Option<&str>) {
        self.script().default_status = status.map(str::to_owned);
    }

    /// Makes launch and attach calls fail with `message`.
    pub fn fail_launch(&self, message: &str) {
        self.script().launch_error = Some(message.to_owned());
    }

    /// Makes terminate and detach calls fail with `message`.
    pub fn fail_terminate(&self, message: &str) {
        self.script().terminate_error = Some(message.to_owned());
    }

    /// Sets whether subnets permit public addresses.
    pub fn set_public_ip_allowed(&self, allowed: bool) {
        self.script().public_ip_allowed = allowed;
    }

    /// Adds an interface and attaches it to the launched instance.
    pub fn add_vnic(&self, vnic: Vnic) {
        let mut script = self.script();
        let attachment_id = format!("attachment-{}", script.vnic_attachments.len());
        script.vnic_attachments.push(VnicAttachment {
            id: attachment_id,
            vnic_id: Some(vnic.id.clone()),
        });
        script.vnics.insert(vnic.id.clone(), vnic);
    }

    /// Adds an interface and a database node that uses it.
    pub fn add_db_node(&self, vnic: Vnic) {
        let mut script = self.script();
        let node_id = format!("dbnode-{}", script.db_nodes.len());
        script.db_nodes.push(DbNode {
            id: node_id,
            vnic_id: Some(vnic.id.clone()),
        });
        script.vnics.insert(vnic.id.clone(), vnic);
    }

    /// Sets the iSCSI connection details reported for attachments.
    pub fn set_iscsi_target(&self, iqn: &str, ipv4: &str, port: u16) {
        self.script().iscsi_target = (Some(iqn.to_owned()), Some(ipv4.to_owned()), Some(port));
    }

    /// Returns every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ClientCall> {
        self.script().calls.clone()
    }

    /// Returns the operation names recorded so far.
    #[must_use]
    pub fn operations(&self) -> Vec<&'static str> {
        self.script().calls.iter().map(|call| call.operation).collect()
    }

    /// Returns the instance launch requests received.
    #[must_use]
    pub fn instance_requests(&self) -> Vec<LaunchInstanceDetails> {
        self.script().instance_requests.clone()
    }

    /// Returns the database launch requests received.
    #[must_use]
    pub fn db_system_requests(&self) -> Vec<LaunchDbSystemDetails> {
        self.script().db_system_requests.clone()
    }

    /// Returns the attach requests received.
    #[must_use]
    pub fn attach_requests(&self) -> Vec<AttachVolumeDetails> {
        self.script().attach_requests.clone()
    }

    fn record(&self, operation: &'static str, target: &str) -> MutexGuard<'_, CloudScript> {
        let mut script = self.script();
        script.calls.push(ClientCall::new(operation, target));
        script
    }
}

impl ComputeApi for ScriptedCloud {
    fn launch_instance<'a>(
        &'a self,
        details: &'a LaunchInstanceDetails,
    ) -> ClientFuture<'a, Instance> {
        let mut script = self.record("launch_instance", "");
        script.instance_requests.push(details.clone());
        let result = script.launch_result("launch_instance").map(|id| Instance {
            id,
            lifecycle_state: String::from("PROVISIONING"),
        });
        Box::pin(ready(result))
    }

    fn get_instance<'a>(&'a self, instance_id: &'a str) -> ClientFuture<'a, Option<Instance>> {
        let status = self.record("get_instance", instance_id).next_status();
        Box::pin(ready(Ok(status.map(|lifecycle_state| Instance {
            id: instance_id.to_owned(),
            lifecycle_state,
        }))))
    }

    fn terminate_instance<'a>(&'a self, instance_id: &'a str) -> ClientFuture<'a, ()> {
        let result = self
            .record("terminate_instance", instance_id)
            .terminate_result("terminate_instance");
        Box::pin(ready(result))
    }

    fn list_vnic_attachments<'a>(
        &'a self,
        _compartment_id: &'a str,
        instance_id: &'a str,
    ) -> ClientFuture<'a, Vec<VnicAttachment>> {
        let attachments = self
            .record("list_vnic_attachments", instance_id)
            .vnic_attachments
            .clone();
        Box::pin(ready(Ok(attachments)))
    }
}

impl DatabaseApi for ScriptedCloud {
    fn launch_db_system<'a>(
        &'a self,
        details: &'a LaunchDbSystemDetails,
    ) -> ClientFuture<'a, DbSystem> {
        let mut script = self.record("launch_db_system", "");
        script.db_system_requests.push(details.clone());
        let result = script.launch_result("launch_db_system").map(|id| DbSystem {
            id,
            lifecycle_state: String::from("PROVISIONING"),
        });
        Box::pin(ready(result))
    }

    fn get_db_system<'a>(&'a self, db_system_id: &'a str) -> ClientFuture<'a, Option<DbSystem>> {
        let status = self.record("get_db_system", db_system_id).next_status();
        Box::pin(ready(Ok(status.map(|lifecycle_state| DbSystem {
            id: db_system_id.to_owned(),
            lifecycle_state,
        }))))
    }

    fn terminate_db_system<'a>(&'a self, db_system_id: &'a str) -> ClientFuture<'a, ()> {
        let result = self
            .record("terminate_db_system", db_system_id)
            .terminate_result("terminate_db_system");
        Box::pin(ready(result))
    }

    fn list_db_nodes<'a>(
        &'a self,
        _compartment_id: &'a str,
        db_system_id: &'a str,
    ) -> ClientFuture<'a, Vec<DbNode>> {
        let nodes = self.record("list_db_nodes", db_system_id).db_nodes.clone();
        Box::pin(ready(Ok(nodes)))
    }
}

impl NetworkApi for ScriptedCloud {
    fn get_subnet<'a>(&'a self, subnet_id: &'a str) -> ClientFuture<'a, Subnet> {
        let allowed = self.record("get_subnet", subnet_id).public_ip_allowed;
        Box::pin(ready(Ok(Subnet {
            id: subnet_id.to_owned(),
            prohibit_public_ip_on_vnic: !allowed,
        })))
    }

    fn get_vnic<'a>(&'a self, vnic_id: &'a str) -> ClientFuture<'a, Vnic> {
        let vnic = self.record("get_vnic", vnic_id).vnics.get(vnic_id).cloned();
        Box::pin(ready(vnic.ok_or_else(|| {
            ClientError::new("get_vnic", format!("vnic {vnic_id} not found"))
        })))
    }
}

impl BlockStorageApi for ScriptedCloud {
    fn attach_volume<'a>(
        &'a self,
        details: &'a AttachVolumeDetails,
    ) -> ClientFuture<'a, VolumeAttachment> {
        let mut script = self.record("attach_volume", &details.volume_id);
        script.attach_requests.push(details.clone());
        let (iqn, ipv4, port) = script.iscsi_target.clone();
        let result = script.launch_result("attach_volume").map(|id| VolumeAttachment {
            id,
            lifecycle_state: String::from("ATTACHING"),
            iqn,
            ipv4,
            port,
        });
        Box::pin(ready(result))
    }

    fn get_volume_attachment<'a>(
        &'a self,
        attachment_id: &'a str,
    ) -> ClientFuture<'a, Option<VolumeAttachment>> {
        let mut script = self.record("get_volume_attachment", attachment_id);
        let status = script.next_status();
        let (iqn, ipv4, port) = script.iscsi_target.clone();
        Box::pin(ready(Ok(status.map(|lifecycle_state| VolumeAttachment {
            id: attachment_id.to_owned(),
            lifecycle_state,
            iqn,
            ipv4,
            port,
        }))))
    }

    fn detach_volume<'a>(&'a self, attachment_id: &'a str) -> ClientFuture<'a, ()> {
        let result = self
            .record("detach_volume", attachment_id)
            .terminate_result("detach_volume");
        Box::pin(ready(result))
    }
}

/// Serialises every test that reads or writes process environment variables.
static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Temporary environment overrides for a single test.
///
/// Holds the process-wide environment lock until dropped, then puts every
/// touched variable back, newest change first. Repeating a key is allowed;
/// the last value wins and the original is still restored.
pub struct ScopedEnv {
    saved: Vec<(String, Option<OsString>)>,
    _lock: AsyncMutexGuard<'static, ()>,
}

impl ScopedEnv {
    /// Sets each `(key, value)` pair for the lifetime of the guard.
    pub async fn set(vars: &[(&str, &str)]) -> Self {
        Self::apply(vars.iter().map(|&(key, value)| (key, Some(value)))).await
    }

    /// Applies a mix of overrides (`Some`) and removals (`None`).
    pub async fn apply<'v, I>(changes: I) -> Self
    where
        I: IntoIterator<Item = (&'v str, Option<&'v str>)>,
    {
        let lock = ENV_LOCK.lock().await;
        let mut saved: Vec<(String, Option<OsString>)> = Vec::new();
        for (key, value) in changes {
            if !saved.iter().any(|(seen, _)| seen == key) {
                saved.push((key.to_owned(), env::var_os(key)));
            }
            // SAFETY: writers hold `ENV_LOCK`.
            unsafe {
                match value {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
        Self { saved, _lock: lock }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (key, original) in self.saved.iter().rev() {
            // SAFETY: `_lock` is still held while fields drop after this body.
            unsafe {
                match original {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
