//! Provisioning engine for OCI-backed test kitchens.
//!
//! Given a declarative [`DriverConfig`] the engine assembles a launch
//! request through an ordered builder pipeline, submits it through a client
//! trait, polls until the resource is ready and records its identifier and
//! reachable address in a [`StateRecord`]. Teardown terminates the resource
//! and polls until the provider reports it gone.
//!
//! Three resource kinds are provided: compute instances, database systems
//! and block volume attachments. Each plugs into the shared [`Lifecycle`]
//! controller through [`ResourceKind`].

pub mod bootstrap;
pub mod client;
pub mod cloud_init;
pub mod config;
pub mod driver_config;
pub mod error;
pub mod files;
pub mod kinds;
pub mod lifecycle;
pub mod network;
pub mod pipeline;
pub mod request;
pub mod secrets;
pub mod state;
pub mod test_support;

pub use bootstrap::{BootstrapParams, BootstrapRenderer};
pub use client::{BlockStorageApi, ClientError, ComputeApi, DatabaseApi, NetworkApi};
pub use config::{ConfigError, LifecycleConfig};
pub use driver_config::{DriverConfig, UserData, UserDataItem};
pub use error::ProvisionError;
pub use kinds::{AttachmentKind, ComputeKind, DbaasKind};
pub use lifecycle::{
    LaunchOutcome, LaunchPhase, Lifecycle, PollPolicy, ResourceKind, TerminateOutcome,
    TerminatePhase,
};
pub use network::NetworkResolver;
pub use secrets::SecretGenerator;
pub use state::StateRecord;
