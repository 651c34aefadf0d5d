//! Launch and terminate state machines shared by every resource kind.
//!
//! A launch moves through `NotStarted → Building → Submitted → Polling →
//! Ready`, and a teardown through `Running → TerminateSubmitted → Polling →
//! Gone`. Any error moves either machine to `Failed` and is returned to the
//! caller unchanged. Submissions are never retried.
//!
//! The kind-specific parts (request shape, client calls, terminal statuses)
//! come from a [`ResourceKind`] implementation.

mod poll;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tracing::{info, warn};

use crate::config::LifecycleConfig;
use crate::driver_config::DriverConfig;
use crate::error::ProvisionError;
use crate::pipeline::{LaunchContext, Pipeline};
use crate::secrets::SecretGenerator;
use crate::state::{HOSTNAME, SERVER_ID, StateRecord};

pub use poll::{Goal, PollPolicy, StatusSet, WaitTarget, wait_for};

/// Future returned by kind operations.
pub type KindFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProvisionError>> + Send + 'a>>;

/// Per-kind behaviour plugged into [`Lifecycle`].
pub trait ResourceKind: Send + Sync {
    /// Launch-request shape built by the pipeline.
    type Request: Default + Send + Sync;

    /// Short label used in logs and errors (for example `compute`).
    fn label(&self) -> &'static str;

    /// Cadence used when no explicit policy is configured.
    fn default_poll_policy(&self) -> PollPolicy;

    /// Cadence taken from engine settings.
    fn configured_poll_policy(&self, settings: &LifecycleConfig) -> PollPolicy;

    /// Status vocabulary for polling.
    fn statuses(&self) -> StatusSet;

    /// Ordered builder steps: shared steps first, then the kind's own.
    fn pipeline(&self) -> Pipeline<Self::Request>;

    /// Resolves run-wide facts (subnet policy, credentials, host instance)
    /// before the pipeline runs.
    fn prepare<'a>(
        &'a self,
        ctx: &'a mut LaunchContext,
        state: &'a StateRecord,
    ) -> KindFuture<'a, ()>;

    /// Submits the request and returns the new resource identifier.
    fn submit<'a>(&'a self, request: &'a Self::Request) -> KindFuture<'a, String>;

    /// Fetches the current status, or `None` when the resource is unknown.
    fn status<'a>(&'a self, resource_id: &'a str) -> KindFuture<'a, Option<String>>;

    /// Populates the state record once the resource is ready.
    fn resolve_state<'a>(
        &'a self,
        ctx: &'a LaunchContext,
        resource_id: &'a str,
        state: &'a mut StateRecord,
    ) -> KindFuture<'a, ()>;

    /// Requests teardown.
    fn terminate<'a>(&'a self, resource_id: &'a str) -> KindFuture<'a, ()>;

    /// Records the identifier as soon as submission succeeds.
    fn record_submission(&self, _ctx: &LaunchContext, resource_id: &str, state: &mut StateRecord) {
        state.insert(SERVER_ID, resource_id);
    }

    /// Identifier to tear down, if one was recorded.
    fn stored_id(&self, state: &StateRecord) -> Option<String> {
        state.server_id().map(str::to_owned)
    }

    /// Drops the kind's entries once teardown completes.
    fn forget(&self, _resource_id: &str, state: &mut StateRecord) {
        state.remove(SERVER_ID);
        state.remove(HOSTNAME);
    }
}

/// Phases of a launch.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LaunchPhase {
    /// Nothing has happened yet.
    NotStarted,
    /// Resolving prerequisites and running the pipeline.
    Building,
    /// The provider accepted the request.
    Submitted,
    /// Waiting for the ready status.
    Polling,
    /// The resource is ready and the state record is populated.
    Ready,
    /// The launch stopped with an error.
    Failed,
}

impl fmt::Display for LaunchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not_started",
            Self::Building => "building",
            Self::Submitted => "submitted",
            Self::Polling => "polling",
            Self::Ready => "ready",
            Self::Failed => "failed",
        })
    }
}

/// Phases of a teardown.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TerminatePhase {
    /// The resource is believed to exist.
    Running,
    /// The provider accepted the terminate request.
    TerminateSubmitted,
    /// Waiting for the gone status.
    Polling,
    /// The resource is gone.
    Gone,
    /// The teardown stopped with an error.
    Failed,
}

impl fmt::Display for TerminatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::TerminateSubmitted => "terminate_submitted",
            Self::Polling => "polling",
            Self::Gone => "gone",
            Self::Failed => "failed",
        })
    }
}

/// Result of a successful launch.
#[derive(Clone, Debug, PartialEq)]
pub struct LaunchOutcome {
    /// Identifier returned by the provider.
    pub resource_id: String,
    /// Number of status polls performed.
    pub polls: u32,
    /// Effective configuration, including generated defaults.
    pub config: DriverConfig,
}

/// Result of a teardown.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TerminateOutcome {
    /// Identifier torn down, or `None` when nothing was recorded.
    pub resource_id: Option<String>,
    /// Number of status polls performed.
    pub polls: u32,
}

/// Drives a [`ResourceKind`] through launch and teardown.
#[derive(Debug)]
pub struct Lifecycle<K> {
    kind: K,
    policy: PollPolicy,
    seed: Option<u64>,
}

impl<K: ResourceKind> Lifecycle<K> {
    /// Creates a controller using the kind's default poll policy.
    pub fn new(kind: K) -> Self {
        let policy = kind.default_poll_policy();
        Self {
            kind,
            policy,
            seed: None,
        }
    }

    /// Creates a controller from engine settings: the kind's configured
    /// cadence and, when set, the naming seed.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Config`] when the settings fail
    /// [`LifecycleConfig::validate`].
    pub fn from_settings(kind: K, settings: &LifecycleConfig) -> Result<Self, ProvisionError> {
        settings.validate()?;
        let policy = kind.configured_poll_policy(settings);
        Ok(Self {
            kind,
            policy,
            seed: settings.naming_seed,
        })
    }

    /// Overrides the poll policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Seeds the random source so generated names are reproducible.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The wrapped kind.
    pub const fn kind(&self) -> &K {
        &self.kind
    }

    /// Poll policy in effect.
    pub const fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Builder step names in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.kind.pipeline().step_names()
    }

    /// Builds, submits and waits for a resource, then records it in `state`.
    ///
    /// The caller's configuration is not modified; generated defaults are
    /// returned in [`LaunchOutcome::config`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ProvisionError`] raised while building,
    /// submitting, polling or resolving. When submission succeeded the
    /// identifier is already in `state`.
    pub async fn launch(
        &self,
        config: &DriverConfig,
        state: &mut StateRecord,
    ) -> Result<LaunchOutcome, ProvisionError> {
        let result = self.run_launch(config, state).await;
        if let Err(err) = &result {
            warn!(
                kind = self.kind.label(),
                phase = %LaunchPhase::Failed,
                error = %err,
                "launch failed"
            );
        }
        result
    }

    async fn run_launch(
        &self,
        config: &DriverConfig,
        state: &mut StateRecord,
    ) -> Result<LaunchOutcome, ProvisionError> {
        let kind = self.kind.label();
        let mut ctx = LaunchContext::new(
            config.clone(),
            SecretGenerator::from_seed_or_entropy(self.seed),
        );

        info!(kind, phase = %LaunchPhase::Building, "building launch request");
        self.kind.prepare(&mut ctx, state).await?;
        let request = self.kind.pipeline().run(&mut ctx)?;

        let resource_id = self.kind.submit(&request).await?;
        self.kind.record_submission(&ctx, &resource_id, state);
        info!(kind, resource_id = resource_id.as_str(), phase = %LaunchPhase::Submitted, "launch request accepted");

        info!(kind, resource_id = resource_id.as_str(), phase = %LaunchPhase::Polling, "waiting for resource");
        let statuses = self.kind.statuses();
        let target = WaitTarget {
            kind,
            resource_id: &resource_id,
            goal: Goal::Ready,
            statuses: &statuses,
        };
        let id = resource_id.as_str();
        let polls = wait_for(&self.policy, target, move || self.kind.status(id)).await?;

        self.kind.resolve_state(&ctx, &resource_id, state).await?;
        info!(kind, resource_id = resource_id.as_str(), polls, phase = %LaunchPhase::Ready, "resource ready");

        Ok(LaunchOutcome {
            resource_id,
            polls,
            config: ctx.config,
        })
    }

    /// Tears down the resource recorded in `state` and waits until it is
    /// gone.
    ///
    /// Returns immediately with zero polls when no identifier is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Submission`] when the provider rejects the
    /// request and [`ProvisionError::PollTimeout`] when removal is not
    /// confirmed in time.
    pub async fn terminate(
        &self,
        state: &mut StateRecord,
    ) -> Result<TerminateOutcome, ProvisionError> {
        let kind = self.kind.label();
        let Some(resource_id) = self.kind.stored_id(state) else {
            info!(kind, "no resource recorded, nothing to terminate");
            return Ok(TerminateOutcome {
                resource_id: None,
                polls: 0,
            });
        };

        let result = self.run_terminate(&resource_id, state).await;
        if let Err(err) = &result {
            warn!(
                kind,
                resource_id = resource_id.as_str(),
                phase = %TerminatePhase::Failed,
                error = %err,
                "terminate failed"
            );
        }
        result
    }

    async fn run_terminate(
        &self,
        resource_id: &str,
        state: &mut StateRecord,
    ) -> Result<TerminateOutcome, ProvisionError> {
        let kind = self.kind.label();
        info!(kind, resource_id, phase = %TerminatePhase::Running, "terminating resource");
        self.kind.terminate(resource_id).await?;
        info!(kind, resource_id, phase = %TerminatePhase::TerminateSubmitted, "terminate request accepted");

        info!(kind, resource_id, phase = %TerminatePhase::Polling, "waiting for removal");
        let statuses = self.kind.statuses();
        let target = WaitTarget {
            kind,
            resource_id,
            goal: Goal::Gone,
            statuses: &statuses,
        };
        let polls = wait_for(&self.policy, target, move || self.kind.status(resource_id)).await?;

        self.kind.forget(resource_id, state);
        info!(kind, resource_id, polls, phase = %TerminatePhase::Gone, "resource gone");
        Ok(TerminateOutcome {
            resource_id: Some(resource_id.to_owned()),
            polls,
        })
    }
}
