//! Ordered builder steps that assemble a launch request.
//!
//! Each resource kind declares a fixed list of [`BuilderStep`]s: the shared
//! steps from [`shared_steps`] first, then its own. [`Pipeline::run`]
//! applies every step in order to a fresh request. Steps may write computed
//! defaults back into the effective configuration held by
//! [`LaunchContext`], which later steps (and the lifecycle) read.

mod common;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::bootstrap::BootstrapRenderer;
use crate::driver_config::{DriverConfig, VolumeConfig};
use crate::error::ProvisionError;
use crate::secrets::SecretGenerator;

pub use common::{KITCHEN_TAG, process_freeform_tags, shared_steps};

/// Working state for one provisioning attempt.
pub struct LaunchContext {
    /// Effective configuration; steps fill in missing defaults here.
    pub config: DriverConfig,
    /// Random source for names and credentials.
    pub secrets: SecretGenerator,
    /// Whether the target subnet allows public addresses. Resolved once
    /// before the pipeline runs.
    pub public_ip_allowed: bool,
    /// Instance a volume is attached to, for attachment kinds.
    pub host_instance_id: Option<String>,
    /// Volume being attached, for attachment kinds.
    pub volume: Option<VolumeConfig>,
    /// Renderer for the Windows bootstrap script.
    pub bootstrap: Option<Arc<dyn BootstrapRenderer>>,
}

impl LaunchContext {
    /// Creates a context around a copy of the caller's configuration.
    #[must_use]
    pub fn new(config: DriverConfig, secrets: SecretGenerator) -> Self {
        Self {
            config,
            secrets,
            public_ip_allowed: false,
            host_instance_id: None,
            volume: None,
            bootstrap: None,
        }
    }
}

impl fmt::Debug for LaunchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchContext")
            .field("public_ip_allowed", &self.public_ip_allowed)
            .field("host_instance_id", &self.host_instance_id)
            .field("volume", &self.volume)
            .field("bootstrap", &self.bootstrap.is_some())
            .finish_non_exhaustive()
    }
}

/// Signature of a builder step.
pub type StepFn<R> = fn(&mut LaunchContext, &mut R) -> Result<(), ProvisionError>;

/// A named unit that fills part of a launch request.
pub struct BuilderStep<R> {
    name: &'static str,
    apply: StepFn<R>,
}

impl<R> BuilderStep<R> {
    /// Creates a step.
    #[must_use]
    pub const fn new(name: &'static str, apply: StepFn<R>) -> Self {
        Self { name, apply }
    }

    /// Name used in logs and ordering assertions.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Applies the step.
    ///
    /// # Errors
    ///
    /// Propagates the step's [`ProvisionError`].
    pub fn apply(&self, ctx: &mut LaunchContext, request: &mut R) -> Result<(), ProvisionError> {
        (self.apply)(ctx, request)
    }
}

impl<R> Clone for BuilderStep<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for BuilderStep<R> {}

impl<R> fmt::Debug for BuilderStep<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BuilderStep").field(&self.name).finish()
    }
}

/// Fixed, ordered list of builder steps for one request type.
#[derive(Clone, Debug)]
pub struct Pipeline<R> {
    steps: Vec<BuilderStep<R>>,
}

impl<R: Default> Pipeline<R> {
    /// Creates a pipeline from an ordered step list.
    #[must_use]
    pub const fn new(steps: Vec<BuilderStep<R>>) -> Self {
        Self { steps }
    }

    /// Appends steps after the existing ones.
    #[must_use]
    pub fn then(mut self, steps: impl IntoIterator<Item = BuilderStep<R>>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(BuilderStep::name).collect()
    }

    /// Applies every step, in order, to a fresh request.
    ///
    /// # Errors
    ///
    /// Stops at the first failing step and returns its error; no partial
    /// request escapes.
    pub fn run(&self, ctx: &mut LaunchContext) -> Result<R, ProvisionError> {
        let mut request = R::default();
        for step in &self.steps {
            debug!(step = step.name, "applying builder step");
            step.apply(ctx, &mut request)?;
        }
        Ok(request)
    }
}
