//! Builder steps shared by every launch kind.

use std::collections::BTreeMap;

use super::{BuilderStep, LaunchContext};
use crate::driver_config::DriverConfig;
use crate::error::ProvisionError;
use crate::request::LaunchDetails;

/// Marker tag stamped on every launched resource.
pub const KITCHEN_TAG: &str = "kitchen";

/// Shared steps, in the order every kind applies them.
#[must_use]
pub fn shared_steps<R: LaunchDetails>() -> Vec<BuilderStep<R>> {
    vec![
        BuilderStep::new("compartment_id", compartment_id::<R>),
        BuilderStep::new("availability_domain", availability_domain::<R>),
        BuilderStep::new("shape", shape::<R>),
        BuilderStep::new("defined_tags", defined_tags::<R>),
        BuilderStep::new("freeform_tags", freeform_tags::<R>),
    ]
}

fn compartment_id<R: LaunchDetails>(
    ctx: &mut LaunchContext,
    request: &mut R,
) -> Result<(), ProvisionError> {
    let value = ctx.config.require_compartment_id()?;
    request.set_compartment_id(value.to_owned());
    Ok(())
}

fn availability_domain<R: LaunchDetails>(
    ctx: &mut LaunchContext,
    request: &mut R,
) -> Result<(), ProvisionError> {
    let value = DriverConfig::require(
        ctx.config.availability_domain.as_deref(),
        "availability_domain",
    )?;
    request.set_availability_domain(value.to_owned());
    Ok(())
}

fn shape<R: LaunchDetails>(ctx: &mut LaunchContext, request: &mut R) -> Result<(), ProvisionError> {
    let value = DriverConfig::require(ctx.config.shape.as_deref(), "shape")?;
    request.set_shape(value.to_owned());
    Ok(())
}

fn defined_tags<R: LaunchDetails>(
    ctx: &mut LaunchContext,
    request: &mut R,
) -> Result<(), ProvisionError> {
    request.set_defined_tags(ctx.config.defined_tags.clone());
    Ok(())
}

fn freeform_tags<R: LaunchDetails>(
    ctx: &mut LaunchContext,
    request: &mut R,
) -> Result<(), ProvisionError> {
    request.set_freeform_tags(process_freeform_tags(&ctx.config));
    Ok(())
}

/// Builds the freeform tag set.
///
/// Configured tags are copied first. The provisioner's run list and policy
/// file then overwrite `run_list` and `policyfile`, and `kitchen` is always
/// set to `true`.
#[must_use]
pub fn process_freeform_tags(config: &DriverConfig) -> BTreeMap<String, String> {
    let mut tags = config.freeform_tags.clone();
    let provisioner = &config.provisioner;
    if !provisioner.run_list.is_empty() {
        tags.insert(String::from("run_list"), provisioner.run_list.join(","));
    }
    if let Some(policyfile) = provisioner.policyfile.as_deref().filter(|p| !p.is_empty()) {
        tags.insert(String::from("policyfile"), policyfile.to_owned());
    }
    tags.insert(String::from(KITCHEN_TAG), String::from("true"));
    tags
}
