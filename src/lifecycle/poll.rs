//! Status polling with a doubling interval and a wall-clock ceiling.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::error::ProvisionError;

/// Poll cadence and ceiling for one resource kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    /// Delay before the second poll.
    pub initial_interval: Duration,
    /// Upper bound for the delay between polls.
    pub max_interval: Duration,
    /// Total time allowed before giving up.
    pub max_wait: Duration,
}

impl PollPolicy {
    /// Compute instances: 1s doubling to 30s, 20 minutes in total.
    pub const COMPUTE: Self = Self::new(
        Duration::from_secs(1),
        Duration::from_secs(30),
        Duration::from_secs(20 * 60),
    );

    /// Database systems: 1s doubling to 15 minutes, 6 hours in total.
    pub const DATABASE: Self = Self::new(
        Duration::from_secs(1),
        Duration::from_secs(15 * 60),
        Duration::from_secs(6 * 60 * 60),
    );

    /// Volume attachments share the compute ceiling.
    pub const ATTACHMENT: Self = Self::COMPUTE;

    /// Creates a policy.
    #[must_use]
    pub const fn new(initial_interval: Duration, max_interval: Duration, max_wait: Duration) -> Self {
        Self {
            initial_interval,
            max_interval,
            max_wait,
        }
    }

    fn next_interval(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_interval)
    }
}

/// Provider statuses that drive polling for one kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusSet {
    /// Launch is complete.
    pub ready: &'static [&'static str],
    /// Teardown is complete.
    pub gone: &'static [&'static str],
    /// Launch can no longer succeed.
    pub launch_failure: &'static [&'static str],
}

/// What a wait is for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Goal {
    /// Wait for a ready status. A missing resource keeps polling.
    Ready,
    /// Wait for a gone status or for the resource to disappear.
    Gone,
}

impl Goal {
    fn targets(self, statuses: &StatusSet) -> &'static [&'static str] {
        match self {
            Self::Ready => statuses.ready,
            Self::Gone => statuses.gone,
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ready => "ready",
            Self::Gone => "gone",
        })
    }
}

/// Target of one wait.
#[derive(Clone, Copy, Debug)]
pub struct WaitTarget<'a> {
    /// Kind label used in errors and logs.
    pub kind: &'a str,
    /// Resource being polled.
    pub resource_id: &'a str,
    /// Ready or gone.
    pub goal: Goal,
    /// Status vocabulary of the kind.
    pub statuses: &'a StatusSet,
}

/// Polls `fetch` until `target` is reached and returns the number of polls.
///
/// `fetch` yields the current status, or `None` when the provider no longer
/// knows the resource.
///
/// # Errors
///
/// Returns [`ProvisionError::UnexpectedStatus`] when a launch observes a
/// failure status, [`ProvisionError::PollTimeout`] once `policy.max_wait`
/// has elapsed, and propagates errors from `fetch`.
pub async fn wait_for<F, Fut>(
    policy: &PollPolicy,
    target: WaitTarget<'_>,
    mut fetch: F,
) -> Result<u32, ProvisionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<String>, ProvisionError>>,
{
    let started = Instant::now();
    let deadline = started + policy.max_wait;
    let targets = target.goal.targets(target.statuses);
    let mut interval = policy.initial_interval;
    let mut polls: u32 = 0;

    loop {
        polls = polls.saturating_add(1);
        let status = fetch().await?;
        debug!(
            kind = target.kind,
            resource_id = target.resource_id,
            goal = %target.goal,
            status = status.as_deref().unwrap_or("<missing>"),
            polls,
            "polled resource status"
        );

        match (target.goal, status.as_deref()) {
            (Goal::Gone, None) => return Ok(polls),
            (_, Some(current)) if targets.contains(&current) => return Ok(polls),
            (Goal::Ready, Some(current)) if target.statuses.launch_failure.contains(&current) => {
                warn!(
                    kind = target.kind,
                    resource_id = target.resource_id,
                    status = current,
                    "resource entered a failure status"
                );
                return Err(ProvisionError::UnexpectedStatus {
                    kind: target.kind.to_owned(),
                    resource_id: target.resource_id.to_owned(),
                    status: current.to_owned(),
                    target: targets.join("|"),
                });
            }
            _ => {}
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(ProvisionError::PollTimeout {
                kind: target.kind.to_owned(),
                resource_id: target.resource_id.to_owned(),
                target: targets.join("|"),
                waited: now.duration_since(started),
            });
        }
        sleep(interval.min(deadline.saturating_duration_since(now))).await;
        interval = policy.next_interval(interval);
    }
}
