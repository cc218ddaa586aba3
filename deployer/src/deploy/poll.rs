//! Bounded polling primitive shared by the image probe and the readiness poller

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::errors::DeployError;

/// Readiness polling: one check every 500ms, at most 100 checks
pub const READINESS_INTERVAL: Duration = Duration::from_millis(500);
pub const READINESS_MAX_ATTEMPTS: u32 = 100;

/// Image polling defaults: one check every 5s for up to 500s
pub const IMAGE_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const IMAGE_POLL_TIMEOUT: Duration = Duration::from_secs(500);

/// Poll policy
///
/// The attempt counter is the only ceiling: an in-flight check is never
/// interrupted, it runs until its own request timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two checks
    pub interval: Duration,

    /// Maximum number of checks, at least one
    pub max_attempts: u32,

    /// Delay before the first check
    pub initial_delay: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::ZERO,
        }
    }

    /// Derive the attempt ceiling from a wall-clock budget
    pub fn from_timeout(interval: Duration, timeout: Duration) -> Self {
        let attempts = if interval.is_zero() {
            1
        } else {
            timeout.as_millis().div_ceil(interval.as_millis())
        };
        Self::new(interval, u32::try_from(attempts).unwrap_or(u32::MAX))
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Policy for waiting on an image to appear in its registry
    pub fn image_visibility(interval: Duration, timeout: Duration) -> Self {
        Self::from_timeout(interval, timeout)
    }

    /// Policy for waiting on a service to become ready; the first check waits
    /// one interval so the control plane has started reconciling
    pub fn readiness() -> Self {
        Self::new(READINESS_INTERVAL, READINESS_MAX_ATTEMPTS).with_initial_delay(READINESS_INTERVAL)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::image_visibility(IMAGE_POLL_INTERVAL, IMAGE_POLL_TIMEOUT)
    }
}

/// Result of a single check, as judged by the caller's predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<T> {
    /// Terminal: stop polling with this value
    Done(T),
    /// Not there yet, keep polling
    Pending,
}

/// Result of a poll loop that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Done { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Run `check` until it returns `Done`, fails, or the attempt budget is spent
///
/// Errors returned by `check` abort the loop immediately; transient conditions
/// must be reported as `Check::Pending` by the caller.
pub async fn poll<T, F, Fut>(
    policy: &PollPolicy,
    operation: &str,
    mut check: F,
) -> Result<PollOutcome<T>, DeployError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Check<T>, DeployError>>,
{
    if !policy.initial_delay.is_zero() {
        tokio::time::sleep(policy.initial_delay).await;
    }

    for attempt in 1..=policy.max_attempts {
        debug!(operation, attempt, max_attempts = policy.max_attempts, "Polling");

        if let Check::Done(value) = check(attempt).await? {
            return Ok(PollOutcome::Done { value, attempts: attempt });
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Ok(PollOutcome::Exhausted {
        attempts: policy.max_attempts,
    })
}
