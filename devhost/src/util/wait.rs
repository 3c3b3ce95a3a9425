//! Blocking wait for a condition observed by polling.

use std::time::{Duration, Instant};

use devhost_shared::errors::{DevhostError, DevhostResult};
use tokio_util::sync::CancellationToken;

use crate::constants::wait::{DEFAULT_MAX_ATTEMPTS, DEFAULT_WAIT_INTERVAL};

/// Polling budget for [`wait_for_with`].
#[derive(Clone, Debug)]
pub struct WaitOptions {
    /// Maximum number of predicate evaluations.
    pub max_attempts: u32,
    /// Sleep between two evaluations.
    pub interval: Duration,
    /// Absolute point in time after which no further evaluation happens.
    pub deadline: Option<Instant>,
    /// Cooperative cancellation, checked before every evaluation.
    pub cancel: Option<CancellationToken>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_WAIT_INTERVAL,
            deadline: None,
            cancel: None,
        }
    }
}

impl WaitOptions {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            ..Self::default()
        }
    }

    /// Bound the whole wait to `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Block until `predicate` returns true, using the default budget.
pub fn wait_for<F>(predicate: F) -> DevhostResult<()>
where
    F: FnMut() -> bool,
{
    wait_for_with(&WaitOptions::default(), predicate)
}

/// Block until `predicate` returns true or the budget in `options` runs out.
///
/// The predicate is evaluated at most `max_attempts` times. There is no
/// sleep after the last evaluation.
pub fn wait_for_with<F>(options: &WaitOptions, mut predicate: F) -> DevhostResult<()>
where
    F: FnMut() -> bool,
{
    for attempt in 1..=options.max_attempts {
        if let Some(token) = &options.cancel
            && token.is_cancelled()
        {
            return Err(DevhostError::Cancelled(format!(
                "stopped waiting after {} attempts",
                attempt - 1
            )));
        }
        if let Some(deadline) = options.deadline
            && Instant::now() >= deadline
        {
            return Err(DevhostError::Timeout(format!(
                "Deadline exceeded after {} attempts",
                attempt - 1
            )));
        }

        if predicate() {
            return Ok(());
        }

        if attempt < options.max_attempts {
            tracing::trace!(attempt, "condition not met yet, retrying");
            std::thread::sleep(options.interval);
        }
    }

    Err(DevhostError::Timeout(format!(
        "Maximum number of retries ({}) exceeded",
        options.max_attempts
    )))
}
