// Bounded polling for freshly published packages to show up in their registry.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

use crate::config::DEFAULT_POLL_INTERVAL_SECS;
use crate::error::{AvailabilityError, Result};

/// One "is version X of package Y visible yet?" question against a registry.
///
/// `Ok(false)` means not visible yet and is retried. An `Err` is a fault
/// that retrying can't fix and stops the poll immediately.
#[async_trait]
pub trait AvailabilityCheck: Send + Sync {
    async fn check(&self) -> Result<bool>;
}

#[async_trait]
impl<F> AvailabilityCheck for F
where
    F: Fn() -> Result<bool> + Send + Sync,
{
    async fn check(&self) -> Result<bool> {
        self()
    }
}

/// Poller states. `Available` and `TimedOut` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Checking,
    Waiting,
    Available,
    TimedOut,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollState::Checking => "checking",
            PollState::Waiting => "waiting",
            PollState::Available => "available",
            PollState::TimedOut => "timed-out",
        };
        f.write_str(name)
    }
}

/// Summary of a successful wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    pub attempts: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityPoller {
    timeout: Duration,
    interval: Duration,
}

impl AvailabilityPoller {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check until `check` reports the version as available or the budget runs out.
    ///
    /// The budget is only compared after a failed check, so the last check can
    /// land at most one interval past the timeout. A check that hasn't returned
    /// by then is abandoned and the wait times out.
    pub async fn wait_until_available(
        &self,
        package: &str,
        version: &str,
        check: &dyn AvailabilityCheck,
    ) -> Result<PollOutcome> {
        let start = Instant::now();
        let mut attempts = 0u32;
        let mut state = PollState::Checking;

        loop {
            match state {
                PollState::Checking => {
                    attempts += 1;
                    let check_budget = self.timeout.saturating_sub(start.elapsed()) + self.interval;
                    state = match timeout(check_budget, check.check()).await {
                        Ok(result) => {
                            if result? {
                                PollState::Available
                            } else if start.elapsed() >= self.timeout {
                                PollState::TimedOut
                            } else {
                                PollState::Waiting
                            }
                        }
                        Err(_) => {
                            tracing::debug!(
                                package,
                                version,
                                "Availability check still running after {}s",
                                check_budget.as_secs()
                            );
                            PollState::TimedOut
                        }
                    };
                    tracing::debug!(
                        package,
                        version,
                        attempts,
                        state = %state,
                        "Availability check finished"
                    );
                }
                PollState::Waiting => {
                    tracing::debug!(
                        "Waiting {}s for {package}@{version} to become available",
                        self.interval.as_secs()
                    );
                    sleep(self.interval).await;
                    state = PollState::Checking;
                }
                PollState::Available => {
                    return Ok(PollOutcome {
                        attempts,
                        elapsed: start.elapsed(),
                    });
                }
                PollState::TimedOut => {
                    return Err(AvailabilityError::Timeout {
                        package: package.to_string(),
                        version: version.to_string(),
                        timeout: self.timeout,
                        attempts,
                    }
                    .into());
                }
            }
        }
    }
}
