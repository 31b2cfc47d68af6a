use std::time::Duration;

use crate::{Error, Result};

/// How long and how often to retry.
///
/// Passed by value into [`Poller`](crate::Poller). Use the builder
/// methods to customize, or [`Default`] for values suited to service
/// readiness checks.
///
/// A zero `timeout` is legal and means exactly one attempt with no
/// sleep. A zero `interval` is rejected with [`Error::Config`] before
/// any attempt runs.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use busspy::PollSpec;
///
/// let spec = PollSpec::default()
///     .with_timeout(Duration::from_secs(50))
///     .with_interval(Duration::from_millis(250));
/// assert_eq!(spec.timeout(), Duration::from_secs(50));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PollSpec {
    timeout: Duration,
    interval: Duration,
}

impl Default for PollSpec {
    fn default() -> Self {
        PollSpec {
            timeout: Duration::from_secs(5),
            interval: Duration::from_millis(100),
        }
    }
}

impl PollSpec {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        PollSpec { timeout, interval }
    }

    /// Set the total deadline for the retry loop.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the sleep between attempts.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Returns the total deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the sleep between attempts.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::Config("interval must be greater than zero".into()));
        }
        Ok(())
    }
}
