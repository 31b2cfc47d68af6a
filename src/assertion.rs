use std::{
    fmt,
    future::{Future, IntoFuture},
    pin::Pin,
    time::Duration,
};

use crate::{Poller, PollSpec, Result};

/// Default deadline for [`eventually`] assertions.
pub const DEFAULT_ASSERT_TIMEOUT: Duration = Duration::from_secs(5);

/// Smallest interval [`eventually`] will derive on its own.
pub const INTERVAL_FLOOR: Duration = Duration::from_millis(100);

/// Assert that a condition eventually holds.
///
/// Turns "assert eventually" into "assert now": the check is retried
/// until it passes or the deadline expires, and on timeout the error
/// surfaced is the *last* observed assertion failure, so diagnostics
/// point at the real mismatch rather than a generic timeout message.
///
/// Unless overridden with [`every`](AsyncAssertion::every), the retry
/// interval is 1/100 of the timeout, floored at [`INTERVAL_FLOOR`].
///
/// The check must own what it captures (`'static`); use
/// [`EventAccumulator::reader`](crate::EventAccumulator::reader) to get
/// an owned handle on an event log.
///
/// # Example
///
/// ```ignore
/// let reader = accumulator.reader();
/// eventually(move || {
///     let events = reader.snapshot();
///     async move {
///         if events.iter().any(|e| e.field("application") == Some(&json!("myapp"))) {
///             Ok(())
///         } else {
///             Err(Error::assertion(format!("no event for 'myapp' in {events:?}")))
///         }
///     }
/// })
/// .within(Duration::from_secs(5))
/// .await?;
/// ```
pub fn eventually<F, Fut>(check: F) -> AsyncAssertion<F>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    AsyncAssertion {
        check,
        timeout: DEFAULT_ASSERT_TIMEOUT,
        interval: None,
    }
}

/// Builder returned by [`eventually`]. Await it to run the assertion.
pub struct AsyncAssertion<F> {
    check: F,
    timeout: Duration,
    interval: Option<Duration>,
}

impl<F> AsyncAssertion<F> {
    /// Override the default 5-second deadline.
    pub fn within(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the derived retry interval.
    pub fn every(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}

pub(crate) fn effective_interval(timeout: Duration, interval: Option<Duration>) -> Duration {
    interval.unwrap_or_else(|| (timeout / 100).max(INTERVAL_FLOOR))
}

impl<F, Fut> AsyncAssertion<F>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn run(self) -> Result<()> {
        let interval = effective_interval(self.timeout, self.interval);
        let poller = Poller::new(PollSpec::new(self.timeout, interval))?;
        poller.satisfied(self.check).await
    }
}

impl<F, Fut> IntoFuture for AsyncAssertion<F>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    type Output = Result<()>;
    type IntoFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

impl<F> fmt::Debug for AsyncAssertion<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncAssertion")
            .field("timeout", &self.timeout)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use tokio::time::Instant;

    use super::*;
    use crate::Error;

    #[test]
    fn interval_defaults_to_hundredth_of_timeout() {
        assert_eq!(
            effective_interval(Duration::from_secs(60), None),
            Duration::from_millis(600)
        );
    }

    #[test]
    fn interval_is_floored_for_short_timeouts() {
        assert_eq!(
            effective_interval(Duration::from_secs(1), None),
            INTERVAL_FLOOR
        );
    }

    #[test]
    fn explicit_interval_wins() {
        assert_eq!(
            effective_interval(Duration::from_secs(60), Some(Duration::from_millis(5))),
            Duration::from_millis(5)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn passes_once_the_condition_holds() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        let start = Instant::now();

        eventually(move || {
            let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n >= 3 {
                    Ok(())
                } else {
                    Err(Error::assertion("not yet"))
                }
            }
        })
        .within(Duration::from_secs(5))
        .every(Duration::from_millis(100))
        .await
        .unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Observed success before the full timeout elapsed.
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_surfaces_last_assertion_failure() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();

        let err = eventually(move || {
            let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(Error::assertion(format!("mismatch on attempt {n}"))) }
        })
        .within(Duration::from_secs(1))
        .every(Duration::from_millis(100))
        .await
        .unwrap_err();

        let last = attempts.load(Ordering::SeqCst);
        assert_eq!(err.to_string(), format!("mismatch on attempt {last}"));
    }
}
