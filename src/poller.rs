use std::{fmt, future::Future, sync::Arc};

use tokio::time::{sleep, Instant};

use crate::{Error, PollSpec, Result};

/// What a single polling attempt produced.
///
/// See [`Outcome`] for the return types that convert into this.
#[derive(Debug)]
pub enum Progress<T> {
    /// The condition holds; polling stops and yields the value.
    Done(T),
    /// Not yet, and nothing diagnosable to report. If the deadline is
    /// reached with only `Pending` attempts, the poller raises
    /// [`Error::Timeout`].
    Pending,
    /// The attempt failed. The failure is captured and re-raised
    /// verbatim if the deadline is reached.
    Failed(Error),
}

/// Conversion from an attempt's return value into [`Progress`].
///
/// Implemented for the shapes polling closures naturally return:
///
/// - `Result<T, Error>`: `Ok` succeeds, `Err` is a captured failure
/// - `Option<T>`: `Some` succeeds, `None` is pending
/// - `bool`: `true` succeeds, `false` is pending
pub trait Outcome {
    type Success;

    fn into_progress(self) -> Progress<Self::Success>;
}

impl<T> Outcome for Result<T> {
    type Success = T;

    fn into_progress(self) -> Progress<T> {
        match self {
            Ok(value) => Progress::Done(value),
            Err(e) => Progress::Failed(e),
        }
    }
}

impl<T> Outcome for Option<T> {
    type Success = T;

    fn into_progress(self) -> Progress<T> {
        match self {
            Some(value) => Progress::Done(value),
            None => Progress::Pending,
        }
    }
}

impl Outcome for bool {
    type Success = ();

    fn into_progress(self) -> Progress<()> {
        if self {
            Progress::Done(())
        } else {
            Progress::Pending
        }
    }
}

type AbortClassifier = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Retries an action until it succeeds, a non-retriable failure occurs,
/// or the deadline expires.
///
/// The poller decouples "how long to wait for eventual consistency"
/// from "what condition constitutes success": the same spec serves
/// service readiness checks, state assertions, and module-load polling
/// alike.
///
/// Guarantees:
///
/// - never sleeps after a successful attempt
/// - never exceeds the spec's `timeout` by more than one `interval`
/// - a zero `timeout` performs exactly one attempt with no sleep
/// - on deadline, the *last* captured failure is re-raised verbatim;
///   [`Error::Timeout`] appears only when no attempt failed diagnosably
///
/// Sleeping suspends only the calling task.
///
/// # Example
///
/// ```ignore
/// let poller = Poller::new(PollSpec::default())?;
/// let client = poller.value(|| control.connect(&url)).await?;
/// ```
#[derive(Clone)]
pub struct Poller {
    spec: PollSpec,
    abort: Option<AbortClassifier>,
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("spec", &self.spec)
            .field("abort", &self.abort.is_some())
            .finish()
    }
}

impl Poller {
    /// Create a poller, validating the spec before any attempt runs.
    ///
    /// Fails with [`Error::Config`] on a zero interval.
    pub fn new(spec: PollSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Poller { spec, abort: None })
    }

    /// Mark a class of failures as non-retriable.
    ///
    /// A failure for which `classifier` returns true propagates
    /// immediately without retrying. By default every failure is
    /// retriable until the deadline.
    ///
    /// # Example
    ///
    /// ```ignore
    /// // Keep retrying assertion failures, but give up at once if the
    /// // server reports the application is gone.
    /// let poller = Poller::new(spec)?
    ///     .abort_when(|e| e.control_kind() == Some(ControlErrorKind::NotFound));
    /// ```
    pub fn abort_when<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.abort = Some(Arc::new(classifier));
        self
    }

    /// Returns the spec this poller runs with.
    pub fn spec(&self) -> PollSpec {
        self.spec
    }

    /// Repeatedly invoke `attempt` until it yields a success value.
    ///
    /// The closure may return any [`Outcome`]: `Result<T>` when
    /// failures carry diagnostics, `Option<T>` or `bool` for plain
    /// "not yet" conditions.
    pub async fn value<F, Fut, O>(&self, mut attempt: F) -> Result<O::Success>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = O>,
        O: Outcome,
    {
        let deadline = Instant::now() + self.spec.timeout();
        let mut last_failure: Option<Error> = None;
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            match attempt().await.into_progress() {
                Progress::Done(value) => return Ok(value),
                Progress::Pending => {
                    tracing::trace!(attempts, "condition pending");
                }
                Progress::Failed(e) => {
                    if self.abort.as_ref().is_some_and(|abort| abort(&e)) {
                        return Err(e);
                    }
                    tracing::trace!(attempts, error = %e, "attempt failed, will retry");
                    last_failure = Some(e);
                }
            }

            if Instant::now() >= deadline {
                return Err(self.give_up(last_failure, attempts));
            }
            sleep(self.spec.interval()).await;
            if Instant::now() >= deadline {
                return Err(self.give_up(last_failure, attempts));
            }
        }
    }

    /// Repeatedly invoke an assertion until it passes.
    ///
    /// Identical retry loop to [`value`](Self::value), succeeding when
    /// `check` returns `Ok(())`. On deadline the failure from the
    /// *final* attempt is re-raised, preserving its message for
    /// diagnostics.
    pub async fn satisfied<F, Fut>(&self, check: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        self.value(check).await
    }

    fn give_up(&self, last_failure: Option<Error>, attempts: usize) -> Error {
        last_failure.unwrap_or(Error::Timeout {
            timeout: self.spec.timeout(),
            attempts,
        })
    }
}
