use std::sync::Arc;
use std::time::Duration;

/// The single error type for all busspy operations.
///
/// Every fallible busspy API returns `busspy::Result<T>` (alias for
/// `Result<T, busspy::Error>`). Errors from lower layers (IO, external
/// clients) are mapped into variants of this enum so callers only need
/// to handle one error type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The bus or control plane could not be reached at setup time.
    ///
    /// Fatal: surfaced immediately and never retried by the core.
    /// Callers that want to retry setup wrap it in a
    /// [`Poller`](crate::Poller) themselves.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Invalid polling configuration, raised before any attempt runs.
    #[error("invalid poll configuration: {0}")]
    Config(String),

    /// An expected condition is not (yet) true.
    ///
    /// Retriable: [`Poller`](crate::Poller) swallows these until the
    /// deadline, then re-raises the last one verbatim so diagnostics
    /// point at the real mismatch.
    #[error("{0}")]
    Assertion(String),

    /// Deadline exceeded with no success and no captured failure.
    ///
    /// Raised only when no attempt produced a diagnosable error, e.g.
    /// a readiness check that kept returning `false`.
    #[error("condition not met within {timeout:?} ({attempts} attempts)")]
    Timeout { timeout: Duration, attempts: usize },

    /// A control-plane command failed with an HTTP-style status.
    #[error("control request failed with status {status}: {message}")]
    Control { status: u16, message: String },

    #[error("external error: {0}")]
    External(#[source] Arc<dyn std::error::Error + Send + Sync>),

    #[error("IO error: {0}")]
    Io(#[source] Arc<std::io::Error>),
}

/// Classification of control-plane failures by HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlErrorKind {
    /// 404: the named resource does not exist on the server.
    NotFound,
    /// 401 or 403: credentials missing or rejected.
    Unauthorized,
    /// 5xx: the server failed to execute the command.
    Server,
    /// Any other status.
    Other,
}

impl Error {
    /// Wrap an arbitrary error from an external collaborator.
    pub fn external(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::External(Arc::new(e))
    }

    /// An assertion failure carrying the caller's diagnostic message.
    pub fn assertion(message: impl Into<String>) -> Self {
        Error::Assertion(message.into())
    }

    /// A control-plane failure with an HTTP-style status code.
    pub fn control(status: u16, message: impl Into<String>) -> Self {
        Error::Control {
            status,
            message: message.into(),
        }
    }

    /// Classifies a [`Error::Control`] by its status code.
    ///
    /// Returns `None` for every other variant.
    pub fn control_kind(&self) -> Option<ControlErrorKind> {
        let Error::Control { status, .. } = self else {
            return None;
        };
        Some(match status {
            404 => ControlErrorKind::NotFound,
            401 | 403 => ControlErrorKind::Unauthorized,
            500..=599 => ControlErrorKind::Server,
            _ => ControlErrorKind::Other,
        })
    }

    /// Returns true for failures a [`Poller`](crate::Poller) treats as
    /// "not yet" rather than "never": assertion failures.
    pub fn is_assertion(&self) -> bool {
        matches!(self, Error::Assertion(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}
