use std::{future::Future, hash::Hash, sync::Arc};

use crate::{Result, Topic};

/// Name of an application registered on the control plane.
///
/// Cheap to clone; equality is string comparison with a pointer
/// fast path.
#[derive(Debug, Clone, Ord, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct ApplicationName(Arc<str>);

impl ApplicationName {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bus topic the server publishes this application's events on.
    ///
    /// The server lowercases the application name in the routing key,
    /// so `MyApp` and `myapp` share a topic.
    pub fn events_topic(&self) -> Topic {
        Topic::from(format!("stasis.app.{}", self.0.to_lowercase()))
    }
}

impl PartialEq for ApplicationName {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for ApplicationName {}

impl Hash for ApplicationName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl std::fmt::Display for ApplicationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ApplicationName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ApplicationName {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

/// A request to originate a call toward an application.
///
/// All fields are named and typed; there is no dynamic-argument
/// surface.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OriginateRequest {
    endpoint: String,
    extension: String,
}

impl OriginateRequest {
    /// `endpoint` is the technology/resource to dial (for example
    /// `local/3000@default`); `extension` is the dialplan extension the
    /// call lands on, conventionally the application name.
    pub fn new(endpoint: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            extension: extension.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// REST-style control plane of the system under test.
///
/// Commands return success or failure synchronously; failures surface
/// as [`Error::Control`](crate::Error::Control) with an HTTP-style
/// status (`error.control_kind()` maps 404 to
/// [`ControlErrorKind::NotFound`](crate::ControlErrorKind::NotFound)).
/// The asynchronous side effects of a command (events on the bus) are
/// observed separately through an
/// [`EventAccumulator`](crate::EventAccumulator).
pub trait ControlPlane: Send + Sync {
    /// Ask the server to forward the application's events to the bus.
    fn subscribe_application(
        &self,
        app: &ApplicationName,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Issue the unsubscribe command.
    ///
    /// Only the command round-trip is modeled: success means the server
    /// accepted it, nothing more.
    fn unsubscribe_application(
        &self,
        app: &ApplicationName,
    ) -> impl Future<Output = Result<()>> + Send;

    /// List the applications currently registered on the server.
    fn list_applications(&self) -> impl Future<Output = Result<Vec<ApplicationName>>> + Send;

    /// Originate a call. The stimulus used by scenarios expecting a
    /// call-control event to reach the bus.
    fn originate(&self, request: &OriginateRequest) -> impl Future<Output = Result<()>> + Send;

    /// Returns true once the control plane answers requests.
    fn is_reachable(&self) -> impl Future<Output = bool> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_topic_lowercases_the_name() {
        let app = ApplicationName::new("NewStasisApplication");
        assert_eq!(
            app.events_topic(),
            Topic::new("stasis.app.newstasisapplication")
        );
    }

    #[test]
    fn originate_request_exposes_fields() {
        let request = OriginateRequest::new("local/3000@default", "myapp");
        assert_eq!(request.endpoint(), "local/3000@default");
        assert_eq!(request.extension(), "myapp");
    }
}
