use std::future::Future;

use futures_util::stream::BoxStream;

use crate::{Event, Result, Topic};

/// Stream of events delivered under one subscription binding.
pub type EventStream = BoxStream<'static, Event>;

/// Client-side seam for the message bus.
///
/// busspy owns no wire format: a bus client only needs to register a
/// binding and hand back discrete messages with structured payloads.
/// [`MemoryBus`](crate::MemoryBus) is the in-process implementation;
/// transports (AMQP, NATS) live behind this trait in downstream crates.
pub trait BusClient: Send + Sync {
    /// Register interest in `binding` and return the delivery stream.
    ///
    /// Fails with [`Error::Connection`](crate::Error::Connection) if
    /// the bus is unreachable.
    fn subscribe(&self, binding: &Topic) -> impl Future<Output = Result<EventStream>> + Send;

    /// Returns true if the bus is currently reachable.
    fn is_up(&self) -> impl Future<Output = bool> + Send;
}

/// Connection parameters for a bus transport.
///
/// Every field is named and typed at the call site; transports read
/// whatever subset they need. Defaults match a stock AMQP broker on
/// localhost.
///
/// # Examples
///
/// ```
/// use busspy::BusConfig;
///
/// let config = BusConfig::default()
///     .with_host("bus.example.org")
///     .with_port(5671)
///     .with_exchange("events");
/// assert_eq!(config.url(), "amqp://bus.example.org:5671/%2f");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BusConfig {
    host: String,
    port: u16,
    username: String,
    password: String,
    exchange: String,
    virtual_host: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            host: "localhost".into(),
            port: 5672,
            username: "guest".into(),
            password: "guest".into(),
            exchange: "events".into(),
            virtual_host: "/".into(),
        }
    }
}

impl BusConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    pub fn with_virtual_host(mut self, virtual_host: impl Into<String>) -> Self {
        self.virtual_host = virtual_host.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn virtual_host(&self) -> &str {
        &self.virtual_host
    }

    /// Connection URL, with the virtual host percent-encoded.
    pub fn url(&self) -> String {
        let vhost = self.virtual_host.replace('/', "%2f");
        format!("amqp://{}:{}/{}", self.host, self.port, vhost)
    }
}
