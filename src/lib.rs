//! # Busspy
//!
//! Observe asynchronous message-bus side effects from synchronous test
//! code.
//!
//! Integration tests against an external system often trigger an action
//! over a control API and then need to assert that, eventually, an
//! event shows up on a message bus. Busspy provides the synchronization
//! core for that pattern: an append-only event accumulator fed by a
//! background listener, a retry-until-deadline poller, and an
//! "assert eventually" layer that surfaces the last real mismatch
//! instead of a generic timeout.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use busspy::{eventually, Error, EventAccumulator, MemoryBus};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> busspy::Result {
//!     let bus = MemoryBus::new();
//!     let mut events = EventAccumulator::subscribe(&bus, "stasis.app.myapp").await?;
//!
//!     // Somewhere else, the system under test emits onto the bus.
//!     bus.publish("stasis.app.myapp", json!({"application": "myapp"}));
//!
//!     let reader = events.reader();
//!     eventually(move || {
//!         let seen = reader.snapshot();
//!         async move {
//!             if seen.iter().any(|e| e.field("application") == Some(&json!("myapp"))) {
//!                 Ok(())
//!             } else {
//!                 Err(Error::assertion(format!("{} events, none for 'myapp'", seen.len())))
//!             }
//!         }
//!     })
//!     .await?;
//!
//!     events.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`EventAccumulator`] | Buffers every message on a binding, in arrival order, with non-destructive snapshots |
//! | [`Poller`] | Retries an action until success, a non-retriable failure, or the deadline |
//! | [`eventually`] | Builder for "assert eventually", awaitable directly |
//! | [`ScenarioDriver`] | Subscribe-before-stimulus orchestration with guaranteed release |
//! | [`TestEnvironment`] | Per-scenario container lifecycle with explicit setup/teardown |
//! | [`MemoryBus`] | In-process topic exchange implementing [`BusClient`] |
//! | [`Event`] | One delivery: routing key plus opaque structured payload |
//! | [`PollSpec`] | Timeout/interval configuration for retry loops |
//!
//! ## Ordering and Timing Guarantees
//!
//! - An accumulator's log preserves bus-delivery order exactly: no
//!   reordering, no deduplication, no truncation.
//! - A snapshot is an atomic copy; later arrivals never mutate it.
//! - A [`Poller`] never sleeps after a successful attempt and never
//!   overshoots its timeout by more than one interval; a zero timeout
//!   means exactly one attempt.
//! - On deadline, the last captured failure is re-raised verbatim.
//!   [`Error::Timeout`] appears only when no attempt failed diagnosably.
//!
//! ## Collaborator Seams
//!
//! The external system stays opaque behind three traits: [`BusClient`]
//! (the message bus), [`ControlPlane`] (the REST-style command API),
//! and [`ContainerRuntime`] (the launcher). The [`testing`] module
//! ships in-memory fakes for the latter two.

mod accumulator;
mod assertion;
mod bus;
mod control;
mod environment;
mod error;
mod event;
mod event_log;
mod memory_bus;
mod poll;
mod poller;
mod scenario;
mod subscription_id;
mod topic;

pub mod testing;

pub use accumulator::EventAccumulator;
pub use assertion::{eventually, AsyncAssertion, DEFAULT_ASSERT_TIMEOUT, INTERVAL_FLOOR};
pub use bus::{BusClient, BusConfig, EventStream};
pub use control::{ApplicationName, ControlPlane, OriginateRequest};
pub use environment::{ContainerRuntime, EnvironmentConfig, TestEnvironment};
pub use error::{ControlErrorKind, Error};
pub use event::Event;
pub use event_log::EventLogReader;
pub use memory_bus::MemoryBus;
pub use poll::PollSpec;
pub use poller::{Outcome, Poller, Progress};
pub use scenario::{Scenario, ScenarioDriver};
pub use subscription_id::SubscriptionId;
pub use topic::Topic;

/// Convenience alias for `Result<T, busspy::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
