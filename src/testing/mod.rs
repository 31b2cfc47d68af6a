//! In-memory fakes for the external collaborator seams.
//!
//! [`FakeControlPlane`] stands in for the REST-style control plane and
//! [`FakeRuntime`] for the container launcher, so scenarios run without
//! a server or a container engine. Pair them with
//! [`MemoryBus`](crate::MemoryBus) for a fully in-process setup.
//!
//! # Example
//!
//! ```ignore
//! let bus = MemoryBus::new();
//! let control = FakeControlPlane::with_bus(bus.clone());
//! control.subscribe_application(&app).await?;
//!
//! let driver = ScenarioDriver::new(control.clone(), bus);
//! // originate now emits a StasisStart event for subscribed apps
//! ```
//!
//! # Warning
//!
//! **Do not use in production.** The fakes keep unbounded in-memory
//! command logs and exist only to exercise test scenarios.

mod fake_control;
mod fake_runtime;

pub use fake_control::{ControlCommand, FakeControlPlane};
pub use fake_runtime::FakeRuntime;
