use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;

use crate::{ApplicationName, ControlPlane, Error, MemoryBus, OriginateRequest, Result};

/// A command the fake received, in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Subscribe(ApplicationName),
    Unsubscribe(ApplicationName),
    ListApplications,
    Originate(OriginateRequest),
}

#[derive(Default)]
struct State {
    applications: Vec<ApplicationName>,
    commands: Vec<ControlCommand>,
    fail_subscribe: Option<Error>,
    fail_unsubscribe: Option<Error>,
    fail_originate: Option<Error>,
    unreachable_for: usize,
}

/// Scripted, in-memory [`ControlPlane`].
///
/// Mimics the server behavior scenarios rely on: subscribing registers
/// the application so it shows up in
/// [`list_applications`](ControlPlane::list_applications), and when
/// constructed
/// [`with_bus`](Self::with_bus), an originate toward a *subscribed*
/// application emits a `StasisStart` event on that application's
/// topic. Originates toward unsubscribed applications stay silent, like
/// the real server.
///
/// Each command can be scripted to fail once with an HTTP-style status.
/// Cloning yields another handle to the same fake.
#[derive(Clone, Default)]
pub struct FakeControlPlane {
    state: Arc<Mutex<State>>,
    bus: Option<MemoryBus>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fake that emits events for subscribed applications onto `bus`.
    pub fn with_bus(bus: MemoryBus) -> Self {
        Self {
            state: Arc::default(),
            bus: Some(bus),
        }
    }

    /// Script the next subscribe command to fail with `status`.
    pub fn fail_next_subscribe(&self, status: u16, message: &str) {
        self.lock().fail_subscribe = Some(Error::control(status, message));
    }

    /// Script the next unsubscribe command to fail with `status`.
    pub fn fail_next_unsubscribe(&self, status: u16, message: &str) {
        self.lock().fail_unsubscribe = Some(Error::control(status, message));
    }

    /// Script the next originate command to fail with `status`.
    pub fn fail_next_originate(&self, status: u16, message: &str) {
        self.lock().fail_originate = Some(Error::control(status, message));
    }

    /// Report unreachable for the next `attempts` reachability checks.
    pub fn reachable_after(&self, attempts: usize) {
        self.lock().unreachable_for = attempts;
    }

    /// Every command received so far, in order.
    pub fn commands(&self) -> Vec<ControlCommand> {
        self.lock().commands.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ControlPlane for FakeControlPlane {
    async fn subscribe_application(&self, app: &ApplicationName) -> Result<()> {
        let mut state = self.lock();
        state.commands.push(ControlCommand::Subscribe(app.clone()));
        if let Some(err) = state.fail_subscribe.take() {
            return Err(err);
        }
        if !state.applications.contains(app) {
            state.applications.push(app.clone());
        }
        Ok(())
    }

    async fn unsubscribe_application(&self, app: &ApplicationName) -> Result<()> {
        let mut state = self.lock();
        state.commands.push(ControlCommand::Unsubscribe(app.clone()));
        if let Some(err) = state.fail_unsubscribe.take() {
            return Err(err);
        }
        Ok(())
    }

    async fn list_applications(&self) -> Result<Vec<ApplicationName>> {
        let mut state = self.lock();
        state.commands.push(ControlCommand::ListApplications);
        Ok(state.applications.clone())
    }

    async fn originate(&self, request: &OriginateRequest) -> Result<()> {
        let subscribed = {
            let mut state = self.lock();
            state.commands.push(ControlCommand::Originate(request.clone()));
            if let Some(err) = state.fail_originate.take() {
                return Err(err);
            }
            let app = ApplicationName::new(request.extension());
            state.applications.contains(&app).then_some(app)
        };

        if let (Some(app), Some(bus)) = (subscribed, &self.bus) {
            bus.publish(
                app.events_topic(),
                json!({
                    "name": "StasisStart",
                    "data": { "application": app.as_str() },
                }),
            );
        }
        Ok(())
    }

    async fn is_reachable(&self) -> bool {
        let mut state = self.lock();
        if state.unreachable_for > 0 {
            state.unreachable_for -= 1;
            return false;
        }
        true
    }
}

impl std::fmt::Debug for FakeControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FakeControlPlane")
            .field("applications", &state.applications.len())
            .field("commands", &state.commands.len())
            .field("bus", &self.bus.is_some())
            .finish()
    }
}
