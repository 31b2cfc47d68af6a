use std::future::Future;

use crate::{
    eventually, BusClient, ControlPlane, Event, EventAccumulator, PollSpec, Result, Topic,
};

/// One stimulus/verification pair.
///
/// - `binding`: the bus topic the expected event arrives on
/// - `stimulus`: a single action against the control plane, run exactly
///   once after the subscription is in place; the closure captures the
///   client handle it needs
/// - `predicate`: inspects an event-log snapshot; `Ok(())` once the
///   expected event has arrived, `Err(Error::assertion(..))` with a
///   precise message otherwise
/// - `poll`: how long and how often to re-check
pub struct Scenario<S, P> {
    binding: Topic,
    stimulus: S,
    predicate: P,
    poll: PollSpec,
}

impl<S, P> Scenario<S, P> {
    pub fn new(binding: impl Into<Topic>, stimulus: S, predicate: P) -> Self {
        Self {
            binding: binding.into(),
            stimulus,
            predicate,
            poll: PollSpec::default(),
        }
    }

    /// Override the default poll spec.
    pub fn with_poll(mut self, poll: PollSpec) -> Self {
        self.poll = poll;
        self
    }
}

impl<S, P> std::fmt::Debug for Scenario<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("binding", &self.binding)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

/// Orchestrates a scenario against an external system.
///
/// Holds the two collaborator seams and enforces the ordering contract:
/// the accumulator subscribes *before* the stimulus runs (so the
/// expected event cannot be lost to the race), the stimulus runs
/// exactly once, verification polls the accumulated events, and the
/// subscription is released on every exit path, including verification
/// failure.
///
/// # Example
///
/// ```ignore
/// let driver = ScenarioDriver::new(control.clone(), bus);
/// driver
///     .run(Scenario::new(
///         app.events_topic(),
///         move || async move { control.originate(&request).await },
///         move |events| { /* look for the expected payload */ },
///     ))
///     .await?;
/// ```
#[derive(Debug)]
pub struct ScenarioDriver<C, B> {
    control: C,
    bus: B,
}

impl<C: ControlPlane, B: BusClient> ScenarioDriver<C, B> {
    pub fn new(control: C, bus: B) -> Self {
        Self { control, bus }
    }

    /// The control plane, for setup commands outside the scenario
    /// proper (registering applications, readiness checks).
    pub fn control(&self) -> &C {
        &self.control
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Run a scenario to completion.
    ///
    /// On timeout the error is the predicate's last assertion failure,
    /// not a generic timeout message.
    pub async fn run<S, Fut, P>(&self, scenario: Scenario<S, P>) -> Result<()>
    where
        S: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
        P: Fn(&[Event]) -> Result<()> + Send + Sync + 'static,
    {
        let Scenario {
            binding,
            stimulus,
            predicate,
            poll,
        } = scenario;

        let mut accumulator = EventAccumulator::subscribe(&self.bus, binding).await?;
        let outcome = Self::drive(&accumulator, stimulus, predicate, poll).await;
        accumulator.stop().await;
        outcome
    }

    async fn drive<S, Fut, P>(
        accumulator: &EventAccumulator,
        stimulus: S,
        predicate: P,
        poll: PollSpec,
    ) -> Result<()>
    where
        S: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
        P: Fn(&[Event]) -> Result<()> + Send + Sync + 'static,
    {
        stimulus().await?;

        let reader = accumulator.reader();
        eventually(move || {
            let verdict = predicate(&reader.snapshot());
            async move { verdict }
        })
        .within(poll.timeout())
        .every(poll.interval())
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::testing::{ControlCommand, FakeControlPlane};
    use crate::{ApplicationName, Error, MemoryBus, OriginateRequest};

    fn fast_poll() -> PollSpec {
        PollSpec::new(Duration::from_secs(2), Duration::from_millis(10))
    }

    fn expects_application(app: ApplicationName) -> impl Fn(&[Event]) -> Result<()> + Send + Sync {
        move |events| {
            if events
                .iter()
                .any(|e| e.field("data.application") == Some(&json!(app.as_str())))
            {
                Ok(())
            } else {
                Err(Error::assertion(format!(
                    "no event with data.application == '{app}' among {} received",
                    events.len()
                )))
            }
        }
    }

    fn originate_stimulus(
        control: FakeControlPlane,
        request: OriginateRequest,
    ) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        move || Box::pin(async move { control.originate(&request).await })
    }

    #[tokio::test]
    async fn stimulus_event_reaches_the_predicate() {
        let bus = MemoryBus::new();
        let control = FakeControlPlane::with_bus(bus.clone());
        let app = ApplicationName::new("myapp");
        control.subscribe_application(&app).await.unwrap();

        let driver = ScenarioDriver::new(control.clone(), bus);
        let request = OriginateRequest::new("local/3000@default", app.as_str());
        driver
            .run(
                Scenario::new(
                    app.events_topic(),
                    originate_stimulus(control, request),
                    expects_application(app.clone()),
                )
                .with_poll(fast_poll()),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stimulus_runs_exactly_once() {
        let bus = MemoryBus::new();
        let control = FakeControlPlane::with_bus(bus.clone());
        let app = ApplicationName::new("myapp");
        control.subscribe_application(&app).await.unwrap();

        let driver = ScenarioDriver::new(control.clone(), bus);
        let request = OriginateRequest::new("local/3000@default", app.as_str());
        driver
            .run(
                Scenario::new(
                    app.events_topic(),
                    originate_stimulus(control, request),
                    expects_application(app.clone()),
                )
                .with_poll(fast_poll()),
            )
            .await
            .unwrap();

        let originates = driver
            .control()
            .commands()
            .into_iter()
            .filter(|c| matches!(c, ControlCommand::Originate(_)))
            .count();
        assert_eq!(originates, 1);
    }

    #[tokio::test]
    async fn verification_failure_still_releases_the_subscription() {
        let bus = MemoryBus::new();
        let control = FakeControlPlane::with_bus(bus.clone());
        // Not subscribed server-side: originate produces no event.
        let app = ApplicationName::new("myapp");

        let driver = ScenarioDriver::new(control.clone(), bus.clone());
        let request = OriginateRequest::new("local/3000@default", app.as_str());
        let err = driver
            .run(
                Scenario::new(
                    app.events_topic(),
                    originate_stimulus(control, request),
                    expects_application(app.clone()),
                )
                .with_poll(PollSpec::new(
                    Duration::from_millis(50),
                    Duration::from_millis(10),
                )),
            )
            .await
            .unwrap_err();

        assert!(err.is_assertion(), "expected assertion failure, got {err}");
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn failed_stimulus_aborts_and_releases_the_subscription() {
        let bus = MemoryBus::new();
        let control = FakeControlPlane::with_bus(bus.clone());
        control.fail_next_originate(503, "temporarily unavailable");
        let app = ApplicationName::new("myapp");

        let driver = ScenarioDriver::new(control.clone(), bus.clone());
        let request = OriginateRequest::new("local/3000@default", app.as_str());
        let err = driver
            .run(
                Scenario::new(
                    app.events_topic(),
                    originate_stimulus(control, request),
                    expects_application(app.clone()),
                )
                .with_poll(fast_poll()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Control { status: 503, .. }));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
