use std::sync::Arc;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    event_log::EventLog, BusClient, Event, EventLogReader, EventStream, Result, SubscriptionId,
    Topic,
};

/// Buffers every message received on a bus binding, in arrival order.
///
/// A background listener task appends each delivery to an internal
/// append-only log as it arrives; [`snapshot`](Self::snapshot) returns
/// repeated, non-destructive copies of everything accumulated so far.
/// Subscribe *before* triggering the stimulus that is expected to
/// produce an event, or the event may be lost to the race.
///
/// The listener runs for the lifetime of the accumulator. Call
/// [`stop`](Self::stop) to release the bus subscription
/// deterministically; dropping the accumulator also cancels the
/// listener.
///
/// # Example
///
/// ```ignore
/// let mut events = EventAccumulator::subscribe(&bus, "stasis.app.myapp").await?;
/// control.originate(&request).await?;
///
/// let reader = events.reader();
/// eventually(move || { /* inspect reader.snapshot() */ }).await?;
/// events.stop().await;
/// ```
pub struct EventAccumulator {
    id: SubscriptionId,
    binding: Topic,
    log: Arc<EventLog>,
    cancel: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

impl EventAccumulator {
    /// Register a binding on the bus and start accumulating.
    ///
    /// Fails with [`Error::Connection`](crate::Error::Connection) if
    /// the bus is unreachable.
    pub async fn subscribe<B: BusClient>(bus: &B, binding: impl Into<Topic>) -> Result<Self> {
        let binding = binding.into();
        let stream = bus.subscribe(&binding).await?;

        let id = SubscriptionId::new();
        let log = Arc::new(EventLog::default());
        let cancel = CancellationToken::new();
        let listener = tokio::spawn(listen(id, binding.clone(), stream, log.clone(), cancel.clone()));
        tracing::debug!(subscription = %id, binding = %binding, "accumulator listening");

        Ok(EventAccumulator {
            id,
            binding,
            log,
            cancel,
            listener: Some(listener),
        })
    }

    /// Returns the binding this accumulator was subscribed with.
    pub fn binding(&self) -> &Topic {
        &self.binding
    }

    /// Returns an immutable copy of everything received so far, in
    /// arrival order. Non-blocking; safe to call concurrently with
    /// ongoing arrivals.
    pub fn snapshot(&self) -> Vec<Event> {
        self.log.snapshot()
    }

    /// Returns the number of events received so far.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an owned, cloneable read handle on the log.
    ///
    /// Handles are `'static` and so can move into
    /// [`eventually`](crate::eventually) closures.
    pub fn reader(&self) -> EventLogReader {
        EventLogReader::new(self.log.clone())
    }

    /// Stop the listener and release the bus subscription.
    ///
    /// Waits for the listener task to finish, so no event is appended
    /// after this returns. Idempotent.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(listener) = self.listener.take() {
            let _ = listener.await;
        }
        tracing::debug!(subscription = %self.id, "accumulator stopped");
    }
}

impl Drop for EventAccumulator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for EventAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventAccumulator")
            .field("id", &self.id)
            .field("binding", &self.binding)
            .field("received", &self.log.len())
            .finish_non_exhaustive()
    }
}

async fn listen(
    id: SubscriptionId,
    binding: Topic,
    mut stream: EventStream,
    log: Arc<EventLog>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = stream.next() => match next {
                Some(event) => {
                    tracing::debug!(
                        subscription = %id,
                        routing_key = %event.routing_key(),
                        "event recorded"
                    );
                    log.append(event);
                }
                None => {
                    tracing::warn!(subscription = %id, binding = %binding, "bus stream ended");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::time::Duration;

    use super::*;
    use crate::{eventually, Error, MemoryBus};

    #[tokio::test]
    async fn accumulates_matching_events_in_order() {
        let bus = MemoryBus::new();
        let mut events = EventAccumulator::subscribe(&bus, "stasis.app.myapp")
            .await
            .unwrap();

        bus.publish("stasis.app.myapp", json!({"application": "other"}));
        bus.publish("stasis.app.myapp", json!({"application": "myapp"}));

        let reader = events.reader();
        eventually(move || {
            let seen = reader.snapshot();
            async move {
                if seen.len() >= 2 {
                    Ok(())
                } else {
                    Err(Error::assertion(format!("{} events so far", seen.len())))
                }
            }
        })
        .within(Duration::from_secs(5))
        .await
        .unwrap();

        let snap = events.snapshot();
        assert_eq!(snap[0].field("application"), Some(&json!("other")));
        assert_eq!(snap[1].field("application"), Some(&json!("myapp")));
        events.stop().await;
    }

    #[tokio::test]
    async fn predicate_over_snapshot_finds_expected_event() {
        let bus = MemoryBus::new();
        let mut events = EventAccumulator::subscribe(&bus, "stasis.app.myapp")
            .await
            .unwrap();

        bus.publish("stasis.app.myapp", json!({"application": "other"}));
        bus.publish("stasis.app.myapp", json!({"application": "myapp"}));

        let reader = events.reader();
        eventually(move || {
            let seen = reader.snapshot();
            async move {
                if seen
                    .iter()
                    .any(|e| e.field("application") == Some(&json!("myapp")))
                {
                    Ok(())
                } else {
                    Err(Error::assertion("no event for 'myapp' yet"))
                }
            }
        })
        .within(Duration::from_secs(5))
        .every(Duration::from_millis(100))
        .await
        .unwrap();

        events.stop().await;
    }

    #[tokio::test]
    async fn stop_halts_accumulation() {
        let bus = MemoryBus::new();
        let mut events = EventAccumulator::subscribe(&bus, "t.#").await.unwrap();

        bus.publish("t.one", json!({"n": 1}));
        let reader = events.reader();
        eventually(move || {
            let n = reader.len();
            async move {
                if n == 1 {
                    Ok(())
                } else {
                    Err(Error::assertion("first event not recorded yet"))
                }
            }
        })
        .await
        .unwrap();

        events.stop().await;
        bus.publish("t.two", json!({"n": 2}));
        tokio::task::yield_now().await;

        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn subscribe_fails_when_bus_is_down() {
        let bus = MemoryBus::new();
        bus.set_online(false);

        let err = EventAccumulator::subscribe(&bus, "t.one").await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn drop_releases_the_subscription() {
        let bus = MemoryBus::new();
        let events = EventAccumulator::subscribe(&bus, "t.one").await.unwrap();
        assert_eq!(bus.subscriber_count(), 1);

        drop(events);
        // The listener owns the receiving half; once it exits, the bus
        // prunes the closed channel.
        eventually({
            let bus = bus.clone();
            move || {
                let count = bus.subscriber_count();
                async move {
                    if count == 0 {
                        Ok(())
                    } else {
                        Err(Error::assertion("subscription still registered"))
                    }
                }
            }
        })
        .await
        .unwrap();
    }
}
