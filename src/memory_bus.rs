use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{BusClient, Error, Event, EventStream, Result, SubscriptionId, Topic};

/// Per-subscriber delivery buffer. Publishing drops the event for a
/// subscriber whose buffer is full rather than blocking the publisher.
const SUBSCRIBER_CAPACITY: usize = 256;

/// In-process topic-exchange bus.
///
/// Routes published events to every subscriber whose binding pattern
/// matches the routing key (see [`Topic::matches`]), preserving publish
/// order per subscriber. Cloning a `MemoryBus` yields another handle to
/// the same exchange.
///
/// Used by scenario tests and anywhere a real broker is not worth
/// standing up; [`set_online(false)`](Self::set_online) simulates an
/// unreachable bus for connection-failure paths.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<Inner>,
}

struct Inner {
    subscribers: Mutex<Vec<MemorySubscriber>>,
    online: AtomicBool,
}

impl Default for Inner {
    fn default() -> Self {
        Inner {
            subscribers: Mutex::new(Vec::new()),
            online: AtomicBool::new(true),
        }
    }
}

struct MemorySubscriber {
    id: SubscriptionId,
    binding: Topic,
    sender: mpsc::Sender<Event>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a payload under a routing key.
    ///
    /// Every subscriber whose binding matches receives its own copy.
    /// Subscribers with closed channels are pruned.
    pub fn publish(&self, routing_key: impl Into<Topic>, payload: serde_json::Value) {
        let key = routing_key.into();
        let event = Event::new(key.clone(), payload);

        let mut subscribers = self.lock();
        subscribers.retain(|s| !s.sender.is_closed());
        for subscriber in subscribers.iter().filter(|s| s.binding.matches(&key)) {
            match subscriber.sender.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscription = %subscriber.id,
                        routing_key = %key,
                        "subscriber buffer full, dropping event"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(
                        subscription = %subscriber.id,
                        "subscriber channel closed, will be pruned"
                    );
                }
            }
        }
    }

    /// Simulate the bus going down (or coming back).
    ///
    /// While offline, [`subscribe`](BusClient::subscribe) fails with
    /// [`Error::Connection`] and [`is_up`](BusClient::is_up) reports
    /// false. Existing subscriptions are unaffected.
    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
    }

    /// Number of live subscriptions, after pruning closed ones.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|s| !s.sender.is_closed());
        subscribers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MemorySubscriber>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl BusClient for MemoryBus {
    async fn subscribe(&self, binding: &Topic) -> Result<EventStream> {
        if !self.inner.online.load(Ordering::SeqCst) {
            return Err(Error::Connection("memory bus is offline".into()));
        }

        let (sender, receiver) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let id = SubscriptionId::new();
        self.lock().push(MemorySubscriber {
            id,
            binding: binding.clone(),
            sender,
        });
        tracing::debug!(subscription = %id, binding = %binding, "subscriber registered");
        Ok(ReceiverStream::new(receiver).boxed())
    }

    async fn is_up(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBus")
            .field("subscribers", &self.lock().len())
            .field("online", &self.inner.online.load(Ordering::SeqCst))
            .finish()
    }
}
