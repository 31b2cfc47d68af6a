use std::sync::{Arc, Mutex, PoisonError};

use crate::Event;

/// Append-only, ordered buffer of received events.
///
/// Exactly one writer (the accumulator's listener task) appends; any
/// number of readers take snapshots. A snapshot is atomic with respect
/// to append: readers never observe a torn write. The log grows
/// monotonically for the lifetime of the subscription and is never
/// truncated or reordered.
#[derive(Debug, Default)]
pub(crate) struct EventLog {
    entries: Mutex<Vec<Event>>,
}

impl EventLog {
    pub(crate) fn append(&self, event: Event) {
        self.lock().push(event);
    }

    /// O(n) copy of everything received so far, in arrival order.
    pub(crate) fn snapshot(&self) -> Vec<Event> {
        self.lock().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheap, cloneable read handle over an accumulator's event log.
///
/// Obtained from [`EventAccumulator::reader`](crate::EventAccumulator::reader).
/// Handles stay valid after the accumulator stops; they simply keep
/// seeing the final contents. Useful for `'static` assertion closures
/// and for multiple independent readers of the same subscription.
#[derive(Debug, Clone)]
pub struct EventLogReader {
    log: Arc<EventLog>,
}

impl EventLogReader {
    pub(crate) fn new(log: Arc<EventLog>) -> Self {
        Self { log }
    }

    /// Returns an immutable copy of the log's current contents, in
    /// arrival order. Non-blocking and safe to call concurrently with
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(n: u64) -> Event {
        Event::new("t.test", json!({ "seq": n }))
    }

    #[test]
    fn snapshot_preserves_arrival_order() {
        let log = EventLog::default();
        log.append(event(1));
        log.append(event(2));
        log.append(event(3));

        let snap = log.snapshot();
        let seqs: Vec<_> = snap.iter().map(|e| e.field("seq").cloned()).collect();
        assert_eq!(seqs, vec![Some(json!(1)), Some(json!(2)), Some(json!(3))]);
    }

    #[test]
    fn repeated_snapshots_without_arrivals_are_equal() {
        let log = EventLog::default();
        log.append(event(1));
        assert_eq!(log.snapshot(), log.snapshot());
    }

    #[test]
    fn snapshot_is_a_copy_not_a_live_view() {
        let log = EventLog::default();
        log.append(event(1));
        let before = log.snapshot();

        log.append(event(2));
        let after = log.snapshot();

        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
        // Prior elements unchanged, in place.
        assert_eq!(after[0], before[0]);
    }

    #[test]
    fn reader_handles_share_the_same_log() {
        let log = Arc::new(EventLog::default());
        let a = EventLogReader::new(log.clone());
        let b = a.clone();

        assert!(a.is_empty());
        log.append(event(7));
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }
}
