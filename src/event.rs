use serde_json::Value;

use crate::Topic;

/// A record of one message delivered by the bus.
///
/// The payload is opaque structured data whose shape is defined by the
/// external system; busspy never interprets it beyond what assertion
/// predicates inspect. Identity is positional (arrival order in the
/// accumulator's log), not content-based. Events are immutable once
/// accumulated.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Event {
    routing_key: Topic,
    payload: Value,
}

impl Event {
    pub fn new(routing_key: impl Into<Topic>, payload: Value) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload,
        }
    }

    /// Returns the routing key this event was delivered under.
    #[inline]
    pub fn routing_key(&self) -> &Topic {
        &self.routing_key
    }

    /// Returns a reference to the structured payload.
    #[inline]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Consumes the event, returning its payload.
    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// Looks up a payload field by dotted path.
    ///
    /// Path segments index into objects by key; a segment that parses
    /// as an integer indexes into arrays. Returns `None` if any segment
    /// is missing.
    ///
    /// # Example
    ///
    /// ```
    /// use busspy::Event;
    /// use serde_json::json;
    ///
    /// let event = Event::new(
    ///     "stasis.app.myapp",
    ///     json!({"data": {"application": "myapp"}}),
    /// );
    /// assert_eq!(event.field("data.application"), Some(&json!("myapp")));
    /// assert_eq!(event.field("data.channel"), None);
    /// ```
    pub fn field(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.payload, |value, segment| {
            match segment.parse::<usize>() {
                Ok(index) if value.is_array() => value.get(index),
                _ => value.get(segment),
            }
        })
    }
}
