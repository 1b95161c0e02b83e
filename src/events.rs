//! Event emission for assignments and conversions
//!
//! This subsystem only ever writes to the analytics sink. Emission is
//! best-effort: sink failures are logged and dropped, never surfaced to
//! the caller.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Event category under which all experiment events are reported
pub const EVENT_CATEGORY: &str = "experiments";

/// Action name for assignment events
pub const ASSIGNED_ACTION: &str = "experiment_assigned";

/// A named analytics event with a label and optional numeric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEvent {
    pub action: String,
    pub category: String,
    /// `"<experimentId>:<variant>"` for experiment events
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl TrackedEvent {
    /// Assignment event for an experiment/variant pair.
    pub fn assignment(experiment_id: &str, variant: &str) -> Self {
        Self {
            action: ASSIGNED_ACTION.to_string(),
            category: EVENT_CATEGORY.to_string(),
            label: format!("{}:{}", experiment_id, variant),
            value: None,
        }
    }

    /// Conversion event tagged with the visitor's assigned variant.
    pub fn conversion(
        experiment_id: &str,
        variant: &str,
        event_name: &str,
        value: Option<f64>,
    ) -> Self {
        Self {
            action: event_name.to_string(),
            category: EVENT_CATEGORY.to_string(),
            label: format!("{}:{}", experiment_id, variant),
            value,
        }
    }
}

/// Sink for analytics events. Implementations may fail; the session
/// manager swallows those failures.
pub trait EventSink {
    fn record(&self, event: &TrackedEvent) -> Result<()>;
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn record(&self, event: &TrackedEvent) -> Result<()> {
        (**self).record(event)
    }
}

/// Sink that drops every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &TrackedEvent) -> Result<()> {
        Ok(())
    }
}

/// Sink that captures events in memory, for tests and local inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TrackedEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events in emission order.
    pub fn events(&self) -> Vec<TrackedEvent> {
        self.events.lock().expect("sink poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("sink poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &TrackedEvent) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| Error::SinkError("event sink poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

/// Sink that always fails, for exercising the swallow path.
#[derive(Debug, Default)]
pub struct FailingSink;

impl EventSink for FailingSink {
    fn record(&self, _event: &TrackedEvent) -> Result<()> {
        Err(Error::SinkError("event sink unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_event_shape() {
        let event = TrackedEvent::assignment("hero-copy", "variant-b");
        assert_eq!(event.action, "experiment_assigned");
        assert_eq!(event.category, "experiments");
        assert_eq!(event.label, "hero-copy:variant-b");
        assert!(event.value.is_none());
    }

    #[test]
    fn test_conversion_event_shape() {
        let event = TrackedEvent::conversion("hero-copy", "variant-b", "demo_request", Some(49.0));
        assert_eq!(event.action, "demo_request");
        assert_eq!(event.category, "experiments");
        assert_eq!(event.label, "hero-copy:variant-b");
        assert_eq!(event.value, Some(49.0));
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.record(&TrackedEvent::assignment("e", "a")).unwrap();
        sink.record(&TrackedEvent::conversion("e", "a", "signup", None))
            .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, "experiment_assigned");
        assert_eq!(events[1].action, "signup");
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let sink = NullSink;
        assert!(sink.record(&TrackedEvent::assignment("e", "a")).is_ok());
    }

    #[test]
    fn test_failing_sink_errors() {
        let sink = FailingSink;
        assert!(sink.record(&TrackedEvent::assignment("e", "a")).is_err());
    }

    #[test]
    fn test_event_serializes_without_null_value() {
        let event = TrackedEvent::assignment("e", "a");
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("value"));

        let with_value = TrackedEvent::conversion("e", "a", "buy", Some(9.5));
        let json = serde_json::to_string(&with_value).unwrap();
        assert!(json.contains("\"value\":9.5"));
    }
}
