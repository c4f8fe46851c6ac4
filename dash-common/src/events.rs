//! Event types for the dashboard event system
//!
//! Sources publish one event per completed fetch cycle so that connected
//! presentation clients can re-read the affected domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Dashboard event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DashEvent {
    /// A source replaced its collection with freshly fetched records
    SourceRefreshed {
        source: String,
        records: usize,
        /// Index of the candidate URL that answered
        candidate: usize,
        timestamp: DateTime<Utc>,
    },

    /// Every candidate failed; the source is showing retained or seed data
    SourceDegraded {
        source: String,
        attempts: usize,
        /// `retained`, `seed` or `empty`
        fallback: String,
        timestamp: DateTime<Utc>,
    },

    /// The stored filter criteria of a source changed
    CriteriaChanged {
        source: String,
        timestamp: DateTime<Utc>,
    },
}

impl DashEvent {
    /// Event type name, used as the SSE event name
    pub fn event_type(&self) -> &str {
        match self {
            DashEvent::SourceRefreshed { .. } => "SourceRefreshed",
            DashEvent::SourceDegraded { .. } => "SourceDegraded",
            DashEvent::CriteriaChanged { .. } => "CriteriaChanged",
        }
    }

    /// Name of the source the event is about
    pub fn source(&self) -> &str {
        match self {
            DashEvent::SourceRefreshed { source, .. }
            | DashEvent::SourceDegraded { source, .. }
            | DashEvent::CriteriaChanged { source, .. } => source,
        }
    }
}

/// Broadcast bus shared by all sources
///
/// Events emitted with no subscriber are dropped.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DashEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<DashEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DashEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refreshed(source: &str) -> DashEvent {
        DashEvent::SourceRefreshed {
            source: source.to_string(),
            records: 3,
            candidate: 0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_dropped_receiver_unsubscribes() {
        let bus = EventBus::new(16);
        assert_eq!(bus.subscriber_count(), 0);
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.emit_lossy(refreshed("sales"));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_event() {
        let bus = EventBus::new(4);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit_lossy(refreshed("hr"));

        assert_eq!(rx1.recv().await.unwrap().source(), "hr");
        assert_eq!(rx2.recv().await.unwrap().source(), "hr");
    }

    #[test]
    fn test_serialization_is_tagged() {
        let event = DashEvent::CriteriaChanged {
            source: "finance".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CriteriaChanged");
        assert_eq!(json["source"], "finance");
        assert_eq!(event.event_type(), "CriteriaChanged");
    }
}
