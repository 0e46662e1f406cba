//! Topic-based publish/subscribe for host listeners
//!
//! Each listener owns an unbounded channel, so `emit` never waits on a slow
//! consumer. Listeners whose receiving side was dropped are pruned on the next
//! emit. Events on one topic reach each listener in emission order.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

use crate::model::SubscriptionId;

/// Identifies one listener on an [`EventBus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// An event as delivered to listeners
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusEvent {
    pub topic: String,
    pub payload: Value,
    pub fired_at: DateTime<Utc>,
}

impl BusEvent {
    /// Decode the payload as a payload-received event
    pub fn payload_received(&self) -> Option<PayloadReceived> {
        serde_json::from_value(self.payload.clone()).ok()
    }
}

/// Published once for every delivered webhook
///
/// Serializes as
/// `{"type":"payload-received","subscription_id":..,"endpoint":..,"data":..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "payload-received")]
pub struct PayloadReceived {
    pub subscription_id: SubscriptionId,
    pub endpoint: String,
    pub data: Value,
}

#[derive(Debug)]
enum TopicFilter {
    Topic(String),
    All,
}

impl TopicFilter {
    fn matches(&self, topic: &str) -> bool {
        match self {
            TopicFilter::Topic(t) => t == topic,
            TopicFilter::All => true,
        }
    }
}

#[derive(Debug)]
struct Listener {
    id: ListenerId,
    filter: TopicFilter,
    tx: mpsc::UnboundedSender<BusEvent>,
}

/// Receiving side of one listener
#[derive(Debug)]
pub struct EventStream {
    id: ListenerId,
    rx: mpsc::UnboundedReceiver<BusEvent>,
}

impl EventStream {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Wait for the next event; `None` once the listener was unsubscribed
    pub async fn recv(&mut self) -> Option<BusEvent> {
        self.rx.recv().await
    }

    /// Next queued event, without waiting
    pub fn try_recv(&mut self) -> Option<BusEvent> {
        self.rx.try_recv().ok()
    }

    /// Blocking receive for synchronous hosts; must not be called from
    /// inside an async runtime
    pub fn blocking_recv(&mut self) -> Option<BusEvent> {
        self.rx.blocking_recv()
    }
}

/// Fire-and-forget event bus
#[derive(Debug, Default)]
pub struct EventBus {
    listeners: Mutex<Vec<Listener>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to a single topic
    pub fn subscribe(&self, topic: impl Into<String>) -> EventStream {
        self.add_listener(TopicFilter::Topic(topic.into()))
    }

    /// Listen to every topic
    pub fn subscribe_all(&self) -> EventStream {
        self.add_listener(TopicFilter::All)
    }

    /// Detach a listener; its stream ends after draining queued events
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Publish to every listener of `topic`
    ///
    /// Returns how many listeners the event was queued for. With none, the
    /// event is discarded.
    pub fn emit(&self, topic: &str, payload: Value) -> usize {
        let event = BusEvent {
            topic: topic.to_string(),
            payload,
            fired_at: Utc::now(),
        };

        let mut listeners = self.listeners.lock();
        listeners.retain(|l| !l.tx.is_closed());

        let delivered = listeners
            .iter()
            .filter(|l| l.filter.matches(topic))
            .filter(|l| l.tx.send(event.clone()).is_ok())
            .count();

        trace!(topic, delivered, "Emitted event");
        delivered
    }

    /// Listeners currently attached (including ones not yet pruned)
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn add_listener(&self, filter: TopicFilter) -> EventStream {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().push(Listener { id, filter, tx });
        EventStream { id, rx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_emit_without_listeners_is_discarded() {
        let bus = EventBus::new();
        assert_eq!(bus.emit("foundry_vtt_event", json!({})), 0);
    }

    #[test]
    fn test_topic_filtering() {
        let bus = EventBus::new();
        let mut vtt = bus.subscribe("foundry_vtt_event");
        let mut other = bus.subscribe("other");
        let mut all = bus.subscribe_all();

        assert_eq!(bus.emit("foundry_vtt_event", json!({"n": 1})), 2);

        assert_eq!(vtt.try_recv().unwrap().payload, json!({"n": 1}));
        assert!(other.try_recv().is_none());
        assert_eq!(all.try_recv().unwrap().topic, "foundry_vtt_event");
    }

    #[test]
    fn test_same_topic_order_preserved() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe("t");
        for n in 0..10 {
            bus.emit("t", json!(n));
        }

        let received: Vec<_> = std::iter::from_fn(|| stream.try_recv())
            .map(|e| e.payload)
            .collect();
        assert_eq!(received, (0..10).map(|n| json!(n)).collect::<Vec<_>>());
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe("t");
        assert!(bus.unsubscribe(stream.id()));
        assert!(!bus.unsubscribe(stream.id()));

        assert_eq!(bus.emit("t", json!(1)), 0);
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_dropped_listener_is_pruned() {
        let bus = EventBus::new();
        let stream = bus.subscribe("t");
        let _kept = bus.subscribe("t");
        assert_eq!(bus.listener_count(), 2);

        drop(stream);
        assert_eq!(bus.emit("t", json!(1)), 1);
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn test_payload_received_wire_shape() {
        let event = PayloadReceived {
            subscription_id: SubscriptionId::new("sub-1"),
            endpoint: "combat/event".to_string(),
            data: json!({"event": "combat_start"}),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "payload-received",
                "subscription_id": "sub-1",
                "endpoint": "combat/event",
                "data": {"event": "combat_start"}
            })
        );

        let bus_event = BusEvent {
            topic: "foundry_vtt_event".to_string(),
            payload: value,
            fired_at: Utc::now(),
        };
        assert_eq!(bus_event.payload_received(), Some(event));
    }

    #[test]
    fn test_recv_pending_until_emit() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe("t");
        let mut recv = tokio_test::task::spawn(stream.recv());

        tokio_test::assert_pending!(recv.poll());

        bus.emit("t", json!(1));
        assert!(recv.is_woken());
        let event = tokio_test::assert_ready!(recv.poll());
        assert_eq!(event.unwrap().payload, json!(1));
    }

    #[tokio::test]
    async fn test_async_recv() {
        let bus = std::sync::Arc::new(EventBus::new());
        let mut stream = bus.subscribe("t");

        let emitter = std::sync::Arc::clone(&bus);
        tokio::spawn(async move {
            emitter.emit("t", json!("hello"));
        });

        let event = tokio::time::timeout(std::time::Duration::from_secs(1), stream.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.payload, json!("hello"));
    }
}
