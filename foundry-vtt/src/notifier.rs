//! Change notification after a payload update
//!
//! Two things happen per delivered payload: a payload-received event goes out
//! on the [`EventBus`], and watched metrics of that subscription are
//! invalidated so views holding derived values know to re-read them.

use std::sync::Arc;

use serde_json::Value;
use state_store::{ChangeIterator, WatchSet};
use tracing::{trace, warn};

use crate::bus::{EventBus, PayloadReceived};
use crate::config::DEFAULT_EVENT_TOPIC;
use crate::metrics::Metric;
use crate::model::SubscriptionId;

#[derive(Debug)]
pub struct ChangeNotifier {
    bus: Arc<EventBus>,
    topic: String,
    watch: WatchSet<SubscriptionId>,
}

impl ChangeNotifier {
    pub fn new(bus: Arc<EventBus>, topic: impl Into<String>) -> Self {
        Self {
            bus,
            topic: topic.into(),
            watch: WatchSet::new(),
        }
    }

    /// Publish the payload-received event, then request a metric refresh
    ///
    /// Never blocks; returns the number of bus listeners reached.
    pub fn notify(&self, subscription_id: &SubscriptionId, endpoint: &str, data: Value) -> usize {
        let event = PayloadReceived {
            subscription_id: subscription_id.clone(),
            endpoint: endpoint.to_string(),
            data,
        };

        let delivered = match serde_json::to_value(&event) {
            Ok(payload) => self.bus.emit(&self.topic, payload),
            Err(e) => {
                warn!(subscription_id = %subscription_id, error = %e, "Failed to encode payload event");
                0
            }
        };

        self.request_metric_refresh(subscription_id);
        delivered
    }

    /// Hint that every metric of the subscription may have changed
    ///
    /// Emits a change event for each watched metric. Best effort: readers
    /// get correct values whether or not anyone watches.
    pub fn request_metric_refresh(&self, subscription_id: &SubscriptionId) -> usize {
        let emitted = self.watch.invalidate(subscription_id, &Metric::KEYS);
        trace!(subscription_id = %subscription_id, emitted, "Requested metric refresh");
        emitted
    }

    pub fn watch(&self, subscription_id: &SubscriptionId, metric: Metric) {
        self.watch.watch(subscription_id.clone(), metric.key());
    }

    pub fn unwatch(&self, subscription_id: &SubscriptionId, metric: Metric) {
        self.watch.unwatch(subscription_id, metric.key());
    }

    pub fn is_watched(&self, subscription_id: &SubscriptionId, metric: Metric) -> bool {
        self.watch.is_watched(subscription_id, metric.key())
    }

    /// Drop all watches of a removed subscription
    pub fn forget(&self, subscription_id: &SubscriptionId) {
        self.watch.unwatch_entity(subscription_id);
    }

    /// Blocking iterator over metric refresh hints
    pub fn changes(&self) -> ChangeIterator<SubscriptionId> {
        self.watch.iter()
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(Arc::new(EventBus::new()), DEFAULT_EVENT_TOPIC)
    }
}
