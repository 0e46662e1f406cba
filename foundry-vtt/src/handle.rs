//! Per-subscription read access for presentation layers
//!
//! A `SubscriptionHandle` exposes the five metric accessors. Every read runs
//! the extractor against the live payload; nothing is cached, so two reads
//! with no delivery in between return the same value.
//!
//! ```rust,ignore
//! let handle = vtt.setup(WebhookToken::generate()).await?;
//!
//! println!("HP {}/{}", handle.current_hp(), handle.max_hp());
//!
//! // Ask for refresh hints on the metrics a view displays
//! let hp = handle.watch(Metric::CurrentHp);
//! ```

use std::sync::Arc;

use crate::metrics::{Metric, MetricSnapshot, MetricValue};
use crate::model::{Subscription, SubscriptionId, WebhookToken};
use crate::notifier::ChangeNotifier;
use crate::payload::Payload;
use crate::registry::SubscriptionRegistry;

#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    subscription: Arc<Subscription>,
    registry: Arc<SubscriptionRegistry>,
    notifier: Arc<ChangeNotifier>,
}

impl SubscriptionHandle {
    pub fn new(
        subscription: Arc<Subscription>,
        registry: Arc<SubscriptionRegistry>,
        notifier: Arc<ChangeNotifier>,
    ) -> Self {
        Self {
            subscription,
            registry,
            notifier,
        }
    }

    pub fn current_hp(&self) -> MetricValue {
        self.metric(Metric::CurrentHp)
    }

    pub fn max_hp(&self) -> MetricValue {
        self.metric(Metric::MaxHp)
    }

    pub fn armor_class(&self) -> MetricValue {
        self.metric(Metric::ArmorClass)
    }

    pub fn combat_status(&self) -> MetricValue {
        self.metric(Metric::CombatStatus)
    }

    pub fn current_turn(&self) -> MetricValue {
        self.metric(Metric::CurrentTurn)
    }

    /// Evaluate one metric against the current payload
    pub fn metric(&self, metric: Metric) -> MetricValue {
        metric.extract(self.subscription.latest_payload().as_deref())
    }

    /// All five metrics from a single payload snapshot
    ///
    /// Unlike five separate reads, a delivery arriving midway cannot split
    /// the result across two payloads.
    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot::from_payload(self.subscription.latest_payload().as_deref())
    }

    pub fn latest_payload(&self) -> Option<Arc<Payload>> {
        self.subscription.latest_payload()
    }

    /// False once the subscription has been removed
    pub fn is_available(&self) -> bool {
        self.registry.contains(self.subscription.id())
    }

    /// Register for refresh hints on `metric` and return its current value
    ///
    /// A removed subscription registers nothing; the default value comes back.
    pub fn watch(&self, metric: Metric) -> MetricValue {
        if self.is_available() {
            self.notifier.watch(self.subscription.id(), metric);
            // Removal may have raced the insert; its forget() could already be done
            if !self.is_available() {
                self.notifier.unwatch(self.subscription.id(), metric);
            }
        }
        self.metric(metric)
    }

    pub fn unwatch(&self, metric: Metric) {
        self.notifier.unwatch(self.subscription.id(), metric);
    }

    pub fn is_watched(&self, metric: Metric) -> bool {
        self.notifier.is_watched(self.subscription.id(), metric)
    }

    pub fn id(&self) -> &SubscriptionId {
        self.subscription.id()
    }

    pub fn token(&self) -> &WebhookToken {
        self.subscription.token()
    }

    pub fn title(&self) -> &str {
        self.subscription.title()
    }

    pub fn subscription(&self) -> &Arc<Subscription> {
        &self.subscription
    }
}
