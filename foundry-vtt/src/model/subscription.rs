//! A configured connection to one game server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use state_store::Slot;

use super::{SubscriptionId, WebhookToken};
use crate::payload::Payload;

/// One configured webhook endpoint
///
/// `id`, `token` and `title` are fixed at creation. The latest payload is
/// replaced in full by the router and read as a snapshot by everything else.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    token: WebhookToken,
    title: String,
    created_at: DateTime<Utc>,
    payload: Slot<Payload>,
}

impl Subscription {
    pub(crate) fn new(token: WebhookToken, title: String) -> Self {
        Self {
            id: SubscriptionId::generate(),
            token,
            title,
            created_at: Utc::now(),
            payload: Slot::new(),
        }
    }

    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    pub fn token(&self) -> &WebhookToken {
        &self.token
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Snapshot of the most recent payload, if any was received
    pub fn latest_payload(&self) -> Option<Arc<Payload>> {
        self.payload.load()
    }

    /// Number of payloads received so far
    pub fn payload_version(&self) -> u64 {
        self.payload.version()
    }

    pub(crate) fn replace_payload(&self, payload: Payload) {
        self.payload.replace(payload);
    }

    pub(crate) fn clear_payload(&self) {
        self.payload.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_subscription_has_no_payload() {
        let sub = Subscription::new(WebhookToken::new("tok"), "Game night".to_string());
        assert!(sub.latest_payload().is_none());
        assert_eq!(sub.payload_version(), 0);
        assert_eq!(sub.title(), "Game night");
        assert_eq!(sub.token().as_str(), "tok");
    }

    #[test]
    fn test_replace_is_full_replace() {
        let sub = Subscription::new(WebhookToken::new("tok"), String::new());
        sub.replace_payload(Payload::from_value(json!({"endpoint": "a", "data": {"ac": 10}})).unwrap());
        sub.replace_payload(Payload::from_value(json!({"endpoint": "b"})).unwrap());

        let latest = sub.latest_payload().unwrap();
        assert_eq!(latest.as_value(), &json!({"endpoint": "b"}));
        assert_eq!(sub.payload_version(), 2);
    }
}
