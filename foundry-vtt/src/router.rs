//! Routing of inbound webhook bodies to subscriptions
//!
//! Per call: parse, find the subscription by token, replace its payload, then
//! notify. At most one payload replacement and at most one notification ever
//! happen, and no failure is reported back to the transport.

use std::sync::Arc;

use bytes::Bytes;
use callback_server::router::redact;
use callback_server::WebhookHandler;
use tracing::{debug, error, warn};

use crate::model::SubscriptionId;
use crate::notifier::ChangeNotifier;
use crate::payload::Payload;
use crate::registry::{ReplaceOutcome, SubscriptionRegistry};

/// What happened to one inbound callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Delivered { subscription_id: SubscriptionId },
    /// Body was not a JSON object; nothing changed
    Malformed,
    /// No subscription owns the token; nothing changed
    UnknownToken,
}

#[derive(Debug, Clone)]
pub struct PayloadRouter {
    registry: Arc<SubscriptionRegistry>,
    notifier: Arc<ChangeNotifier>,
}

impl PayloadRouter {
    pub fn new(registry: Arc<SubscriptionRegistry>, notifier: Arc<ChangeNotifier>) -> Self {
        Self { registry, notifier }
    }

    pub fn route_callback(&self, token: &str, body: &[u8]) -> RouteOutcome {
        let payload = match Payload::from_slice(body) {
            Ok(payload) => payload,
            Err(e) => {
                error!(token = %redact(token), error = %e, "Dropping malformed webhook body");
                return RouteOutcome::Malformed;
            }
        };

        let endpoint = payload.endpoint().to_string();
        let data = payload.data_or_empty();

        match self.registry.replace_payload(token, payload) {
            ReplaceOutcome::NoMatch => {
                debug!(token = %redact(token), "No subscription for webhook token");
                RouteOutcome::UnknownToken
            }
            ReplaceOutcome::Replaced {
                subscription,
                matches,
            } => {
                if matches > 1 {
                    warn!(
                        token = %redact(token),
                        matches,
                        subscription_id = %subscription.id(),
                        "Webhook token shared by several subscriptions; updated the oldest"
                    );
                }

                debug!(
                    subscription_id = %subscription.id(),
                    endpoint = %endpoint,
                    "Stored webhook payload"
                );

                self.notifier.notify(subscription.id(), &endpoint, data);

                RouteOutcome::Delivered {
                    subscription_id: subscription.id().clone(),
                }
            }
        }
    }
}

impl WebhookHandler for PayloadRouter {
    fn handle(&self, token: &str, body: Bytes) {
        self.route_callback(token, &body);
    }
}
