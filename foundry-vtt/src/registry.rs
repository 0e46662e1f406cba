//! Registry of configured subscriptions
//!
//! An explicit object, shared by `Arc`, rather than process-wide state: each
//! integration (and each test) owns its own registry.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{FoundryError, Result};
use crate::model::{Subscription, SubscriptionId, WebhookToken};
use crate::payload::Payload;

/// Title given to subscriptions created without one
pub const DEFAULT_TITLE: &str = "Foundry VTT";

/// Result of [`SubscriptionRegistry::replace_payload`]
#[derive(Debug, Clone)]
pub enum ReplaceOutcome {
    /// The first subscription with the token now holds the payload
    Replaced {
        subscription: Arc<Subscription>,
        /// Subscriptions sharing the token; more than one means the
        /// uniqueness invariant was broken
        matches: usize,
    },
    NoMatch,
}

/// Subscriptions in creation order
#[derive(Debug)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<Vec<Arc<Subscription>>>,
    max_subscriptions: usize,
}

impl SubscriptionRegistry {
    pub fn new(max_subscriptions: usize) -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            max_subscriptions,
        }
    }

    /// Create a subscription for `token` with the default title
    pub fn create(&self, token: WebhookToken) -> Result<Arc<Subscription>> {
        self.create_with_title(token, DEFAULT_TITLE)
    }

    /// Create a subscription, rejecting tokens that are already in use
    ///
    /// The token must be a usable URL path segment: non-blank and without
    /// `/`. A rejected call leaves the registry untouched.
    pub fn create_with_title(
        &self,
        token: WebhookToken,
        title: impl Into<String>,
    ) -> Result<Arc<Subscription>> {
        if token.as_str().trim().is_empty() {
            return Err(FoundryError::Configuration(
                "Webhook token must not be empty".to_string(),
            ));
        }
        if token.as_str().contains('/') {
            return Err(FoundryError::Configuration(
                "Webhook token must not contain '/'".to_string(),
            ));
        }

        let mut subscriptions = self.subscriptions.write();

        if subscriptions.iter().any(|s| s.token() == &token) {
            return Err(FoundryError::DuplicateToken(token.redacted()));
        }

        if subscriptions.len() >= self.max_subscriptions {
            return Err(FoundryError::RegistryFull(self.max_subscriptions));
        }

        let subscription = Arc::new(Subscription::new(token, title.into()));
        subscriptions.push(Arc::clone(&subscription));

        debug!(
            subscription_id = %subscription.id(),
            token = %subscription.token().redacted(),
            "Created subscription"
        );

        Ok(subscription)
    }

    pub fn find_by_token(&self, token: &str) -> Option<Arc<Subscription>> {
        self.subscriptions
            .read()
            .iter()
            .find(|s| s.token().as_str() == token)
            .cloned()
    }

    pub fn get(&self, id: &SubscriptionId) -> Option<Arc<Subscription>> {
        self.subscriptions
            .read()
            .iter()
            .find(|s| s.id() == id)
            .cloned()
    }

    pub fn contains(&self, id: &SubscriptionId) -> bool {
        self.subscriptions.read().iter().any(|s| s.id() == id)
    }

    /// All subscriptions, oldest first
    pub fn all(&self) -> Vec<Arc<Subscription>> {
        self.subscriptions.read().clone()
    }

    pub fn remove(&self, id: &SubscriptionId) -> Option<Arc<Subscription>> {
        let mut subscriptions = self.subscriptions.write();
        let index = subscriptions.iter().position(|s| s.id() == id)?;
        Some(subscriptions.remove(index))
    }

    pub fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }

    pub fn max_subscriptions(&self) -> usize {
        self.max_subscriptions
    }

    /// Find the first subscription with `token` and replace its payload
    ///
    /// The scan and the replacement happen under one read-lock scope with no
    /// I/O and no callbacks, so concurrent deliveries never interleave
    /// between finding and writing.
    pub fn replace_payload(&self, token: &str, payload: Payload) -> ReplaceOutcome {
        let subscriptions = self.subscriptions.read();
        let mut matching = subscriptions.iter().filter(|s| s.token().as_str() == token);

        let Some(first) = matching.next() else {
            return ReplaceOutcome::NoMatch;
        };
        let matches = 1 + matching.count();

        first.replace_payload(payload);

        ReplaceOutcome::Replaced {
            subscription: Arc::clone(first),
            matches,
        }
    }

    /// Append without the uniqueness check
    #[cfg(test)]
    pub(crate) fn insert_unchecked(&self, token: WebhookToken) -> Arc<Subscription> {
        let subscription = Arc::new(Subscription::new(token, DEFAULT_TITLE.to_string()));
        self.subscriptions.write().push(Arc::clone(&subscription));
        subscription
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new(crate::config::IntegrationConfig::default().max_subscriptions)
    }
}
