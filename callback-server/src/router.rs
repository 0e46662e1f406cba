//! Token-based routing for inbound webhook callbacks.
//!
//! This module provides the `WebhookRouter` which maintains the set of active
//! webhook tokens and hands each inbound body to the handler registered for
//! its token.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, RwLock};

/// Raw webhook delivery as received over HTTP.
///
/// Contains only the routing token taken from the request path and the
/// untouched request body. No payload parsing happens at this layer.
#[derive(Debug, Clone)]
pub struct WebhookPayload {
    /// The token from the `/{prefix}/{token}` path segment
    pub token: String,
    /// The raw request body
    pub body: Bytes,
}

/// Receiver of webhook bodies for one or more tokens.
///
/// Handlers are invoked on the HTTP task, so implementations must return
/// quickly and never block. Anything slow belongs behind a channel.
pub trait WebhookHandler: Send + Sync {
    /// Handle one inbound body addressed to `token`.
    fn handle(&self, token: &str, body: Bytes);
}

impl WebhookHandler for mpsc::UnboundedSender<WebhookPayload> {
    fn handle(&self, token: &str, body: Bytes) {
        // Receiver dropped means nobody is listening any more
        let _ = self.send(WebhookPayload {
            token: token.to_string(),
            body,
        });
    }
}

/// Adapter turning a closure into a [`WebhookHandler`].
pub struct FnHandler<F>(F);

impl<F> WebhookHandler for FnHandler<F>
where
    F: Fn(&str, Bytes) + Send + Sync,
{
    fn handle(&self, token: &str, body: Bytes) {
        (self.0)(token, body)
    }
}

/// Wrap a closure as a shareable handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn WebhookHandler>
where
    F: Fn(&str, Bytes) + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Routes webhook bodies from HTTP callbacks to registered handlers.
///
/// The `WebhookRouter` maps each active token to its handler. When a body
/// arrives, the router looks the token up and forwards the body. Unknown
/// tokens are dropped.
#[derive(Clone, Default)]
pub struct WebhookRouter {
    /// Active tokens and their handlers
    handlers: Arc<RwLock<HashMap<String, Arc<dyn WebhookHandler>>>>,
}

impl WebhookRouter {
    /// Create a new, empty router.
    ///
    /// # Example
    ///
    /// ```
    /// use callback_server::WebhookRouter;
    ///
    /// let router = WebhookRouter::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a token.
    ///
    /// Replaces the handler if the token was already registered.
    ///
    /// # Example
    ///
    /// ```
    /// # use bytes::Bytes;
    /// # use callback_server::{handler_fn, WebhookRouter};
    /// # #[tokio::main]
    /// # async fn main() {
    /// let router = WebhookRouter::new();
    /// router
    ///     .register("3f1c0a".to_string(), handler_fn(|_token: &str, _body: Bytes| {}))
    ///     .await;
    /// assert!(router.is_registered("3f1c0a").await);
    /// # }
    /// ```
    pub async fn register(&self, token: String, handler: Arc<dyn WebhookHandler>) {
        let mut handlers = self.handlers.write().await;
        if handlers.insert(token.clone(), handler).is_some() {
            tracing::warn!(token = %redact(&token), "replaced existing webhook handler");
        } else {
            tracing::debug!(token = %redact(&token), "registered webhook handler");
        }
    }

    /// Unregister a token.
    ///
    /// Returns `true` if the token was registered.
    pub async fn unregister(&self, token: &str) -> bool {
        let removed = self.handlers.write().await.remove(token).is_some();
        if removed {
            tracing::debug!(token = %redact(token), "unregistered webhook handler");
        }
        removed
    }

    /// Check whether a token currently has a handler.
    pub async fn is_registered(&self, token: &str) -> bool {
        self.handlers.read().await.contains_key(token)
    }

    /// Number of registered tokens.
    pub async fn len(&self) -> usize {
        self.handlers.read().await.len()
    }

    /// Whether no tokens are registered.
    pub async fn is_empty(&self) -> bool {
        self.handlers.read().await.is_empty()
    }

    /// Route an inbound body to the handler for `token`.
    ///
    /// Returns `true` if a handler was found and invoked, `false` if the
    /// token is unknown and the body was dropped.
    pub async fn route(&self, token: &str, body: Bytes) -> bool {
        let handler = self.handlers.read().await.get(token).cloned();

        match handler {
            Some(handler) => {
                handler.handle(token, body);
                true
            }
            None => {
                tracing::debug!(token = %redact(token), "dropping webhook for unknown token");
                false
            }
        }
    }
}

impl std::fmt::Debug for WebhookRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookRouter").finish_non_exhaustive()
    }
}

/// Shorten a token for log output.
///
/// Tokens are secrets; only the first four characters are ever logged.
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}…")
}
