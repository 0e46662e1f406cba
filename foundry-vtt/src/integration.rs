//! FoundryVtt - main entry point
//!
//! Wires the registry, router, notifier and event bus together and, when
//! asked, attaches an HTTP callback server that feeds the router.

use std::sync::Arc;

use callback_server::{CallbackServer, WebhookHandler};
use state_store::ChangeIterator;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::bus::{EventBus, EventStream};
use crate::config::IntegrationConfig;
use crate::error::{FoundryError, Result};
use crate::handle::SubscriptionHandle;
use crate::model::{SubscriptionId, WebhookToken};
use crate::notifier::ChangeNotifier;
use crate::registry::{SubscriptionRegistry, DEFAULT_TITLE};
use crate::router::{PayloadRouter, RouteOutcome};

/// Webhook ingestion for one host process
///
/// # Example
///
/// ```rust,ignore
/// use foundry_vtt::{FoundryVtt, IntegrationConfig, WebhookToken};
///
/// let vtt = FoundryVtt::new(IntegrationConfig::from_env()?)?;
/// vtt.start_server().await?;
///
/// let token = WebhookToken::generate();
/// let handle = vtt.setup(token.clone()).await?;
/// println!("Point the game server at {}", vtt.webhook_url(&token).await?);
///
/// let mut events = vtt.payload_events();
/// while let Some(event) = events.recv().await {
///     println!("{:?} -> HP {}", event.payload_received(), handle.current_hp());
/// }
/// ```
pub struct FoundryVtt {
    config: IntegrationConfig,
    registry: Arc<SubscriptionRegistry>,
    notifier: Arc<ChangeNotifier>,
    router: Arc<PayloadRouter>,
    server: Mutex<Option<CallbackServer>>,
}

impl FoundryVtt {
    /// Create an integration without an HTTP server
    ///
    /// Deliveries can be injected with [`route_callback`](Self::route_callback)
    /// until [`start_server`](Self::start_server) is called.
    pub fn new(config: IntegrationConfig) -> Result<Self> {
        config.validate()?;

        let bus = Arc::new(EventBus::new());
        let notifier = Arc::new(ChangeNotifier::new(bus, config.event_topic.clone()));
        let registry = Arc::new(SubscriptionRegistry::new(config.max_subscriptions));
        let router = Arc::new(PayloadRouter::new(
            Arc::clone(&registry),
            Arc::clone(&notifier),
        ));

        Ok(Self {
            config,
            registry,
            notifier,
            router,
            server: Mutex::new(None),
        })
    }

    /// Bind the callback server and register every existing subscription
    ///
    /// Returns the server's base URL. Calling it again while running returns
    /// the same URL.
    pub async fn start_server(&self) -> Result<String> {
        let mut slot = self.server.lock().await;
        if let Some(server) = slot.as_ref() {
            return Ok(server.base_url().to_string());
        }

        let server = CallbackServer::start(self.config.server_config()).await?;
        for subscription in self.registry.all() {
            server
                .router()
                .register(subscription.token().as_str().to_string(), self.handler())
                .await;
        }

        let base_url = server.base_url().to_string();
        info!(base_url = %base_url, subscriptions = self.registry.len(), "Callback server started");
        *slot = Some(server);
        Ok(base_url)
    }

    /// Create a subscription for `token` and start accepting its callbacks
    pub async fn setup(&self, token: WebhookToken) -> Result<SubscriptionHandle> {
        self.setup_with_title(token, DEFAULT_TITLE).await
    }

    /// Like [`setup`](Self::setup), with a display title
    ///
    /// Fails with [`FoundryError::DuplicateToken`] when the token is taken;
    /// the existing subscription is left as it was. Blank tokens and tokens
    /// containing `/` fail with [`FoundryError::Configuration`].
    pub async fn setup_with_title(
        &self,
        token: WebhookToken,
        title: impl Into<String>,
    ) -> Result<SubscriptionHandle> {
        let subscription = self.registry.create_with_title(token, title)?;

        if let Some(server) = self.server.lock().await.as_ref() {
            server
                .router()
                .register(subscription.token().as_str().to_string(), self.handler())
                .await;
        }

        info!(
            subscription_id = %subscription.id(),
            token = %subscription.token().redacted(),
            "Subscription set up"
        );

        Ok(self.handle_for(subscription))
    }

    /// Remove a subscription: stop routing its token and drop its state
    pub async fn remove(&self, id: &SubscriptionId) -> Result<()> {
        let subscription = self
            .registry
            .remove(id)
            .ok_or_else(|| FoundryError::SubscriptionNotFound(id.clone()))?;

        if let Some(server) = self.server.lock().await.as_ref() {
            server.router().unregister(subscription.token().as_str()).await;
        }

        self.notifier.forget(id);
        subscription.clear_payload();

        info!(subscription_id = %id, "Subscription removed");
        Ok(())
    }

    pub fn handle(&self, id: &SubscriptionId) -> Option<SubscriptionHandle> {
        self.registry.get(id).map(|s| self.handle_for(s))
    }

    /// Handles for all subscriptions, oldest first
    pub fn subscriptions(&self) -> Vec<SubscriptionHandle> {
        self.registry
            .all()
            .into_iter()
            .map(|s| self.handle_for(s))
            .collect()
    }

    /// Deliver a body as if it had arrived on the webhook for `token`
    ///
    /// For hosts with their own HTTP stack.
    pub fn route_callback(&self, token: &str, body: &[u8]) -> RouteOutcome {
        self.router.route_callback(token, body)
    }

    /// Listen on the configured event topic
    pub fn payload_events(&self) -> EventStream {
        self.bus().subscribe(self.config.event_topic.clone())
    }

    /// Listen on an arbitrary topic
    pub fn events(&self, topic: &str) -> EventStream {
        self.bus().subscribe(topic)
    }

    pub fn events_all(&self) -> EventStream {
        self.bus().subscribe_all()
    }

    /// Blocking iterator over metric refresh hints for watched metrics
    pub fn changes(&self) -> ChangeIterator<SubscriptionId> {
        self.notifier.changes()
    }

    /// URL the game server should post to for `token`
    pub async fn webhook_url(&self, token: &WebhookToken) -> Result<String> {
        let server = self.server.lock().await;
        let server = server.as_ref().ok_or_else(|| {
            FoundryError::Configuration("Callback server is not running".to_string())
        })?;
        Ok(server.webhook_url(token.as_str())?.to_string())
    }

    /// Base URL of the running callback server
    pub async fn base_url(&self) -> Option<String> {
        self.server
            .lock()
            .await
            .as_ref()
            .map(|s| s.base_url().to_string())
    }

    /// Stop the callback server, if running; subscriptions are kept
    pub async fn shutdown(&self) -> Result<()> {
        let server = self.server.lock().await.take();
        if let Some(server) = server {
            server.shutdown().await?;
            debug!("Callback server stopped");
        }
        Ok(())
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        self.notifier.bus()
    }

    fn handler(&self) -> Arc<dyn WebhookHandler> {
        Arc::clone(&self.router) as Arc<dyn WebhookHandler>
    }

    fn handle_for(&self, subscription: Arc<crate::model::Subscription>) -> SubscriptionHandle {
        SubscriptionHandle::new(
            subscription,
            Arc::clone(&self.registry),
            Arc::clone(&self.notifier),
        )
    }
}

impl std::fmt::Debug for FoundryVtt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoundryVtt")
            .field("config", &self.config)
            .field("subscriptions", &self.registry.len())
            .finish_non_exhaustive()
    }
}
