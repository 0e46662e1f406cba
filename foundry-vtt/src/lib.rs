//! Foundry Virtual Tabletop webhook ingestion
//!
//! Receives webhook notifications from a Foundry VTT game server and exposes
//! the latest known values as five metrics per subscription: current HP,
//! max HP, armor class, combat status and current turn.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use foundry_vtt::{FoundryVtt, IntegrationConfig, WebhookToken};
//!
//! #[tokio::main]
//! async fn main() -> foundry_vtt::Result<()> {
//!     foundry_vtt::logging::init_logging_from_env()?;
//!
//!     let vtt = FoundryVtt::new(IntegrationConfig::from_env()?)?;
//!     vtt.start_server().await?;
//!
//!     let token = WebhookToken::generate();
//!     let handle = vtt.setup(token.clone()).await?;
//!     println!("Webhook URL: {}", vtt.webhook_url(&token).await?);
//!
//!     let mut events = vtt.payload_events();
//!     while events.recv().await.is_some() {
//!         println!("{} / {} HP, {}", handle.current_hp(), handle.max_hp(), handle.combat_status());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! POST /api/webhook/{token}
//!         │
//!         ▼
//! CallbackServer ──► PayloadRouter ──► SubscriptionRegistry
//!   (callback_server)      │              └── Subscription { Slot<Payload> }
//!                          ▼
//!                   ChangeNotifier ──► EventBus ("foundry_vtt_event")
//!                          └─────────► WatchSet (metric refresh hints)
//!
//! SubscriptionHandle ──► metrics::{current_hp, max_hp, ...}(latest payload)
//! ```
//!
//! Deliveries never fail from the sender's point of view: malformed bodies
//! and unknown tokens are logged and dropped.

pub mod bus;
pub mod config;
pub mod error;
pub mod handle;
pub mod integration;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod notifier;
pub mod payload;
pub mod registry;
pub mod router;

pub use bus::{BusEvent, EventBus, EventStream, ListenerId, PayloadReceived};
pub use config::{IntegrationConfig, DEFAULT_EVENT_TOPIC};
pub use error::{FoundryError, PayloadError, Result};
pub use handle::SubscriptionHandle;
pub use integration::FoundryVtt;
pub use logging::{LoggingError, LoggingMode};
pub use metrics::{Metric, MetricSnapshot, MetricValue};
pub use model::{Subscription, SubscriptionId, WebhookToken};
pub use notifier::ChangeNotifier;
pub use payload::{EndpointKind, Payload};
pub use registry::{ReplaceOutcome, SubscriptionRegistry};
pub use router::{PayloadRouter, RouteOutcome};

// Change-event types consumers need for `FoundryVtt::changes()`
pub use state_store::{ChangeEvent, ChangeIterator};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        FoundryError, FoundryVtt, IntegrationConfig, Metric, MetricValue, RouteOutcome,
        SubscriptionHandle, SubscriptionId, WebhookToken,
    };
}
