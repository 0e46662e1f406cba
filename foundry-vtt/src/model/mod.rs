//! Model types for foundry-vtt

mod id_types;
mod subscription;

pub use id_types::{SubscriptionId, WebhookToken};
pub use subscription::Subscription;
