//! Error types for foundry-vtt
//!
//! Only setup and configuration surface errors. Inbound deliveries never do:
//! malformed bodies and unknown tokens are logged and dropped by the router.

use thiserror::Error;

use crate::logging::LoggingError;
use crate::model::SubscriptionId;

/// Result type for foundry-vtt operations
pub type Result<T> = std::result::Result<T, FoundryError>;

#[derive(Error, Debug)]
pub enum FoundryError {
    /// Another subscription already owns this webhook token (redacted)
    #[error("Webhook token already in use: {0}")]
    DuplicateToken(String),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    #[error("Subscription limit reached ({0})")]
    RegistryFull(usize),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Callback server error: {0}")]
    CallbackServer(#[from] callback_server::ServerError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
}

/// Reasons an inbound body is not a usable payload
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}
