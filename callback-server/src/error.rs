//! Error types for the callback server.

use thiserror::Error;

/// Errors that can occur while starting or addressing the callback server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("No available port found in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },

    #[error("Invalid server configuration: {0}")]
    InvalidConfig(String),

    #[error("Server failed to start: {0}")]
    StartupFailed(String),

    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
