//! Generic webhook callback server for receiving game-server notifications.
//!
//! This crate provides a lightweight HTTP server for handling inbound webhook
//! deliveries. It has no knowledge of the payload format; bodies are passed on
//! untouched.
//!
//! # Overview
//!
//! The callback server consists of three main components:
//!
//! - [`CallbackServer`]: HTTP server that binds to a local port and accepts
//!   `POST /{prefix}/{token}` requests.
//! - [`WebhookRouter`]: Routes each delivery to the [`WebhookHandler`]
//!   registered for its token.
//! - [`WebhookPayload`]: Token plus raw body, for channel-based consumers.
//!
//! # Architecture
//!
//! The callback server is a thin HTTP layer that:
//!
//! 1. Binds to an available port in a configured range
//! 2. Extracts the routing token from the request path
//! 3. Hands the raw body to the handler registered for that token
//! 4. Acknowledges every webhook request with `200 OK`
//!
//! Payload parsing and state handling belong to the consuming crate.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use callback_server::{CallbackServer, ServerConfig, WebhookPayload};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), callback_server::ServerError> {
//!     let (tx, mut rx) = mpsc::unbounded_channel::<WebhookPayload>();
//!
//!     let server = CallbackServer::start(ServerConfig::default()).await?;
//!     server.router().register("9b2f6c1e".to_string(), Arc::new(tx)).await;
//!
//!     println!("Webhook URL: {}", server.webhook_url("9b2f6c1e")?);
//!
//!     tokio::spawn(async move {
//!         while let Some(delivery) = rx.recv().await {
//!             println!("{} bytes for {}", delivery.body.len(), delivery.token);
//!         }
//!     });
//!
//!     server.shutdown().await
//! }
//! ```
//!
//! # Private Workspace Crate
//!
//! This crate is intended for internal use within the workspace and is not published
//! to crates.io.

mod error;
pub mod router;
mod server;

pub use error::ServerError;
pub use router::{handler_fn, FnHandler, WebhookHandler, WebhookPayload, WebhookRouter};
pub use server::{CallbackServer, ServerConfig};
