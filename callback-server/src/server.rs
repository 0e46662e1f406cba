//! HTTP server for receiving webhook callbacks.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use url::Url;
use warp::Filter;

use crate::error::ServerError;
use crate::router::{redact, WebhookRouter};

/// Configuration for the callback server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Range of ports to try binding to (inclusive)
    /// Default: (8123, 8223)
    pub port_range: (u16, u16),

    /// Address the listener binds to
    /// Default: 0.0.0.0
    pub bind_address: IpAddr,

    /// Host placed in advertised webhook URLs. Detected when `None`.
    pub advertised_host: Option<String>,

    /// Path prefix in front of the token segment
    /// Default: "api/webhook"
    pub path_prefix: String,

    /// Largest body routed to a handler; larger ones are acknowledged and dropped
    /// Default: 1 MiB
    pub max_body_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port_range: (8123, 8223),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            advertised_host: None,
            path_prefix: "api/webhook".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Configuration bound to loopback only, mainly for tests.
    pub fn loopback(port_range: (u16, u16)) -> Self {
        Self {
            port_range,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            advertised_host: Some("127.0.0.1".to_string()),
            ..Default::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.port_range.0 > self.port_range.1 {
            return Err(ServerError::InvalidConfig(
                "Invalid port range: start must not exceed end".to_string(),
            ));
        }

        if self.normalized_prefix().is_empty() {
            return Err(ServerError::InvalidConfig(
                "Webhook path prefix must not be empty".to_string(),
            ));
        }

        if self.max_body_bytes == 0 {
            return Err(ServerError::InvalidConfig(
                "Max body size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn normalized_prefix(&self) -> String {
        self.path_prefix.trim_matches('/').to_string()
    }
}

/// HTTP callback server for receiving webhook deliveries.
///
/// The `CallbackServer` binds to a local port and accepts
/// `POST /{prefix}/{token}` requests. Every well-formed webhook request is
/// acknowledged with `200 OK`, whether or not the token is known and whatever
/// the body contains, so senders never retry. Bodies are handed to the
/// [`WebhookRouter`], which forwards them to the handler registered for the
/// token.
///
/// # Example
///
/// ```no_run
/// use tokio::sync::mpsc;
/// use std::sync::Arc;
/// use callback_server::{CallbackServer, ServerConfig, WebhookPayload};
///
/// #[tokio::main]
/// async fn main() {
///     let (tx, mut rx) = mpsc::unbounded_channel::<WebhookPayload>();
///
///     let server = CallbackServer::start(ServerConfig::default())
///         .await
///         .expect("Failed to start callback server");
///     server.router().register("my-token".to_string(), Arc::new(tx)).await;
///
///     println!("Send webhooks to: {}", server.webhook_url("my-token").unwrap());
///
///     while let Some(delivery) = rx.recv().await {
///         println!("Received {} bytes", delivery.body.len());
///     }
/// }
/// ```
pub struct CallbackServer {
    /// The port the server is bound to
    port: u16,
    /// The base URL senders should use
    base_url: String,
    /// Path prefix in front of the token segment
    path_prefix: String,
    /// Router for handling incoming deliveries
    router: Arc<WebhookRouter>,
    /// Shutdown signal sender
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl CallbackServer {
    /// Create and start a new callback server.
    ///
    /// The server:
    /// - Finds an available port in the configured range
    /// - Resolves the host used in advertised webhook URLs
    /// - Starts serving `POST /{prefix}/{token}` and `GET /health`
    ///
    /// # Returns
    ///
    /// Returns the running server, or an error if the configuration is
    /// invalid or no port could be bound.
    pub async fn start(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let (start, end) = config.port_range;
        let port = Self::find_available_port(config.bind_address, start, end)
            .ok_or(ServerError::NoAvailablePort { start, end })?;

        let host = match &config.advertised_host {
            Some(host) => host.clone(),
            None => Self::detect_local_ip()
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
                .to_string(),
        };
        let base_url = format!("http://{host}:{port}");
        let path_prefix = config.normalized_prefix();

        let router = Arc::new(WebhookRouter::new());
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let routes = Self::routes(router.clone(), path_prefix.clone(), config.max_body_bytes);

        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(SocketAddr::new(config.bind_address, port), async move {
                shutdown_rx.recv().await;
            })
            .map_err(|e| ServerError::StartupFailed(e.to_string()))?;

        let server_handle = tokio::spawn(server);

        tracing::info!(%addr, %base_url, prefix = %path_prefix, "callback server listening");

        Ok(Self {
            port,
            base_url,
            path_prefix,
            router,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        })
    }

    /// Get the base URL senders should use, `http://<host>:<port>`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the port the server is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Full webhook URL for a token, `http://<host>:<port>/<prefix>/<token>`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use callback_server::{CallbackServer, ServerConfig};
    /// # #[tokio::main]
    /// # async fn main() {
    /// # let server = CallbackServer::start(ServerConfig::default()).await.unwrap();
    /// let url = server.webhook_url("0d9e4b7a").unwrap();
    /// assert!(url.path().ends_with("/api/webhook/0d9e4b7a"));
    /// # }
    /// ```
    pub fn webhook_url(&self, token: &str) -> Result<Url, ServerError> {
        Ok(Url::parse(&format!(
            "{}/{}/{}",
            self.base_url, self.path_prefix, token
        ))?)
    }

    /// Get a reference to the webhook router.
    ///
    /// The router is used to register and unregister tokens.
    pub fn router(&self) -> &Arc<WebhookRouter> {
        &self.router
    }

    /// Shutdown the callback server gracefully.
    ///
    /// Sends the shutdown signal and waits for in-flight requests to finish.
    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }

        tracing::info!(port = self.port, "callback server stopped");
        Ok(())
    }

    /// Build the warp filter tree.
    fn routes(
        router: Arc<WebhookRouter>,
        path_prefix: String,
        max_body_bytes: u64,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone {
        let webhook_route = warp::post()
            .and(warp::path::full())
            .and(warp::body::bytes())
            .and_then(move |path: warp::path::FullPath, body: Bytes| {
                let router = router.clone();
                let token = Self::token_from_path(path.as_str(), &path_prefix);
                async move {
                    let Some(token) = token else {
                        return Err(warp::reject::not_found());
                    };

                    if body.len() as u64 > max_body_bytes {
                        tracing::warn!(
                            token = %redact(&token),
                            bytes = body.len(),
                            limit = max_body_bytes,
                            "dropping oversize webhook body"
                        );
                    } else {
                        tracing::debug!(
                            token = %redact(&token),
                            bytes = body.len(),
                            "webhook delivery received"
                        );

                        router.route(&token, body).await;
                    }

                    // Always acknowledge so the sender never retries
                    Ok::<_, warp::Rejection>(warp::reply::with_status(
                        "",
                        warp::http::StatusCode::OK,
                    ))
                }
            });

        // Path before method, so other paths reject as not-found rather than 405
        let health_route = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .map(|| "ok");

        webhook_route.or(health_route).recover(handle_rejection)
    }

    /// Extract the token from `/<prefix>/<token>`.
    ///
    /// Returns `None` for any other path shape, including an empty token or
    /// extra trailing segments.
    fn token_from_path(path: &str, prefix: &str) -> Option<String> {
        let rest = path.trim_start_matches('/').strip_prefix(prefix)?;
        let token = rest.strip_prefix('/')?.trim_end_matches('/');
        if token.is_empty() || token.contains('/') {
            return None;
        }
        Some(token.to_string())
    }

    /// Find an available port in the given range.
    fn find_available_port(addr: IpAddr, start: u16, end: u16) -> Option<u16> {
        (start..=end).find(|&port| Self::is_port_available(addr, port))
    }

    /// Check if a port is available for binding.
    fn is_port_available(addr: IpAddr, port: u16) -> bool {
        TcpListener::bind(SocketAddr::new(addr, port)).is_ok()
    }

    /// Detect the local IP address for advertised URLs.
    ///
    /// Uses a UDP socket connection to find the address that would be used
    /// for outbound traffic. No data is actually sent.
    fn detect_local_ip() -> Option<IpAddr> {
        let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
        socket.connect("8.8.8.8:80").ok()?;
        let local_addr = socket.local_addr().ok()?;
        Some(local_addr.ip())
    }
}

/// Handle rejections and convert them to HTTP responses.
async fn handle_rejection(
    err: warp::Rejection,
) -> Result<impl warp::Reply, std::convert::Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not found";
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = warp::http::StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed";
    } else {
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error";
    }

    Ok(warp::reply::with_status(message, code))
}
