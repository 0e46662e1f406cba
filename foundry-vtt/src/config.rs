//! Configuration for the integration
//!
//! Controls where the callback server listens, how webhook URLs are rendered,
//! and the limits applied to subscriptions and inbound bodies.

use std::net::{IpAddr, Ipv4Addr};

use callback_server::ServerConfig;

use crate::error::{FoundryError, Result};

/// Topic the payload-received event is published on
pub const DEFAULT_EVENT_TOPIC: &str = "foundry_vtt_event";

/// Configuration for [`FoundryVtt`](crate::FoundryVtt)
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationConfig {
    /// Port range for the callback server
    /// Default: (8123, 8223)
    pub callback_port_range: (u16, u16),

    /// Address the callback server binds to
    /// Default: 0.0.0.0
    pub bind_address: IpAddr,

    /// Host used in rendered webhook URLs; auto-detected when `None`
    /// Default: None
    pub advertised_host: Option<String>,

    /// Path segment(s) in front of the token
    /// Default: "api/webhook"
    pub webhook_path_prefix: String,

    /// Largest accepted request body in bytes
    /// Default: 1 MiB
    pub max_body_bytes: u64,

    /// Maximum number of subscriptions held at once
    /// Default: 64
    pub max_subscriptions: usize,

    /// Topic for payload-received events
    /// Default: "foundry_vtt_event"
    pub event_topic: String,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            callback_port_range: (8123, 8223),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            advertised_host: None,
            webhook_path_prefix: "api/webhook".to_string(),
            max_body_bytes: 1024 * 1024,
            max_subscriptions: 64,
            event_topic: DEFAULT_EVENT_TOPIC.to_string(),
        }
    }
}

impl IntegrationConfig {
    /// Create a new IntegrationConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen and advertise on 127.0.0.1 only
    ///
    /// Suitable when the game server runs on the same machine, and for tests.
    pub fn local(port_range: (u16, u16)) -> Self {
        Self {
            callback_port_range: port_range,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            advertised_host: Some("127.0.0.1".to_string()),
            ..Default::default()
        }
    }

    /// Defaults overlaid with `FOUNDRY_VTT_*` environment variables
    ///
    /// - `FOUNDRY_VTT_PORT_RANGE`: `start-end`, e.g. `8123-8223`
    /// - `FOUNDRY_VTT_BIND`: bind address
    /// - `FOUNDRY_VTT_PUBLIC_HOST`: host advertised in webhook URLs
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(range) = lookup("FOUNDRY_VTT_PORT_RANGE") {
            config.callback_port_range = parse_port_range(&range)?;
        }

        if let Some(bind) = lookup("FOUNDRY_VTT_BIND") {
            config.bind_address = bind.trim().parse().map_err(|_| {
                FoundryError::Configuration(format!("Invalid FOUNDRY_VTT_BIND: {bind}"))
            })?;
        }

        if let Some(host) = lookup("FOUNDRY_VTT_PUBLIC_HOST") {
            let host = host.trim();
            if !host.is_empty() {
                config.advertised_host = Some(host.to_string());
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_port_range(mut self, start: u16, end: u16) -> Self {
        self.callback_port_range = (start, end);
        self
    }

    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    pub fn with_advertised_host(mut self, host: impl Into<String>) -> Self {
        self.advertised_host = Some(host.into());
        self
    }

    pub fn with_max_subscriptions(mut self, max: usize) -> Self {
        self.max_subscriptions = max;
        self
    }

    pub fn with_max_body_bytes(mut self, max: u64) -> Self {
        self.max_body_bytes = max;
        self
    }

    pub fn with_event_topic(mut self, topic: impl Into<String>) -> Self {
        self.event_topic = topic.into();
        self
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        let (start, end) = self.callback_port_range;
        if start == 0 || start > end {
            return Err(FoundryError::Configuration(format!(
                "Invalid callback port range {start}-{end}"
            )));
        }

        if self.webhook_path_prefix.trim_matches('/').is_empty() {
            return Err(FoundryError::Configuration(
                "Webhook path prefix must not be empty".to_string(),
            ));
        }

        if self.max_body_bytes == 0 {
            return Err(FoundryError::Configuration(
                "Max body size must be greater than 0".to_string(),
            ));
        }

        if self.max_subscriptions == 0 {
            return Err(FoundryError::Configuration(
                "Max subscriptions must be greater than 0".to_string(),
            ));
        }

        if self.event_topic.is_empty() {
            return Err(FoundryError::Configuration(
                "Event topic must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Callback server settings derived from this config
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port_range: self.callback_port_range,
            bind_address: self.bind_address,
            advertised_host: self.advertised_host.clone(),
            path_prefix: self.webhook_path_prefix.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

fn parse_port_range(value: &str) -> Result<(u16, u16)> {
    let invalid = || FoundryError::Configuration(format!("Invalid FOUNDRY_VTT_PORT_RANGE: {value}"));

    let (start, end) = value.split_once('-').ok_or_else(invalid)?;
    let start = start.trim().parse().map_err(|_| invalid())?;
    let end = end.trim().parse().map_err(|_| invalid())?;
    Ok((start, end))
}
