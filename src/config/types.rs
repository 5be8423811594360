//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::protocol::DEFAULT_ADDRESS;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub hub: HubConfig,
    pub endpoint: EndpointConfig,
    pub logging: LoggingConfig,
}

/// Socket hub configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HubConfig {
    /// Address handed to the transport on connect
    pub address: String,
    /// How long the mock transport takes to open
    #[serde(with = "humantime_serde")]
    pub open_delay: Duration,
    /// Connect as soon as the binary starts
    pub auto_connect: bool,
}

/// HTTP placeholder endpoint configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub enabled: bool,
    pub bind_addr: SocketAddr,
    /// Grace period for in-flight requests on shutdown
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hub: HubConfig::default(),
            endpoint: EndpointConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            open_delay: Duration::from_millis(100),
            auto_connect: true,
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
