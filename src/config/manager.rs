//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

const MAX_OPEN_DELAY: Duration = Duration::from_secs(60);
const MAX_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(300);
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config = Self::parse(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!("Configuration file not found at {}, using defaults", path.display());
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        config
            .validate()
            .with_context(|| "Configuration validation failed")?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        Self::load_from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn load_from_vars<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(address) = lookup("SOCKET_HUB_ADDRESS") {
            config.hub.address = address;
        }

        if let Some(delay) = lookup("SOCKET_HUB_OPEN_DELAY") {
            config.hub.open_delay = humantime::parse_duration(&delay)
                .with_context(|| format!("Invalid SOCKET_HUB_OPEN_DELAY: {}", delay))?;
        }

        if let Some(bind_addr) = lookup("SOCKET_HUB_BIND_ADDR") {
            config.endpoint.bind_addr = bind_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid SOCKET_HUB_BIND_ADDR: {}", bind_addr))?;
        }

        if let Some(auto_connect) = lookup("SOCKET_HUB_AUTO_CONNECT") {
            config.hub.auto_connect = auto_connect
                .parse::<bool>()
                .with_context(|| format!("Invalid SOCKET_HUB_AUTO_CONNECT: {}", auto_connect))?;
        }

        if let Some(enabled) = lookup("SOCKET_HUB_ENDPOINT_ENABLED") {
            config.endpoint.enabled = enabled
                .parse::<bool>()
                .with_context(|| format!("Invalid SOCKET_HUB_ENDPOINT_ENABLED: {}", enabled))?;
        }

        if let Some(level) = lookup("SOCKET_HUB_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_hub_config()
            .with_context(|| "Hub configuration validation failed")?;

        self.validate_endpoint_config()
            .with_context(|| "Endpoint configuration validation failed")?;

        self.validate_logging_config()
            .with_context(|| "Logging configuration validation failed")?;

        Ok(())
    }

    fn validate_hub_config(&self) -> Result<()> {
        let address = self.hub.address.trim();
        if address.is_empty() {
            bail!("hub.address must not be empty");
        }

        match address.split_once("://") {
            Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => {}
            _ => bail!("hub.address must look like scheme://host, got '{}'", address),
        }

        if self.hub.open_delay > MAX_OPEN_DELAY {
            bail!("hub.open_delay cannot exceed {:?}", MAX_OPEN_DELAY);
        }

        Ok(())
    }

    fn validate_endpoint_config(&self) -> Result<()> {
        if self.endpoint.shutdown_timeout > MAX_SHUTDOWN_TIMEOUT {
            bail!("endpoint.shutdown_timeout cannot exceed {:?}", MAX_SHUTDOWN_TIMEOUT);
        }

        Ok(())
    }

    fn validate_logging_config(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            bail!("logging.level must be one of: {}", LOG_LEVELS.join(", "));
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        address: Option<&str>,
        bind: Option<&str>,
        open_delay: Option<Duration>,
        no_auto_connect: bool,
        no_endpoint: bool,
        log_level: Option<&str>,
    ) {
        if let Some(address) = address {
            self.hub.address = address.to_string();
            tracing::info!("CLI override: hub address set to {}", address);
        }

        if let Some(bind_str) = bind {
            if let Ok(addr) = bind_str.parse::<SocketAddr>() {
                self.endpoint.bind_addr = addr;
                tracing::info!("CLI override: endpoint bind address set to {}", addr);
            } else {
                tracing::warn!("Invalid bind address provided: {}", bind_str);
            }
        }

        if let Some(delay) = open_delay {
            self.hub.open_delay = delay;
            tracing::info!("CLI override: open delay set to {:?}", delay);
        }

        if no_auto_connect {
            self.hub.auto_connect = false;
            tracing::info!("CLI override: auto connect disabled");
        }

        if no_endpoint {
            self.endpoint.enabled = false;
            tracing::info!("CLI override: placeholder endpoint disabled");
        }

        if let Some(level) = log_level {
            self.logging.level = level.to_string();
            tracing::info!("CLI override: log level set to {}", level);
        }
    }
}
