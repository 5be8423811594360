//! socket-hub - Real-time client hub for the textbook marketplace
//!
//! Runs the socket hub against the mock transport, logs every lifecycle and
//! message event, and serves the placeholder HTTP endpoint.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use socket_hub::{
    config::ConfigManager, endpoint::EndpointServer, metrics::HubMetrics, MockConnector,
    ShutdownCoordinator, SocketHub,
};

/// CLI arguments for socket-hub
#[derive(Parser, Debug)]
#[command(name = "socket-hub")]
#[command(about = "Socket client hub for the textbook marketplace front-end")]
#[command(version)]
#[command(long_about = "
socket-hub - Socket client hub for the textbook marketplace front-end

Connects the hub through the mock transport, logs connect, disconnect,
error and message events, and serves GET /api/socket, /health and /metrics.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  SOCKET_HUB_ADDRESS           - Hub address (e.g., mock://localhost)
  SOCKET_HUB_OPEN_DELAY        - Mock open delay (e.g., 100ms, 1s)
  SOCKET_HUB_BIND_ADDR         - Endpoint bind address (e.g., 127.0.0.1:3001)
  SOCKET_HUB_AUTO_CONNECT      - Connect on startup (true/false)
  SOCKET_HUB_ENDPOINT_ENABLED  - Serve the HTTP endpoint (true/false)
  SOCKET_HUB_LOG_LEVEL         - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "socket-hub.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Hub address (overrides config file)
    #[arg(short, long, help = "Hub address (e.g., mock://localhost)")]
    pub address: Option<String>,

    /// Endpoint bind address (overrides config file)
    #[arg(short, long, help = "Endpoint bind address (e.g., 127.0.0.1:3001)")]
    pub bind: Option<String>,

    /// Mock transport open delay (overrides config file)
    #[arg(long, value_parser = humantime::parse_duration, help = "Mock open delay (e.g., 250ms)")]
    pub open_delay: Option<Duration>,

    /// Do not connect on startup
    #[arg(long, help = "Skip the initial hub connect")]
    pub no_auto_connect: bool,

    /// Do not serve the HTTP endpoint
    #[arg(long, help = "Disable the HTTP placeholder endpoint")]
    pub no_endpoint: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    init_tracing(&args, &config.logging.level)?;

    info!("Starting socket-hub v{}", env!("CARGO_PKG_VERSION"));

    config.merge_with_cli_args(
        args.address.as_deref(),
        args.bind.as_deref(),
        args.open_delay,
        args.no_auto_connect,
        args.no_endpoint,
        args.log_level.as_deref(),
    );

    config
        .validate()
        .context("Final configuration validation failed")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Hub address: {}", config.hub.address);
        info!("  Open delay: {:?}", config.hub.open_delay);
        info!("  Auto connect: {}", config.hub.auto_connect);
        info!(
            "  Endpoint: {}",
            if config.endpoint.enabled {
                config.endpoint.bind_addr.to_string()
            } else {
                "disabled".to_string()
            }
        );
        return Ok(());
    }

    let shutdown_coordinator = ShutdownCoordinator::new(config.endpoint.shutdown_timeout);

    let metrics = Arc::new(HubMetrics::new()?);
    let connector = MockConnector::new(config.hub.open_delay);
    let hub = SocketHub::with_metrics(connector, Arc::clone(&metrics));

    register_logging_listeners(&hub);

    let endpoint_handle = if config.endpoint.enabled {
        let server = EndpointServer::new(
            config.endpoint.bind_addr,
            hub.clone(),
            Some(Arc::clone(&metrics)),
        );
        let shutdown = shutdown_coordinator.signal();

        Some(tokio::spawn(async move {
            if let Err(e) = server.start(shutdown).await {
                error!("Endpoint server error: {:#}", e);
            }
        }))
    } else {
        info!("HTTP endpoint disabled");
        None
    };

    if config.hub.auto_connect {
        match hub.connect(&config.hub.address) {
            Ok(attempt) => {
                let hub = hub.clone();
                tokio::spawn(async move {
                    match attempt.wait().await {
                        Ok(()) => {
                            if let Err(e) = hub.send("presence:online", &json!({ "client": "socket-hub" })) {
                                warn!("Could not announce presence: {}", e);
                            }
                        }
                        Err(e) => warn!("Initial connect did not complete: {}", e),
                    }
                });
            }
            Err(e) => warn!("Initial connect rejected: {}", e),
        }
    }

    info!("socket-hub running; press Ctrl+C or send SIGTERM to stop");

    if let Err(e) = shutdown_coordinator.listen_for_signals().await {
        error!("Error setting up signal handlers: {}", e);
        shutdown_coordinator.trigger();
    }

    shutdown_coordinator.shutdown_hub(&hub);

    if let Some(handle) = endpoint_handle {
        match tokio::time::timeout(shutdown_coordinator.timeout(), handle).await {
            Ok(Err(e)) if !e.is_cancelled() => error!("Endpoint task failed: {}", e),
            Ok(_) => {}
            Err(_) => warn!("Endpoint server did not stop within {:?}", shutdown_coordinator.timeout()),
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Log every hub event; stands in for the UI widgets that consume the hub
fn register_logging_listeners(hub: &SocketHub) {
    hub.on_connect(|info| {
        info!(
            connection_id = %info.connection_id,
            address = %info.address,
            "Chat status: online"
        );
    });

    hub.on_disconnect(|reason| {
        info!(reason = %reason, "Chat status: offline");
    });

    hub.on_error(|err| {
        warn!(error = %err, "Hub error");
    });

    for event_type in ["chat:message", "chat:typing", "cart:update", "listing:update"] {
        hub.on(event_type, move |payload| {
            info!(event_type, payload = %payload, "Inbound message");
        });
    }
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs, configured_level: &str) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        args.log_level.as_deref().unwrap_or(configured_level)
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
