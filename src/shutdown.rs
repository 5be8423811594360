//! Graceful Shutdown Handling
//!
//! Listens for SIGTERM/SIGINT, tells running components to stop and closes
//! the hub's connection so disconnect listeners still run on exit.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::signal;
use tracing::{info, debug};
use crate::hub::SocketHub;
use crate::Result;

/// Shutdown coordinator that manages graceful shutdown process
pub struct ShutdownCoordinator {
    /// Broadcast sender for shutdown signal
    shutdown_tx: broadcast::Sender<()>,
    /// How long components get to stop after shutdown is triggered
    timeout: Duration,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new(timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            shutdown_tx,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get a shutdown receiver for components to listen for shutdown signals
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Future that resolves once shutdown has been triggered
    pub fn signal(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    /// Broadcast shutdown to every subscriber
    pub fn trigger(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            debug!("No shutdown subscribers: {}", e);
        }
    }

    /// Start listening for shutdown signals (SIGTERM, SIGINT)
    pub async fn listen_for_signals(&self) -> Result<()> {
        info!("Starting shutdown signal listener");

        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                }
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                }
            }
        }

        #[cfg(windows)]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        self.trigger();
        Ok(())
    }

    /// Cancel any pending connect and close the hub's connection
    pub fn shutdown_hub(&self, hub: &SocketHub) {
        info!("Closing socket hub (state: {})", hub.state());

        hub.disconnect();

        let stats = hub.stats();
        info!(
            "Hub closed: {} connects, {} sent, {} received, {} send failures",
            stats.connects, stats.messages_sent, stats.messages_received, stats.send_failures
        );
    }
}
