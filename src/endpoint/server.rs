//! Endpoint Server

use super::{api::EndpointApi, handlers::AppState};
use crate::{hub::SocketHub, metrics::HubMetrics, Result};
use anyhow::Context;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Serves the placeholder socket route, health and metrics
pub struct EndpointServer {
    bind_addr: SocketAddr,
    app_state: AppState,
}

impl EndpointServer {
    /// Create a new endpoint server
    pub fn new(bind_addr: SocketAddr, hub: SocketHub, metrics: Option<Arc<HubMetrics>>) -> Self {
        let app_state = AppState {
            hub,
            metrics,
            start_time: SystemTime::now(),
        };

        Self {
            bind_addr,
            app_state,
        }
    }

    /// Serve until `shutdown` resolves
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = EndpointApi::create_router(self.app_state);

        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind endpoint server to {}", self.bind_addr))?;

        info!("Endpoint server listening on {}", self.bind_addr);

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("Endpoint server error: {}", e);
            return Err(e.into());
        }

        info!("Endpoint server stopped");
        Ok(())
    }

    /// Create a router for testing
    pub fn create_test_router(&self) -> Router {
        EndpointApi::create_router(self.app_state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockConnector;

    #[tokio::test]
    async fn test_endpoint_server_creation() {
        let hub = SocketHub::new(MockConnector::immediate());
        let server = EndpointServer::new("127.0.0.1:0".parse().unwrap(), hub, None);

        let _router = server.create_test_router();
    }

    #[tokio::test]
    async fn test_endpoint_server_stops_on_shutdown() {
        let hub = SocketHub::new(MockConnector::immediate());
        let server = EndpointServer::new("127.0.0.1:0".parse().unwrap(), hub, None);

        let result = server.start(async {}).await;
        assert!(result.is_ok());
    }
}
