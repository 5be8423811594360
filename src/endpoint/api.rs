//! Endpoint Routes

use super::handlers::*;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

/// HTTP routes served next to the hub
pub struct EndpointApi;

impl EndpointApi {
    /// Create the endpoint router
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/api/socket", get(socket_placeholder))
            .route("/health", get(health_check))
            .route("/metrics", get(export_metrics))
            .with_state(state)
            .layer(CorsLayer::permissive())
    }
}
