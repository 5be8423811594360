//! Endpoint Handlers

use super::types::*;
use crate::hub::SocketHub;
use crate::metrics::HubMetrics;
use crate::protocol::PLACEHOLDER_MESSAGE;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::SystemTime;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: SocketHub,
    pub metrics: Option<Arc<HubMetrics>>,
    pub start_time: SystemTime,
}

/// Placeholder for the real-time route; performs no upgrade
pub async fn socket_placeholder() -> Json<PlaceholderResponse> {
    Json(PlaceholderResponse {
        message: PLACEHOLDER_MESSAGE.to_string(),
    })
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let uptime = SystemTime::now()
        .duration_since(state.start_time)
        .unwrap_or_default()
        .as_secs();

    Json(HealthStatus {
        status: "healthy".to_string(),
        hub_state: state.hub.state(),
        connected: state.hub.is_connected(),
        address: state.hub.address(),
        uptime_seconds: uptime,
        stats: state.hub.stats(),
    })
}

/// Prometheus text exposition of the hub metrics
pub async fn export_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(metrics) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            metrics.export(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics are not enabled").into_response(),
    }
}
