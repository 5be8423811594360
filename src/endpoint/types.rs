//! Endpoint Types

use serde::{Deserialize, Serialize};

use crate::hub::{ConnectionState, HubStats};

/// Static body of the socket placeholder route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderResponse {
    pub message: String,
}

/// Health report including the hub's view of its connection
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub hub_state: ConnectionState,
    pub connected: bool,
    pub address: Option<String>,
    pub uptime_seconds: u64,
    pub stats: HubStats,
}
