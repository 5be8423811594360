//! HTTP Endpoint Module
//! 
//! Placeholder real-time route plus health and metrics, served with axum.

pub mod api;
pub mod handlers;
pub mod server;
pub mod types;

pub use api::EndpointApi;
pub use handlers::AppState;
pub use server::EndpointServer;
pub use types::*;
