//! Socket Hub Module
//!
//! Connection lifecycle and event dispatch for the real-time client.

pub mod error;
pub mod manager;
pub mod registry;
pub mod types;

pub use error::HubError;
pub use manager::{ConnectAttempt, SocketHub};
pub use registry::{Handler, ListenerId, ListenerRegistry, Subscription};
pub use types::{ConnectionInfo, ConnectionState, DisconnectReason, HubStats};
