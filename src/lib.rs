//! Socket Hub Library
//! 
//! Real-time client layer for the textbook marketplace front-end: a single
//! connection handle behind a pluggable transport, with ordered listener
//! registries for connect, disconnect, error and inbound message events.

pub mod config;
pub mod endpoint;
pub mod hub;
pub mod metrics;
pub mod protocol;
pub mod shutdown;
pub mod transport;

mod sync;

pub use config::Config;
pub use hub::{ConnectAttempt, HubError, SocketHub, Subscription};
pub use shutdown::ShutdownCoordinator;
pub use transport::{Connector, MockConnector};

/// Common error type for configuration and serving
pub type Result<T> = anyhow::Result<T>;
