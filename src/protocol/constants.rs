//! Wire Protocol Constants

/// Address used when neither the config file nor the CLI names one
pub const DEFAULT_ADDRESS: &str = "mock://localhost";

// Close codes, same numbering as RFC 6455
pub const CLOSE_NORMAL: u16 = 1000;
pub const CLOSE_GOING_AWAY: u16 = 1001;
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Body returned by the HTTP placeholder route
pub const PLACEHOLDER_MESSAGE: &str = "WebSocket endpoint placeholder";
