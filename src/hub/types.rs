//! Hub Types

use std::fmt;

use serde::Serialize;

use crate::protocol::{CLOSE_ABNORMAL, CLOSE_NORMAL};

/// Lifecycle of the hub's single connection handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No handle has been created since construction or the last failed attempt
    Absent,
    Connecting,
    Open,
    /// A handle existed (or an attempt was pending) and has been torn down
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Absent => "absent",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Passed to connect listeners once the handle is open
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub connection_id: String,
    pub address: String,
    pub generation: u64,
}

/// Passed to disconnect listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisconnectReason {
    pub message: String,
    /// Close code, if the transport reported one
    pub code: Option<u16>,
    pub initiated_locally: bool,
}

impl DisconnectReason {
    /// Disconnect requested through the hub
    pub fn local() -> Self {
        Self {
            message: "disconnect requested".to_string(),
            code: Some(CLOSE_NORMAL),
            initiated_locally: true,
        }
    }

    /// Connection closed by the transport
    pub fn remote(message: impl Into<String>, code: Option<u16>) -> Self {
        Self {
            message: message.into(),
            code,
            initiated_locally: false,
        }
    }

    pub(crate) fn stream_ended() -> Self {
        Self::remote("transport stream ended", Some(CLOSE_ABNORMAL))
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code: {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Snapshot of hub counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connects: u64,
    pub connect_failures: u64,
    pub disconnects: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub send_failures: u64,
    pub dispatch_errors: u64,
}
