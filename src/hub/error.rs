//! Hub Errors

use crate::transport::TransportError;

/// Failures reported by [`SocketHub`](super::SocketHub) operations and to error listeners
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// `connect` was called while a connection was open or still opening
    #[error("connection to {address} is already open or pending")]
    ConnectionAlreadyActive { address: String },

    /// The transport could not be opened
    #[error("failed to create connection handle for {address}: {reason}")]
    HandleCreationFailed { address: String, reason: String },

    /// `send` was called without an open connection
    #[error("cannot send '{event_type}': not connected")]
    SendWhileClosed { event_type: String },

    /// `disconnect` ran before the pending connect completed
    #[error("connect attempt was cancelled")]
    ConnectCancelled,

    #[error("failed to serialize message: {0}")]
    Serialization(String),

    #[error("malformed inbound frame: {0}")]
    MalformedFrame(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl From<TransportError> for HubError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::OpenFailed { address, reason } => {
                HubError::HandleCreationFailed { address, reason }
            }
            other => HubError::Transport(other.to_string()),
        }
    }
}
