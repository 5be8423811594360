//! Transport Types

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Future returned by [`Connector::open`]; resolving it is the "open" notification
pub type OpenFuture =
    Pin<Box<dyn Future<Output = Result<OpenedTransport, TransportError>> + Send + 'static>>;

/// Creates transport handles for an address
pub trait Connector: Send + Sync + 'static {
    fn open(&self, address: &str) -> OpenFuture;
}

/// Outbound half of an open transport
pub trait TransportSink: Send + 'static {
    /// Transmit one frame
    fn send(&mut self, frame: Bytes) -> Result<(), TransportError>;

    /// Close the transport. Calling it more than once is harmless.
    fn close(&mut self);
}

/// Notifications raised by an open transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Message(Bytes),
    Closed { code: Option<u16>, reason: String },
    Error(String),
}

/// A transport that finished opening
pub struct OpenedTransport {
    pub sink: Box<dyn TransportSink>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl std::fmt::Debug for OpenedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedTransport").finish_non_exhaustive()
    }
}

/// Transport-level failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("failed to open {address}: {reason}")]
    OpenFailed { address: String, reason: String },

    #[error("transport is closed")]
    Closed,

    #[error("send failed: {0}")]
    SendFailed(String),
}
