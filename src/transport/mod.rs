//! Transport Module
//!
//! The capability boundary between the hub and whatever carries its frames,
//! plus the mock transport used in place of a real socket.

pub mod mock;
pub mod types;

pub use mock::MockConnector;
pub use types::{Connector, OpenFuture, OpenedTransport, TransportError, TransportEvent, TransportSink};
