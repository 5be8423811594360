//! Mock Transport
//!
//! Fabricates an open socket after a configurable delay and never touches the
//! network. Frames written by the hub are recorded; the remote side can be
//! driven through [`MockConnector`] to push inbound frames, raise errors or
//! close the connection.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use super::types::{Connector, OpenFuture, OpenedTransport, TransportError, TransportEvent, TransportSink};
use crate::protocol::{decode_frame, encode_frame, Envelope};
use crate::sync::lock;

#[derive(Default)]
struct MockShared {
    open_delay: Duration,
    fail_next: Mutex<Option<String>>,
    sent: Mutex<Vec<Bytes>>,
    // (connection id, sender feeding the hub's reader)
    remote: Mutex<Option<(u64, mpsc::UnboundedSender<TransportEvent>)>>,
    next_id: AtomicU64,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

/// Connector that hands out in-memory transports
#[derive(Clone, Default)]
pub struct MockConnector {
    shared: Arc<MockShared>,
}

impl MockConnector {
    /// Create a connector whose transports open after `open_delay`
    pub fn new(open_delay: Duration) -> Self {
        Self {
            shared: Arc::new(MockShared {
                open_delay,
                ..Default::default()
            }),
        }
    }

    /// Create a connector whose transports open on the next poll
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn open_delay(&self) -> Duration {
        self.shared.open_delay
    }

    /// Make the next open attempt fail with `reason`
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        *lock(&self.shared.fail_next) = Some(reason.into());
    }

    /// Frames written by the hub, oldest first
    pub fn sent_frames(&self) -> Vec<Bytes> {
        lock(&self.shared.sent).clone()
    }

    /// Sent frames decoded as envelopes; frames that fail to decode are skipped
    pub fn sent_envelopes(&self) -> Vec<Envelope> {
        self.sent_frames()
            .iter()
            .filter_map(|frame| decode_frame(frame).ok())
            .collect()
    }

    /// Deliver a raw inbound frame. Returns false if no transport is open.
    pub fn push_frame(&self, frame: impl Into<Bytes>) -> bool {
        self.emit(TransportEvent::Message(frame.into()))
    }

    /// Deliver an inbound `{type, payload}` message
    pub fn push_message(&self, event_type: &str, payload: Value) -> bool {
        match encode_frame(event_type, &payload) {
            Ok(frame) => self.push_frame(frame),
            Err(_) => false,
        }
    }

    /// Raise a transport error on the open connection
    pub fn push_error(&self, message: impl Into<String>) -> bool {
        self.emit(TransportEvent::Error(message.into()))
    }

    /// Close the connection from the remote side
    pub fn close_remote(&self, code: Option<u16>, reason: impl Into<String>) -> bool {
        let remote = lock(&self.shared.remote).take();
        match remote {
            Some((_, tx)) => tx
                .send(TransportEvent::Closed {
                    code,
                    reason: reason.into(),
                })
                .is_ok(),
            None => false,
        }
    }

    /// Whether a transport is currently open
    pub fn has_open_transport(&self) -> bool {
        lock(&self.shared.remote).is_some()
    }

    /// Number of transports successfully opened
    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// Number of times a sink was closed, including the hub's teardown after
    /// a remote close
    pub fn close_count(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    fn emit(&self, event: TransportEvent) -> bool {
        match lock(&self.shared.remote).as_ref() {
            Some((_, tx)) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

impl Connector for MockConnector {
    fn open(&self, address: &str) -> OpenFuture {
        let shared = Arc::clone(&self.shared);
        let address = address.to_string();

        Box::pin(async move {
            if !shared.open_delay.is_zero() {
                tokio::time::sleep(shared.open_delay).await;
            } else {
                tokio::task::yield_now().await;
            }

            if address.trim().is_empty() {
                return Err(TransportError::OpenFailed {
                    address,
                    reason: "empty address".to_string(),
                });
            }

            if let Some(reason) = lock(&shared.fail_next).take() {
                return Err(TransportError::OpenFailed { address, reason });
            }

            let id = shared.next_id.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::unbounded_channel();
            *lock(&shared.remote) = Some((id, tx));
            shared.opens.fetch_add(1, Ordering::SeqCst);

            debug!("Mock transport {} opened for {}", id, address);

            Ok(OpenedTransport {
                sink: Box::new(MockSink {
                    id,
                    shared,
                    open: true,
                }),
                events: rx,
            })
        })
    }
}

struct MockSink {
    id: u64,
    shared: Arc<MockShared>,
    open: bool,
}

impl TransportSink for MockSink {
    fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        lock(&self.shared.sent).push(frame);
        Ok(())
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.shared.closes.fetch_add(1, Ordering::SeqCst);

        let mut remote = lock(&self.shared.remote);
        if matches!(remote.as_ref(), Some((id, _)) if *id == self.id) {
            remote.take();
        }
        debug!("Mock transport {} closed", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_open_records_sent_frames() {
        let connector = MockConnector::immediate();
        let mut opened = connector.open("mock://books").await.unwrap();

        assert!(connector.has_open_transport());
        assert_eq!(connector.open_count(), 1);

        opened.sink.send(Bytes::from_static(b"{\"type\":\"ping\",\"payload\":null}")).unwrap();
        assert_eq!(connector.sent_envelopes(), vec![Envelope::new("ping", Value::Null)]);

        assert!(connector.push_message("pong", json!(1)));
        match opened.events.recv().await {
            Some(TransportEvent::Message(frame)) => {
                assert_eq!(decode_frame(&frame).unwrap().event_type, "pong");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_failure_is_one_shot() {
        let connector = MockConnector::immediate();
        connector.fail_next_open("refused");

        let err = connector.open("mock://books").await.unwrap_err();
        assert_eq!(
            err,
            TransportError::OpenFailed {
                address: "mock://books".to_string(),
                reason: "refused".to_string(),
            }
        );
        assert!(connector.open("mock://books").await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_address_is_rejected() {
        let connector = MockConnector::immediate();
        assert!(connector.open("  ").await.is_err());
        assert_eq!(connector.open_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_sink_rejects_frames() {
        let connector = MockConnector::immediate();
        let mut opened = connector.open("mock://books").await.unwrap();

        opened.sink.close();
        opened.sink.close();

        assert_eq!(connector.close_count(), 1);
        assert!(!connector.has_open_transport());
        assert_eq!(opened.sink.send(Bytes::from_static(b"{}")), Err(TransportError::Closed));
        assert!(!connector.push_frame("late"));
    }
}
