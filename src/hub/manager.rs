//! Socket Hub Implementation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::error::HubError;
use super::registry::{ListenerRegistry, Subscription};
use super::types::{ConnectionInfo, ConnectionState, DisconnectReason, HubStats};
use crate::metrics::HubMetrics;
use crate::protocol::{decode_frame, encode_frame};
use crate::sync::lock;
use crate::transport::{Connector, OpenedTransport, TransportError, TransportEvent, TransportSink};

/// Owns at most one connection handle and dispatches lifecycle and message
/// events to registered listeners.
///
/// Cloning is cheap; clones share the same connection and listeners.
#[derive(Clone)]
pub struct SocketHub {
    inner: Arc<HubInner>,
}

/// Outcome of a connect call that was accepted
///
/// Await [`wait`](ConnectAttempt::wait) for the typed result, or drop it if the
/// connect and error listeners are enough.
#[derive(Debug)]
pub struct ConnectAttempt {
    generation: u64,
    outcome: oneshot::Receiver<Result<(), HubError>>,
}

impl ConnectAttempt {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the handle to open or the attempt to fail
    pub async fn wait(self) -> Result<(), HubError> {
        self.outcome.await.unwrap_or(Err(HubError::ConnectCancelled))
    }
}

struct HubInner {
    connector: Arc<dyn Connector>,
    registry: Arc<ListenerRegistry>,
    state: Mutex<HubState>,
    counters: HubCounters,
    metrics: Option<Arc<HubMetrics>>,
}

struct HubState {
    phase: ConnectionState,
    address: Option<String>,
    // Bumped by every connect and disconnect; completions carrying an older value are stale
    generation: u64,
    connection: Option<ActiveConnection>,
    pending: Option<JoinHandle<()>>,
}

struct ActiveConnection {
    info: ConnectionInfo,
    sink: Box<dyn TransportSink>,
    reader: JoinHandle<()>,
}

#[derive(Default)]
struct HubCounters {
    connects: AtomicU64,
    connect_failures: AtomicU64,
    disconnects: AtomicU64,
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    send_failures: AtomicU64,
    dispatch_errors: AtomicU64,
}

impl SocketHub {
    /// Create a hub backed by `connector`
    pub fn new<C: Connector>(connector: C) -> Self {
        Self::build(Arc::new(connector), None)
    }

    /// Create a hub that also records into Prometheus metrics
    pub fn with_metrics<C: Connector>(connector: C, metrics: Arc<HubMetrics>) -> Self {
        Self::build(Arc::new(connector), Some(metrics))
    }

    fn build(connector: Arc<dyn Connector>, metrics: Option<Arc<HubMetrics>>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                connector,
                registry: ListenerRegistry::new(),
                state: Mutex::new(HubState {
                    phase: ConnectionState::Absent,
                    address: None,
                    generation: 0,
                    connection: None,
                    pending: None,
                }),
                counters: HubCounters::default(),
                metrics,
            }),
        }
    }

    /// Start connecting to `address`.
    ///
    /// Rejected with [`HubError::ConnectionAlreadyActive`] while a connection is
    /// open or pending. Otherwise the open runs on the tokio runtime; when it
    /// succeeds the hub becomes open and every connect listener runs in
    /// registration order.
    #[instrument(skip(self))]
    pub fn connect(&self, address: &str) -> Result<ConnectAttempt, HubError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            HubError::HandleCreationFailed {
                address: address.to_string(),
                reason: e.to_string(),
            }
        })?;

        let (tx, rx) = oneshot::channel();
        let mut state = lock(&self.inner.state);

        if matches!(state.phase, ConnectionState::Open | ConnectionState::Connecting) {
            let active = state.address.clone().unwrap_or_default();
            debug!("Ignoring connect to {}: connection to {} is {}", address, active, state.phase);
            return Err(HubError::ConnectionAlreadyActive { address: active });
        }

        state.generation += 1;
        let generation = state.generation;
        state.phase = ConnectionState::Connecting;
        state.address = Some(address.to_string());

        let weak = Arc::downgrade(&self.inner);
        let connector = Arc::clone(&self.inner.connector);
        let target = address.to_string();
        state.pending = Some(runtime.spawn(async move {
            let result = connector.open(&target).await;
            let outcome = match weak.upgrade() {
                Some(inner) => inner.finish_open(generation, target, result),
                None => return,
            };
            let _ = tx.send(outcome);
        }));

        info!("Connecting to {} (attempt {})", address, generation);
        Ok(ConnectAttempt {
            generation,
            outcome: rx,
        })
    }

    /// Cancel a pending connect and close the open handle, if any.
    ///
    /// Disconnect listeners run only when a handle was actually closed.
    /// Calling this without a connection is a no-op.
    pub fn disconnect(&self) {
        self.inner.teardown(None, DisconnectReason::local());
    }

    /// Register a handler for inbound messages of `event_type`
    pub fn on<F>(&self, event_type: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.registry.add_message(event_type, Arc::new(handler))
    }

    /// Register a handler that runs every time a handle opens
    pub fn on_connect<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ConnectionInfo) + Send + Sync + 'static,
    {
        self.inner.registry.add_connect(Arc::new(handler))
    }

    /// Register a handler that runs every time an open handle closes
    pub fn on_disconnect<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&DisconnectReason) + Send + Sync + 'static,
    {
        self.inner.registry.add_disconnect(Arc::new(handler))
    }

    /// Register a handler for failures that have no caller to return to:
    /// failed opens, malformed inbound frames and transport errors
    pub fn on_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&HubError) + Send + Sync + 'static,
    {
        self.inner.registry.add_error(Arc::new(handler))
    }

    /// Serialize `{type, payload}` and write it to the open handle.
    ///
    /// Fails with [`HubError::SendWhileClosed`] when not connected; nothing
    /// reaches the transport in that case.
    pub fn send<P>(&self, event_type: &str, payload: &P) -> Result<(), HubError>
    where
        P: Serialize + ?Sized,
    {
        let result = {
            let mut state = lock(&self.inner.state);
            match state.connection.as_mut() {
                Some(connection) => encode_frame(event_type, payload).and_then(|frame| {
                    connection.sink.send(frame).map_err(HubError::from)
                }),
                None => Err(HubError::SendWhileClosed {
                    event_type: event_type.to_string(),
                }),
            }
        };

        match &result {
            Ok(()) => {
                self.inner.counters.messages_sent.fetch_add(1, Ordering::Relaxed);
                if let Some(metrics) = &self.inner.metrics {
                    metrics.record_sent();
                }
                debug!("Sent '{}'", event_type);
            }
            Err(e) => {
                self.inner.counters.send_failures.fetch_add(1, Ordering::Relaxed);
                if let Some(metrics) = &self.inner.metrics {
                    metrics.record_send_failure();
                }
                error!("Dropping outbound '{}': {}", event_type, e);
            }
        }

        result
    }

    /// Whether the handle is currently open
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.inner.state).phase
    }

    /// Address of the current or most recent connect
    pub fn address(&self) -> Option<String> {
        lock(&self.inner.state).address.clone()
    }

    /// Details of the open connection, if any
    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        lock(&self.inner.state)
            .connection
            .as_ref()
            .map(|c| c.info.clone())
    }

    pub fn stats(&self) -> HubStats {
        let c = &self.inner.counters;
        HubStats {
            connects: c.connects.load(Ordering::Relaxed),
            connect_failures: c.connect_failures.load(Ordering::Relaxed),
            disconnects: c.disconnects.load(Ordering::Relaxed),
            messages_sent: c.messages_sent.load(Ordering::Relaxed),
            messages_received: c.messages_received.load(Ordering::Relaxed),
            send_failures: c.send_failures.load(Ordering::Relaxed),
            dispatch_errors: c.dispatch_errors.load(Ordering::Relaxed),
        }
    }

    /// Number of message handlers registered for `event_type`
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.inner.registry.message_listener_count(event_type)
    }
}

impl HubInner {
    fn finish_open(
        self: &Arc<Self>,
        generation: u64,
        address: String,
        result: Result<OpenedTransport, TransportError>,
    ) -> Result<(), HubError> {
        let opened = match result {
            Ok(opened) => opened,
            Err(e) => return self.fail_open(generation, address, e),
        };

        let info = {
            let mut state = lock(&self.state);
            if state.generation != generation || state.phase != ConnectionState::Connecting {
                drop(state);
                debug!("Discarding stale open of {} (attempt {})", address, generation);
                let mut sink = opened.sink;
                sink.close();
                return Err(HubError::ConnectCancelled);
            }

            let info = ConnectionInfo {
                connection_id: Uuid::new_v4().to_string(),
                address,
                generation,
            };
            let reader = tokio::spawn(read_loop(Arc::downgrade(self), generation, opened.events));

            state.phase = ConnectionState::Open;
            state.pending = None;
            state.connection = Some(ActiveConnection {
                info: info.clone(),
                sink: opened.sink,
                reader,
            });
            info
        };

        self.counters.connects.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.record_connect();
        }
        info!("Connected to {} (connection {})", info.address, info.connection_id);

        let notified = self.registry.connect.emit(&info);
        debug!("Notified {} connect listeners", notified);
        Ok(())
    }

    fn fail_open(&self, generation: u64, address: String, cause: TransportError) -> Result<(), HubError> {
        {
            let mut state = lock(&self.state);
            if state.generation != generation {
                return Err(HubError::ConnectCancelled);
            }
            state.phase = ConnectionState::Absent;
            state.pending = None;
        }

        let err = HubError::from(cause);
        self.counters.connect_failures.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.record_connect_failure();
        }
        error!("Connect to {} failed: {}", address, err);

        self.registry.error.emit(&err);
        Err(err)
    }

    /// Tear down the current connection. With `expected` set, only the
    /// connection opened by that attempt is affected.
    fn teardown(&self, expected: Option<u64>, reason: DisconnectReason) -> bool {
        let connection = {
            let mut state = lock(&self.state);
            if expected.is_some_and(|generation| generation != state.generation) {
                return false;
            }

            if let Some(pending) = state.pending.take() {
                pending.abort();
                debug!("Cancelled pending connect (attempt {})", state.generation);
            }

            let was_active = matches!(state.phase, ConnectionState::Open | ConnectionState::Connecting);
            state.generation += 1;
            if was_active {
                state.phase = ConnectionState::Closed;
            }
            state.connection.take()
        };

        let Some(mut connection) = connection else {
            return false;
        };

        if reason.initiated_locally {
            connection.reader.abort();
        }
        connection.sink.close();

        self.counters.disconnects.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.record_disconnect();
        }
        info!(
            "Disconnected from {} (connection {}): {}",
            connection.info.address, connection.info.connection_id, reason
        );

        self.registry.disconnect.emit(&reason);
        true
    }

    fn dispatch_frame(&self, frame: &[u8]) {
        match decode_frame(frame) {
            Ok(envelope) => {
                self.counters.messages_received.fetch_add(1, Ordering::Relaxed);
                if let Some(metrics) = &self.metrics {
                    metrics.record_received();
                }

                let handled = self.registry.emit_message(&envelope.event_type, &envelope.payload);
                if handled == 0 {
                    debug!("No handlers registered for '{}'", envelope.event_type);
                }
            }
            Err(e) => {
                self.counters.dispatch_errors.fetch_add(1, Ordering::Relaxed);
                if let Some(metrics) = &self.metrics {
                    metrics.record_dispatch_error();
                }
                warn!("Dropping inbound frame: {}", e);
                self.registry.error.emit(&e);
            }
        }
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        if let Some(mut connection) = state.connection.take() {
            connection.reader.abort();
            connection.sink.close();
        }
    }
}

async fn read_loop(
    hub: Weak<HubInner>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = hub.upgrade() else {
            return;
        };

        match event {
            TransportEvent::Message(frame) => inner.dispatch_frame(&frame),
            TransportEvent::Error(message) => {
                warn!("Transport error: {}", message);
                inner.registry.error.emit(&HubError::Transport(message));
            }
            TransportEvent::Closed { code, reason } => {
                inner.teardown(Some(generation), DisconnectReason::remote(reason, code));
                return;
            }
        }
    }

    if let Some(inner) = hub.upgrade() {
        inner.teardown(Some(generation), DisconnectReason::stream_ended());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockConnector;
    use serde_json::json;
    use std::time::Duration;

    async fn connected_hub() -> (SocketHub, MockConnector) {
        let connector = MockConnector::immediate();
        let hub = SocketHub::new(connector.clone());
        hub.connect("mock://test").unwrap().wait().await.unwrap();
        (hub, connector)
    }

    #[tokio::test]
    async fn test_new_hub_is_absent() {
        let hub = SocketHub::new(MockConnector::immediate());
        assert_eq!(hub.state(), ConnectionState::Absent);
        assert!(!hub.is_connected());
        assert!(hub.address().is_none());
        assert!(hub.connection_info().is_none());
    }

    #[tokio::test]
    async fn test_connect_opens_and_tracks_address() {
        let (hub, connector) = connected_hub().await;

        assert!(hub.is_connected());
        assert_eq!(hub.address().as_deref(), Some("mock://test"));
        assert_eq!(connector.open_count(), 1);

        let info = hub.connection_info().unwrap();
        assert_eq!(info.address, "mock://test");
        assert_eq!(info.generation, 1);
    }

    #[tokio::test]
    async fn test_state_is_connecting_until_open_fires() {
        let connector = MockConnector::new(Duration::from_millis(50));
        let hub = SocketHub::new(connector);

        let attempt = hub.connect("mock://slow").unwrap();
        assert_eq!(hub.state(), ConnectionState::Connecting);
        assert!(!hub.is_connected());

        attempt.wait().await.unwrap();
        assert_eq!(hub.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_disconnect_closes_sink_and_reader() {
        let (hub, connector) = connected_hub().await;

        hub.disconnect();

        assert_eq!(hub.state(), ConnectionState::Closed);
        assert_eq!(connector.close_count(), 1);
        assert!(!connector.has_open_transport());
        assert_eq!(hub.stats().disconnects, 1);
    }

    #[tokio::test]
    async fn test_send_writes_envelope() {
        let (hub, connector) = connected_hub().await;

        hub.send("chat:message", &json!({ "text": "is the calculus book still available?" }))
            .unwrap();

        let sent = connector.sent_envelopes();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event_type, "chat:message");
        assert_eq!(sent[0].payload["text"], "is the calculus book still available?");
        assert_eq!(hub.stats().messages_sent, 1);
    }

    #[tokio::test]
    async fn test_send_while_closed_is_reported() {
        let connector = MockConnector::immediate();
        let hub = SocketHub::new(connector.clone());

        let err = hub.send("ping", &()).unwrap_err();
        assert_eq!(
            err,
            HubError::SendWhileClosed {
                event_type: "ping".to_string()
            }
        );
        assert!(connector.sent_frames().is_empty());
        assert_eq!(hub.stats().send_failures, 1);
    }

    #[tokio::test]
    async fn test_failed_open_resets_to_absent() {
        let connector = MockConnector::immediate();
        connector.fail_next_open("refused");
        let hub = SocketHub::new(connector);

        let err = hub.connect("mock://down").unwrap().wait().await.unwrap_err();
        assert!(matches!(err, HubError::HandleCreationFailed { .. }));
        assert_eq!(hub.state(), ConnectionState::Absent);
        assert_eq!(hub.stats().connect_failures, 1);

        hub.connect("mock://down").unwrap().wait().await.unwrap();
        assert!(hub.is_connected());
    }

    #[test]
    fn test_connect_outside_runtime_fails_cleanly() {
        let hub = SocketHub::new(MockConnector::immediate());
        let err = hub.connect("mock://x").unwrap_err();
        assert!(matches!(err, HubError::HandleCreationFailed { .. }));
        assert_eq!(hub.state(), ConnectionState::Absent);
    }

    #[tokio::test]
    async fn test_dropping_hub_closes_transport() {
        let (hub, connector) = connected_hub().await;
        drop(hub);
        assert!(!connector.has_open_transport());
    }

    #[tokio::test]
    async fn test_malformed_frame_is_recorded_in_metrics() {
        let connector = MockConnector::immediate();
        let metrics = Arc::new(HubMetrics::new().unwrap());
        let hub = SocketHub::with_metrics(connector.clone(), Arc::clone(&metrics));
        hub.connect("mock://test").unwrap().wait().await.unwrap();

        assert!(connector.push_frame("{\"payload\":1}"));
        tokio::time::timeout(Duration::from_secs(2), async {
            while hub.stats().dispatch_errors == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(metrics.export().contains("socket_hub_dispatch_errors_total 1"));
        assert!(hub.is_connected());
    }
}
