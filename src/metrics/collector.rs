//! Hub Metrics Collector

use prometheus::{Counter, Gauge, Registry, TextEncoder};
use tracing::error;

use crate::Result;

/// Prometheus metrics recorded by a [`SocketHub`](crate::hub::SocketHub)
pub struct HubMetrics {
    registry: Registry,
    connects_total: Counter,
    connect_failures_total: Counter,
    disconnects_total: Counter,
    messages_sent_total: Counter,
    messages_received_total: Counter,
    send_failures_total: Counter,
    dispatch_errors_total: Counter,
    connected: Gauge,
}

impl HubMetrics {
    /// Create and register the hub metrics
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let connects_total = Counter::new(
            "socket_hub_connects_total",
            "Connection handles opened",
        )?;
        let connect_failures_total = Counter::new(
            "socket_hub_connect_failures_total",
            "Connect attempts that failed to create a handle",
        )?;
        let disconnects_total = Counter::new(
            "socket_hub_disconnects_total",
            "Connection handles closed, locally or remotely",
        )?;
        let messages_sent_total = Counter::new(
            "socket_hub_messages_sent_total",
            "Envelopes written to the transport",
        )?;
        let messages_received_total = Counter::new(
            "socket_hub_messages_received_total",
            "Inbound envelopes dispatched to listeners",
        )?;
        let send_failures_total = Counter::new(
            "socket_hub_send_failures_total",
            "Sends dropped because the hub was not connected or the transport refused them",
        )?;
        let dispatch_errors_total = Counter::new(
            "socket_hub_dispatch_errors_total",
            "Inbound frames that could not be decoded",
        )?;
        let connected = Gauge::new(
            "socket_hub_connected",
            "1 while a connection handle is open",
        )?;

        registry.register(Box::new(connects_total.clone()))?;
        registry.register(Box::new(connect_failures_total.clone()))?;
        registry.register(Box::new(disconnects_total.clone()))?;
        registry.register(Box::new(messages_sent_total.clone()))?;
        registry.register(Box::new(messages_received_total.clone()))?;
        registry.register(Box::new(send_failures_total.clone()))?;
        registry.register(Box::new(dispatch_errors_total.clone()))?;
        registry.register(Box::new(connected.clone()))?;

        Ok(Self {
            registry,
            connects_total,
            connect_failures_total,
            disconnects_total,
            messages_sent_total,
            messages_received_total,
            send_failures_total,
            dispatch_errors_total,
            connected,
        })
    }

    pub fn record_connect(&self) {
        self.connects_total.inc();
        self.connected.set(1.0);
    }

    pub fn record_connect_failure(&self) {
        self.connect_failures_total.inc();
    }

    pub fn record_disconnect(&self) {
        self.disconnects_total.inc();
        self.connected.set(0.0);
    }

    pub fn record_sent(&self) {
        self.messages_sent_total.inc();
    }

    pub fn record_received(&self) {
        self.messages_received_total.inc();
    }

    pub fn record_send_failure(&self) {
        self.send_failures_total.inc();
    }

    pub fn record_dispatch_error(&self) {
        self.dispatch_errors_total.inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        match encoder.encode_to_string(&metric_families) {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Failed to encode Prometheus metrics");
                String::new()
            }
        }
    }
}
