//! Metrics Module
//! 
//! Prometheus counters for the socket hub.

pub mod collector;

pub use collector::HubMetrics;
