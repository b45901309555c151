//! Ingestion metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics, shared by every adapter of a pipeline
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Raw lines/messages received
    pub lines_received: AtomicU64,

    /// Samples and hints forwarded to the synchronizer path
    pub events_forwarded: AtomicU64,

    /// Lines dropped as malformed
    pub decode_errors: AtomicU64,

    /// Control events forwarded
    pub control_events: AtomicU64,

    /// Successful connects
    pub connects: AtomicU64,

    /// Established connections that later ended
    pub disconnects: AtomicU64,

    /// Connect attempts refused or timed out
    pub connect_failures: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self) {
        self.events_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_control(&self) {
        self.control_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            events_forwarded: self.events_forwarded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            control_events: self.control_events.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub lines_received: u64,
    pub events_forwarded: u64,
    pub decode_errors: u64,
    pub control_events: u64,
    pub connects: u64,
    pub disconnects: u64,
    pub connect_failures: u64,
}
