//! # Observability
//!
//! Prometheus exporter and the relay's metric helpers. Tracing is set up by
//! the binary; this crate only installs the metrics recorder.
//!
//! ```ignore
//! observability::install_exporter(9000)?;
//!
//! if let Some(frame) = synchronizer.ingest(sample) {
//!     observability::record_frame_emitted("flush");
//!     let result = estimator.estimate(&frame);
//!     observability::record_estimate(&result, delta_time);
//! }
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;

pub use crate::metrics::{
    record_adapter_state, record_decode_errors, record_estimate, record_frame_emitted,
    record_publication_delivered, record_sample_received, record_subscribers_evicted,
    EstimatorMetricsAggregator, EstimatorSummary, RunningStats, StatsSummary,
};

/// Install the global Prometheus recorder, serving `/metrics` on `port`
///
/// Fails if a recorder is already installed or the port cannot be bound.
pub fn install_exporter(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
