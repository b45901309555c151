//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{ControlEvent, SourceConfig, SourceEvent};
use tracing::{debug, info, instrument};

use crate::adapter::{AdapterHandle, AdapterSinks, AdapterState, SourceAdapter};
use crate::config::IngestionMetrics;
use crate::error::{IngestionError, Result};
use crate::factory::build_adapter;

/// Control events are rare; a small queue is enough
const CONTROL_CHANNEL_CAPACITY: usize = 32;

/// Ingestion Pipeline
///
/// Owns one adapter per source and the channels they feed. Samples and hints
/// from every source share one bounded channel; control events use a second.
pub struct IngestionPipeline {
    /// Registered, not yet started
    pending: Vec<Box<dyn SourceAdapter>>,

    /// Running adapters
    handles: HashMap<String, AdapterHandle>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    tx: Sender<SourceEvent>,
    rx: Option<Receiver<SourceEvent>>,
    control_tx: Sender<ControlEvent>,
    control_rx: Option<Receiver<ControlEvent>>,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    ///
    /// # Arguments
    /// * `channel_capacity` - Event channel capacity
    pub fn new(channel_capacity: usize) -> Self {
        let (tx, rx) = bounded(channel_capacity.max(1));
        let (control_tx, control_rx) = bounded(CONTROL_CHANNEL_CAPACITY);

        Self {
            pending: Vec::new(),
            handles: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            rx: Some(rx),
            control_tx,
            control_rx: Some(control_rx),
        }
    }

    /// Register an adapter
    ///
    /// # Errors
    /// `DuplicateSource` when the name is already taken.
    #[instrument(
        name = "ingestion_add_source",
        skip(self, adapter),
        fields(source = %adapter.name())
    )]
    pub fn add_source(&mut self, adapter: Box<dyn SourceAdapter>) -> Result<()> {
        if self.has_source(adapter.name()) {
            return Err(IngestionError::DuplicateSource {
                source_name: adapter.name().to_string(),
            });
        }

        debug!(endpoint = %adapter.endpoint(), "registered source");
        self.pending.push(adapter);
        Ok(())
    }

    /// Register a source from configuration
    pub fn add_source_config(&mut self, config: &SourceConfig) -> Result<()> {
        self.add_source(build_adapter(config))
    }

    /// Spawn every registered adapter
    ///
    /// Sources added after this call are started by the next call.
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&mut self) {
        info!(count = self.pending.len(), "starting source adapters");
        let sinks = AdapterSinks {
            events: self.tx.clone(),
            control: self.control_tx.clone(),
            metrics: self.metrics.clone(),
        };

        for adapter in self.pending.drain(..) {
            let handle = adapter.spawn(sinks.clone());
            self.handles.insert(handle.name().to_string(), handle);
        }
    }

    /// Stop every adapter and wait for their transports to be released
    ///
    /// Closes both channels afterwards; receivers drain what is left, then end.
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub async fn stop_all(&mut self) {
        info!(count = self.handles.len(), "stopping source adapters");

        for handle in self.handles.values() {
            handle.signal_shutdown();
        }
        for (name, handle) in self.handles.drain() {
            handle.shutdown().await;
            debug!(source = %name, "adapter stopped");
        }

        self.tx.close();
        self.control_tx.close();
    }

    /// Get event stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<SourceEvent>> {
        self.rx.take()
    }

    /// Get control event receiver (once)
    pub fn take_control_receiver(&mut self) -> Option<Receiver<ControlEvent>> {
        self.control_rx.take()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Registered source count (pending and running)
    pub fn source_count(&self) -> usize {
        self.pending.len() + self.handles.len()
    }

    fn has_source(&self, name: &str) -> bool {
        self.handles.contains_key(name) || self.pending.iter().any(|a| a.name() == name)
    }

    /// State of a running adapter
    pub fn adapter_state(&self, name: &str) -> Option<AdapterState> {
        self.handles.get(name).map(AdapterHandle::state)
    }

    /// States of all running adapters, sorted by name
    pub fn adapter_states(&self) -> Vec<(String, AdapterState)> {
        let mut states: Vec<_> = self
            .handles
            .iter()
            .map(|(name, handle)| (name.clone(), handle.state()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        for handle in self.handles.values() {
            handle.signal_shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ReconnectingAdapter;
    use crate::codec::LineCodec;
    use crate::mock::{MockConnector, MockSession, SessionEnd};

    fn mock_adapter(name: &str, script: Vec<MockSession>) -> Box<dyn SourceAdapter> {
        Box::new(ReconnectingAdapter::new(
            name,
            MockConnector::new(name, script),
            LineCodec::SerialLine,
        ))
    }

    #[test]
    fn test_pipeline_creation() {
        let pipeline = IngestionPipeline::new(100);
        assert_eq!(pipeline.source_count(), 0);
    }

    #[test]
    fn test_take_receiver_once() {
        let mut pipeline = IngestionPipeline::new(100);
        assert!(pipeline.take_receiver().is_some());
        assert!(pipeline.take_receiver().is_none());
        assert!(pipeline.take_control_receiver().is_some());
        assert!(pipeline.take_control_receiver().is_none());
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let mut pipeline = IngestionPipeline::new(8);
        pipeline.add_source(mock_adapter("a", vec![])).unwrap();
        let err = pipeline.add_source(mock_adapter("a", vec![])).unwrap_err();
        assert!(matches!(err, IngestionError::DuplicateSource { .. }));
        assert_eq!(pipeline.source_count(), 1);
    }

    #[tokio::test]
    async fn test_sources_share_event_channel() {
        let mut pipeline = IngestionPipeline::new(16);
        pipeline
            .add_source(mock_adapter(
                "left",
                vec![MockSession::lines(["1 0 0 1 0 0 0 1 0 0"], SessionEnd::Hold)],
            ))
            .unwrap();
        pipeline
            .add_source(mock_adapter(
                "right",
                vec![MockSession::lines(["2 0 0 1 0 0 0 1 0 0"], SessionEnd::Hold)],
            ))
            .unwrap();
        let rx = pipeline.take_receiver().unwrap();

        pipeline.start_all();
        let mut timestamps = Vec::new();
        for _ in 0..6 {
            match rx.recv().await.unwrap() {
                SourceEvent::Sample(sample) => timestamps.push(sample.timestamp),
                other => panic!("unexpected {other:?}"),
            }
        }
        timestamps.sort();
        assert_eq!(timestamps, vec![1, 1, 1, 2, 2, 2]);
        assert_eq!(pipeline.adapter_state("left"), Some(AdapterState::Connected));

        pipeline.stop_all().await;
        assert!(rx.recv().await.is_err());
        assert_eq!(pipeline.metrics().snapshot().events_forwarded, 6);
    }
}
