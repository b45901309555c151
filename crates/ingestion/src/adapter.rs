//! Reconnecting source adapter
//!
//! One adapter per source, each on its own task:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> (error/EOF) -> Disconnected
//!       ^                                                        |
//!       +------------------------ backoff -----------------------+
//! ```
//!
//! Failed or timed-out attempts also pass through the backoff. Shutdown is
//! observed in every await point; the connection is closed before the task
//! ends.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_channel::Sender;
use contracts::{ControlEvent, PreprocessConfig, ReconnectConfig, SourceEvent};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::codec::LineCodec;
use crate::config::IngestionMetrics;
use crate::error::IngestionError;
use crate::preprocess::Preprocessor;
use crate::transport::{Connection, Connector};

/// Adapter lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdapterState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Stopped = 3,
}

impl AdapterState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Stopped,
            _ => Self::Disconnected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for AdapterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outputs shared by every adapter of a pipeline
#[derive(Debug, Clone)]
pub struct AdapterSinks {
    /// Samples and hints, towards the synchronizer
    pub events: Sender<SourceEvent>,
    /// Control events, towards the control handler
    pub control: Sender<ControlEvent>,
    pub metrics: Arc<IngestionMetrics>,
}

/// Type-erased adapter, ready to spawn
pub trait SourceAdapter: Send {
    /// Source name
    fn name(&self) -> &str;

    /// Endpoint description
    fn endpoint(&self) -> String;

    /// Start the read loop on a new task
    ///
    /// Must be called from within a tokio runtime.
    fn spawn(self: Box<Self>, sinks: AdapterSinks) -> AdapterHandle;
}

/// Handle to a running adapter
#[derive(Debug)]
pub struct AdapterHandle {
    name: String,
    state: Arc<AtomicU8>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AdapterHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> AdapterState {
        AdapterState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Ask the adapter to stop without waiting
    pub fn signal_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Stop the adapter and wait until its transport is released
    pub async fn shutdown(self) {
        self.signal_shutdown();
        if let Err(e) = self.task.await {
            error!(source = %self.name, error = %e, "Adapter task panicked");
        }
    }
}

/// How a connected session ended
enum SessionOutcome {
    /// Peer closed the stream
    Closed,
    /// Transport error
    Lost(IngestionError),
    /// Downstream gone, adapter must stop
    ChannelClosed,
    Shutdown,
}

/// Reconnecting adapter over any [`Connector`]
pub struct ReconnectingAdapter<C: Connector> {
    name: String,
    connector: C,
    codec: LineCodec,
    preprocessor: Preprocessor,
    backoff: Duration,
    connect_timeout: Duration,
}

impl<C: Connector> ReconnectingAdapter<C> {
    pub fn new(name: impl Into<String>, connector: C, codec: LineCodec) -> Self {
        let reconnect = ReconnectConfig::default();
        Self {
            name: name.into(),
            connector,
            codec,
            preprocessor: Preprocessor::default(),
            backoff: Duration::from_millis(reconnect.backoff_ms),
            connect_timeout: Duration::from_millis(reconnect.connect_timeout_ms),
        }
    }

    /// Backoff and connect timeout
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.backoff = Duration::from_millis(reconnect.backoff_ms);
        self.connect_timeout = Duration::from_millis(reconnect.connect_timeout_ms);
        self
    }

    /// Per-axis preprocessing
    pub fn with_preprocess(mut self, config: &PreprocessConfig) -> Self {
        self.preprocessor = Preprocessor::new(config);
        self
    }

    fn set_state(&self, cell: &AtomicU8, state: AdapterState) {
        cell.store(state as u8, Ordering::Release);
        metrics::gauge!("ingestion_adapter_state", "source" => self.name.clone())
            .set(state as u8 as f64);
        trace!(source = %self.name, %state, "Adapter state changed");
    }

    #[instrument(level = "debug", name = "adapter_run", skip_all, fields(source = %self.name))]
    async fn run(
        mut self,
        sinks: AdapterSinks,
        state: Arc<AtomicU8>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(endpoint = %self.connector.endpoint(), "Adapter started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.set_state(&state, AdapterState::Connecting);
            let attempt = tokio::time::timeout(self.connect_timeout, self.connector.connect());
            let outcome = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                outcome = attempt => outcome,
            };

            match outcome {
                Ok(Ok(mut conn)) => {
                    self.set_state(&state, AdapterState::Connected);
                    sinks.metrics.record_connect();
                    metrics::counter!("ingestion_connects_total", "source" => self.name.clone())
                        .increment(1);
                    info!("Connected");

                    let session = self.read_session(&mut conn, &sinks, &mut shutdown).await;
                    conn.close().await;

                    match session {
                        SessionOutcome::Shutdown => break,
                        SessionOutcome::ChannelClosed => {
                            warn!("Downstream channel closed, stopping adapter");
                            break;
                        }
                        SessionOutcome::Closed => info!("Connection closed by peer"),
                        SessionOutcome::Lost(err) => warn!(error = %err, "Connection lost"),
                    }

                    sinks.metrics.record_disconnect();
                    metrics::counter!("ingestion_disconnects_total", "source" => self.name.clone())
                        .increment(1);
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "Connect attempt failed");
                    self.record_connect_failure(&sinks);
                }
                Err(_) => {
                    let err = IngestionError::ConnectTimeout {
                        source_name: self.name.clone(),
                        timeout_ms: self.connect_timeout.as_millis() as u64,
                    };
                    warn!(error = %err, "Connect attempt failed");
                    self.record_connect_failure(&sinks);
                }
            }

            self.set_state(&state, AdapterState::Disconnected);

            debug!(backoff_ms = self.backoff.as_millis() as u64, "Waiting before reconnect");
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.backoff) => {}
            }
        }

        self.set_state(&state, AdapterState::Stopped);
        info!("Adapter stopped");
    }

    fn record_connect_failure(&self, sinks: &AdapterSinks) {
        sinks.metrics.record_connect_failure();
        metrics::counter!("ingestion_connect_failures_total", "source" => self.name.clone())
            .increment(1);
    }

    async fn read_session(
        &mut self,
        conn: &mut C::Conn,
        sinks: &AdapterSinks,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionOutcome {
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.changed() => return SessionOutcome::Shutdown,
                next = conn.next_line() => next,
            };

            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => return SessionOutcome::Closed,
                Err(err) => return SessionOutcome::Lost(err),
            };
            sinks.metrics.record_received();

            let events = match self.codec.decode(&line) {
                Ok(events) => events,
                Err(err) => {
                    sinks.metrics.record_decode_error();
                    metrics::counter!("ingestion_decode_errors_total", "source" => self.name.clone())
                        .increment(1);
                    warn!(error = %err, line = %line, "Dropping malformed line");
                    continue;
                }
            };

            for event in events {
                if let Some(outcome) = self.forward(event, sinks, shutdown).await {
                    return outcome;
                }
            }
        }
    }

    /// Forward one decoded event; `Some` ends the session
    async fn forward(
        &mut self,
        event: SourceEvent,
        sinks: &AdapterSinks,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<SessionOutcome> {
        match event {
            SourceEvent::Control(control) => {
                sinks.metrics.record_control();
                info!(kind = ?control.kind, message = %control.message, "Control event");
                let sent = tokio::select! {
                    biased;
                    _ = shutdown.changed() => return Some(SessionOutcome::Shutdown),
                    sent = sinks.control.send(control) => sent,
                };
                if sent.is_err() {
                    debug!("Control channel closed, control event dropped");
                }
                None
            }
            event => {
                let event = match event {
                    SourceEvent::Sample(sample) => {
                        SourceEvent::Sample(self.preprocessor.apply(sample))
                    }
                    other => other,
                };
                let sent = tokio::select! {
                    biased;
                    _ = shutdown.changed() => return Some(SessionOutcome::Shutdown),
                    sent = sinks.events.send(event) => sent,
                };
                match sent {
                    Ok(()) => {
                        sinks.metrics.record_forwarded();
                        None
                    }
                    Err(_) => Some(SessionOutcome::ChannelClosed),
                }
            }
        }
    }
}

impl<C: Connector> SourceAdapter for ReconnectingAdapter<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn endpoint(&self) -> String {
        self.connector.endpoint()
    }

    fn spawn(self: Box<Self>, sinks: AdapterSinks) -> AdapterHandle {
        let name = self.name.clone();
        let state = Arc::new(AtomicU8::new(AdapterState::Disconnected as u8));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn((*self).run(sinks, state.clone(), shutdown_rx));

        AdapterHandle {
            name,
            state,
            shutdown: shutdown_tx,
            task,
        }
    }
}
