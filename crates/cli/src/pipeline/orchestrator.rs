//! Pipeline orchestrator - wires every stage of the relay together.
//!
//! ```text
//! adapters ──SourceEvent──▶ synchronizer ──FrameSnapshot──▶ estimator ──Publication──▶ distributor
//!     └──ControlEvent──▶ control handler
//! ```
//!
//! The synchronizer runs on the orchestrator task itself; the estimator,
//! distributor and control handler each get their own task.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{ControlEvent, FrameSnapshot, PipelineBlueprint, Publication, SourceEvent};
use dispatcher::Distributor;
use estimator::OrientationEstimator;
use ingestion::{AdapterState, IngestionPipeline};
use observability::EstimatorMetricsAggregator;
use sync_engine::StreamSynchronizer;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use super::{PipelineStats, StopReason};
use crate::error::CliError;

/// Upper bound on the distributor drain at shutdown
const DISTRIBUTOR_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// How often adapter states and subscriber counters are published
const HEALTH_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated blueprint, CLI overrides applied
    pub blueprint: PipelineBlueprint,

    /// Stop after this many orientation results (None = unlimited)
    pub max_results: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the timeout elapses or the result
    /// limit is reached, then stop every stage in order
    ///
    /// Shutdown order: adapters (transports released), in-flight events
    /// through the synchronizer, estimator, distributor (bounded wait).
    #[instrument(name = "pipeline_run", skip_all, fields(sources = self.config.blueprint.sources.len()))]
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;
        let buffer_size = self.config.buffer_size.max(1);

        if let Some(port) = self.config.metrics_port {
            observability::install_exporter(port)?;
            info!(port, "Metrics endpoint available");
        }

        // Build every stage before anything touches the network
        let mut ingestion = IngestionPipeline::new(buffer_size);
        for source in &blueprint.sources {
            ingestion
                .add_source_config(source)
                .map_err(|e| CliError::startup("ingestion", e.to_string()))?;
        }

        let time_unit = blueprint.effective_time_unit();
        let estimator = OrientationEstimator::new(blueprint.estimator.clone(), time_unit)
            .map_err(|e| CliError::startup("estimator", e.to_string()))?;
        info!(?time_unit, "Estimator configured");

        let synchronizer = StreamSynchronizer::new(blueprint.synchronizer.policy);
        info!(policy = synchronizer.policy().as_str(), "Synchronizer configured");

        let distributor = dispatcher::create_distributor(&blueprint.distributor)
            .await
            .map_err(|e| CliError::startup("distributor", e.to_string()))?;
        if blueprint.distributor.subscribers.is_empty() {
            warn!("No subscribers configured - orientation results will be dropped");
        }

        let mut stats = PipelineStats {
            active_sources: ingestion.source_count(),
            active_subscribers: distributor.subscriber_count(),
            ..Default::default()
        };

        let events = ingestion
            .take_receiver()
            .context("Ingestion event receiver already taken")?;
        let controls = ingestion
            .take_control_receiver()
            .context("Ingestion control receiver already taken")?;

        let (publication_tx, publication_rx) = mpsc::channel::<Publication>(buffer_size);
        let distributor_task = distributor.clone().spawn(publication_rx);

        let (frame_tx, frame_rx) = mpsc::channel::<FrameSnapshot>(buffer_size);
        let (limit_tx, mut limit_rx) = watch::channel(false);
        let estimator_task = tokio::spawn(estimate_frames(
            estimator,
            frame_rx,
            publication_tx,
            blueprint.distributor.publish_raw_frames,
            self.config.max_results,
            limit_tx,
        ));

        let control_task = tokio::spawn(handle_control(controls));

        ingestion.start_all();
        info!(
            sources = stats.active_sources,
            subscribers = stats.active_subscribers,
            max_results = ?self.config.max_results,
            "Pipeline running"
        );

        let deadline = sleep_or_pending(self.config.timeout);
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        let mut health = tokio::time::interval(HEALTH_REPORT_INTERVAL);
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut adapter_states = HashMap::new();

        let stop_reason = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break StopReason::Signal,
                _ = &mut deadline => break StopReason::Timeout,
                Ok(()) = async { limit_rx.wait_for(|reached| *reached).await.map(|_| ()) } => break StopReason::ResultLimit,
                event = events.recv() => {
                    let Ok(event) = event else {
                        break StopReason::IngestionClosed;
                    };
                    if !route_event(&synchronizer, event, &frame_tx, &mut stats).await {
                        // The limit is flagged before the estimator drops its receiver
                        break if *limit_rx.borrow() {
                            StopReason::ResultLimit
                        } else {
                            StopReason::EstimatorClosed
                        };
                    }
                }
                _ = health.tick() => report_health(&ingestion, &distributor, &mut adapter_states),
            }
        };
        stats.stop_reason = stop_reason;
        report_health(&ingestion, &distributor, &mut adapter_states);

        info!(reason = stop_reason.as_str(), "Shutting down pipeline...");
        ingestion.stop_all().await;

        if stop_reason != StopReason::ResultLimit {
            // Channel is closed; whatever the adapters queued is still delivered
            while let Ok(event) = events.recv().await {
                if !route_event(&synchronizer, event, &frame_tx, &mut stats).await {
                    break;
                }
            }
        }
        drop(frame_tx);

        stats.estimator_metrics = estimator_task.await.context("Estimator task failed")?;
        stats.results_published = stats.estimator_metrics.total_estimates;
        stats.control_events = control_task.await.context("Control handler task failed")?;
        stats.ingestion = ingestion.metrics().snapshot();

        match tokio::time::timeout(DISTRIBUTOR_DRAIN_TIMEOUT, distributor_task).await {
            Ok(Ok(())) => debug!("Distributor drained"),
            Ok(Err(e)) => warn!(error = %e, "Distributor task failed"),
            Err(_) => {
                warn!(
                    timeout_secs = DISTRIBUTOR_DRAIN_TIMEOUT.as_secs(),
                    "Distributor drain timed out, closing subscribers"
                );
                distributor.shutdown().await;
            }
        }

        stats.duration = start_time.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            results = stats.results_published,
            results_per_sec = format!("{:.2}", stats.results_per_second()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Route one adapter event; false once the estimator stage is gone
async fn route_event(
    synchronizer: &StreamSynchronizer,
    event: SourceEvent,
    frames: &mpsc::Sender<FrameSnapshot>,
    stats: &mut PipelineStats,
) -> bool {
    match event {
        SourceEvent::Sample(sample) => {
            stats.samples_received += 1;
            observability::record_sample_received(sample.axis.as_str());

            if let Some(frame) = synchronizer.ingest(sample) {
                stats.frames_emitted += 1;
                observability::record_frame_emitted(synchronizer.policy().as_str());
                return frames.send(frame).await.is_ok();
            }
        }
        SourceEvent::Hint(hint) => {
            stats.hints_received += 1;
            observability::record_sample_received("orientation_hint");
            synchronizer.ingest_hint(hint);
        }
        SourceEvent::Control(event) => {
            debug!(kind = ?event.kind, "Control event on the sample path, ignored");
        }
    }
    true
}

/// Estimator stage: one estimate per frame, strictly in emission order
async fn estimate_frames(
    mut estimator: OrientationEstimator,
    mut frames: mpsc::Receiver<FrameSnapshot>,
    publications: mpsc::Sender<Publication>,
    publish_raw_frames: bool,
    max_results: Option<u64>,
    limit: watch::Sender<bool>,
) -> EstimatorMetricsAggregator {
    let mut aggregator = EstimatorMetricsAggregator::new();

    while let Some(frame) = frames.recv().await {
        if publish_raw_frames && publications.send(Publication::Frame(frame)).await.is_err() {
            warn!("Distributor input closed");
            break;
        }

        let result = estimator.estimate(&frame);
        let delta_time = estimator.last_delta_time();
        observability::record_estimate(&result, delta_time);
        aggregator.update(&result, delta_time);

        debug!(
            timestamp = result.timestamp,
            roll = format!("{:.2}", result.euler_angles[0]),
            pitch = format!("{:.2}", result.euler_angles[1]),
            yaw = format!("{:.2}", result.euler_angles[2]),
            "Orientation estimated"
        );

        if publications
            .send(Publication::Orientation(result))
            .await
            .is_err()
        {
            warn!("Distributor input closed");
            break;
        }

        if max_results.is_some_and(|max| aggregator.total_estimates >= max) {
            info!(results = aggregator.total_estimates, "Reached max results limit");
            limit.send_replace(true);
            break;
        }
    }

    aggregator
}

/// Control handler: calibration markers and device reports
async fn handle_control(controls: async_channel::Receiver<ControlEvent>) -> u64 {
    let mut count = 0;

    while let Ok(event) = controls.recv().await {
        count += 1;
        if event.kind.is_calibration_start() {
            warn!(
                kind = ?event.kind,
                message = %event.message,
                "Device calibration started, orientation may be unreliable"
            );
        } else if event.kind.is_calibration_end() {
            info!(kind = ?event.kind, message = %event.message, "Device calibration finished");
        } else {
            info!(kind = ?event.kind, message = %event.message, "Device report");
        }
    }

    count
}

/// Publish adapter states and subscriber counters; log state changes
fn report_health(
    ingestion: &IngestionPipeline,
    distributor: &Distributor,
    last_states: &mut HashMap<String, AdapterState>,
) {
    for (source, state) in ingestion.adapter_states() {
        observability::record_adapter_state(&source, state as u8);
        if last_states.get(&source) != Some(&state) {
            info!(source = %source, state = %state, "Adapter state changed");
            last_states.insert(source, state);
        }
    }

    observability::record_decode_errors(ingestion.metrics().snapshot().decode_errors);

    let pruned = distributor.prune();
    if pruned > 0 {
        warn!(pruned, "Failed subscribers removed");
    }
    observability::record_subscribers_evicted(distributor.evicted_total());
    for (id, name, snapshot) in distributor.metrics() {
        observability::record_publication_delivered(
            &name,
            snapshot.delivered_count,
            snapshot.failure_count,
        );
        debug!(subscriber = %name, %id, queue_len = snapshot.queue_len, "Subscriber queue");
    }
}

async fn sleep_or_pending(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}
