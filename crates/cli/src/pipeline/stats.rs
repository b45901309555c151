//! Pipeline statistics.

use std::time::Duration;

use ingestion::MetricsSnapshot as IngestionSnapshot;
use observability::EstimatorMetricsAggregator;

/// Why the pipeline stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// Ctrl-C or SIGTERM
    #[default]
    Signal,
    /// `--timeout` elapsed
    Timeout,
    /// `--max-results` reached
    ResultLimit,
    /// The ingestion event channel closed
    IngestionClosed,
    /// The estimator stage went away
    EstimatorClosed,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Timeout => "timeout",
            Self::ResultLimit => "result_limit",
            Self::IngestionClosed => "ingestion_closed",
            Self::EstimatorClosed => "estimator_closed",
        }
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Axis samples handed to the synchronizer
    pub samples_received: u64,

    /// Orientation hints handed to the synchronizer
    pub hints_received: u64,

    /// Control events seen by the control handler
    pub control_events: u64,

    /// Complete frames emitted by the synchronizer
    pub frames_emitted: u64,

    /// Orientation results produced by the estimator
    pub results_published: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of configured sources
    pub active_sources: usize,

    /// Number of subscribers registered at startup
    pub active_subscribers: usize,

    /// Adapter-level counters at shutdown
    pub ingestion: IngestionSnapshot,

    /// Estimator metrics aggregator
    pub estimator_metrics: EstimatorMetricsAggregator,

    pub stop_reason: StopReason,
}

impl PipelineStats {
    /// Orientation results per second
    pub fn results_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.results_published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of received samples that completed a frame, in percent
    pub fn emission_ratio(&self) -> f64 {
        if self.samples_received > 0 {
            self.frames_emitted as f64 / self.samples_received as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Stop reason: {}", self.stop_reason.as_str());
        println!("   ├─ Active sources: {}", self.active_sources);
        println!("   └─ Active subscribers: {}", self.active_subscribers);

        println!("\nIngestion");
        println!("   ├─ Lines received: {}", self.ingestion.lines_received);
        println!("   ├─ Decode errors: {}", self.ingestion.decode_errors);
        println!(
            "   ├─ Connects / disconnects / failed connects: {} / {} / {}",
            self.ingestion.connects, self.ingestion.disconnects, self.ingestion.connect_failures
        );
        println!("   ├─ Samples: {}", self.samples_received);
        println!("   ├─ Orientation hints: {}", self.hints_received);
        println!("   └─ Control events: {}", self.control_events);

        println!("\nSynchronizer & Estimator");
        println!(
            "   ├─ Frames emitted: {} ({:.1}% of samples)",
            self.frames_emitted,
            self.emission_ratio()
        );
        println!("   ├─ Results published: {}", self.results_published);
        println!("   └─ Results/s: {:.2}", self.results_per_second());

        println!("\n{}", self.estimator_metrics.summary());
    }
}
