//! Relay metrics
//!
//! Thin helpers over the `metrics` facade, plus an in-memory aggregator for
//! the end-of-run summary.

use contracts::OrientationResult;
use metrics::{counter, gauge, histogram};

/// Record a sample or hint handed to the synchronizer
pub fn record_sample_received(axis: &str) {
    counter!("ahrs_relay_samples_received_total", "axis" => axis.to_string()).increment(1);
}

/// Publish the running total of lines dropped as malformed
pub fn record_decode_errors(total: u64) {
    counter!("ahrs_relay_decode_errors_total").absolute(total);
}

/// Record a composite frame emission
pub fn record_frame_emitted(policy: &str) {
    counter!("ahrs_relay_frames_emitted_total", "policy" => policy.to_string()).increment(1);
}

/// Record one orientation estimate
pub fn record_estimate(result: &OrientationResult, delta_time: f64) {
    counter!("ahrs_relay_estimates_total").increment(1);
    histogram!("ahrs_relay_delta_time_ms").record(delta_time * 1000.0);
    gauge!("ahrs_relay_last_timestamp").set(result.timestamp as f64);

    gauge!("ahrs_relay_roll_degrees").set(result.euler_angles[0]);
    gauge!("ahrs_relay_pitch_degrees").set(result.euler_angles[1]);
    gauge!("ahrs_relay_yaw_degrees").set(result.euler_angles[2]);

    let states = &result.internal_states;
    histogram!("ahrs_relay_acceleration_error_degrees").record(states.acceleration_error);
    histogram!("ahrs_relay_magnetic_error_degrees").record(states.magnetic_error);

    let flags = &result.flags;
    gauge!("ahrs_relay_initialising").set(if flags.initialising { 1.0 } else { 0.0 });
    if flags.angular_rate_recovery {
        counter!("ahrs_relay_recovery_total", "kind" => "angular_rate").increment(1);
    }
    if flags.acceleration_recovery {
        counter!("ahrs_relay_recovery_total", "kind" => "acceleration").increment(1);
    }
    if flags.magnetic_recovery {
        counter!("ahrs_relay_recovery_total", "kind" => "magnetic").increment(1);
    }
}

/// Publish a subscriber's running delivery totals
pub fn record_publication_delivered(subscriber: &str, delivered: u64, failed: u64) {
    counter!(
        "ahrs_relay_publications_delivered_total",
        "subscriber" => subscriber.to_string(),
        "status" => "success"
    )
    .absolute(delivered);
    counter!(
        "ahrs_relay_publications_delivered_total",
        "subscriber" => subscriber.to_string(),
        "status" => "failure"
    )
    .absolute(failed);
}

/// Publish the running total of subscribers evicted for a full queue
pub fn record_subscribers_evicted(total: u64) {
    counter!("ahrs_relay_subscribers_evicted_total").absolute(total);
}

/// Record an adapter state transition (0 disconnected .. 3 stopped)
pub fn record_adapter_state(source: &str, state: u8) {
    gauge!("ahrs_relay_adapter_state", "source" => source.to_string()).set(f64::from(state));
}

/// Estimator metrics aggregator
///
/// Aggregates in memory for the summary printed at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct EstimatorMetricsAggregator {
    pub total_estimates: u64,
    pub accelerometer_ignored: u64,
    pub magnetometer_ignored: u64,
    pub angular_rate_recoveries: u64,
    pub acceleration_recoveries: u64,
    pub magnetic_recoveries: u64,
    /// Estimates produced while the filter was initialising
    pub initialising: u64,
    /// Delta-time (ms)
    pub delta_time_stats: RunningStats,
    /// Acceleration error (degrees)
    pub acceleration_error_stats: RunningStats,
    /// Magnetic error (degrees)
    pub magnetic_error_stats: RunningStats,
}

impl EstimatorMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with one estimate
    pub fn update(&mut self, result: &OrientationResult, delta_time: f64) {
        self.total_estimates += 1;

        let states = &result.internal_states;
        if states.accelerometer_ignored {
            self.accelerometer_ignored += 1;
        }
        if states.magnetometer_ignored {
            self.magnetometer_ignored += 1;
        }

        let flags = &result.flags;
        self.initialising += u64::from(flags.initialising);
        self.angular_rate_recoveries += u64::from(flags.angular_rate_recovery);
        self.acceleration_recoveries += u64::from(flags.acceleration_recovery);
        self.magnetic_recoveries += u64::from(flags.magnetic_recovery);

        // first estimate has no interval
        if self.total_estimates > 1 {
            self.delta_time_stats.push(delta_time * 1000.0);
        }
        self.acceleration_error_stats.push(states.acceleration_error);
        self.magnetic_error_stats.push(states.magnetic_error);
    }

    /// Generate summary
    pub fn summary(&self) -> EstimatorSummary {
        EstimatorSummary {
            total_estimates: self.total_estimates,
            accelerometer_ignored: self.accelerometer_ignored,
            magnetometer_ignored: self.magnetometer_ignored,
            recoveries: self.angular_rate_recoveries
                + self.acceleration_recoveries
                + self.magnetic_recoveries,
            initialising: self.initialising,
            delta_time_ms: StatsSummary::from(&self.delta_time_stats),
            acceleration_error: StatsSummary::from(&self.acceleration_error_stats),
            magnetic_error: StatsSummary::from(&self.magnetic_error_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Estimator summary
#[derive(Debug, Clone, Default)]
pub struct EstimatorSummary {
    pub total_estimates: u64,
    pub accelerometer_ignored: u64,
    pub magnetometer_ignored: u64,
    pub recoveries: u64,
    pub initialising: u64,
    pub delta_time_ms: StatsSummary,
    pub acceleration_error: StatsSummary,
    pub magnetic_error: StatsSummary,
}

impl EstimatorSummary {
    fn rate(&self, count: u64) -> f64 {
        if self.total_estimates == 0 {
            0.0
        } else {
            count as f64 / self.total_estimates as f64 * 100.0
        }
    }
}

impl std::fmt::Display for EstimatorSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Estimator Summary ===")?;
        writeln!(f, "Total estimates: {}", self.total_estimates)?;
        writeln!(f, "Initialising: {}", self.initialising)?;
        writeln!(
            f,
            "Accelerometer ignored: {} ({:.2}%)",
            self.accelerometer_ignored,
            self.rate(self.accelerometer_ignored)
        )?;
        writeln!(
            f,
            "Magnetometer ignored: {} ({:.2}%)",
            self.magnetometer_ignored,
            self.rate(self.magnetometer_ignored)
        )?;
        writeln!(f, "Recoveries: {}", self.recoveries)?;
        writeln!(f, "Delta-time (ms): {}", self.delta_time_ms)?;
        writeln!(f, "Acceleration error (deg): {}", self.acceleration_error)?;
        writeln!(f, "Magnetic error (deg): {}", self.magnetic_error)
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
