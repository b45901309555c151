//! OrientationEstimator - drives the attitude filter once per emitted frame

use contracts::{ContractError, EstimatorConfig, FrameSnapshot, OrientationResult, TimeUnit};
use nalgebra::Vector3;
use tracing::{debug, instrument};
use validator::Validate;

use crate::fusion::{FusionAhrs, GyroOffset};
use crate::units::{accel_to_g, gyro_to_degrees, DeltaClock};
use crate::AttitudeFilter;

/// Orientation estimator
///
/// Holds the recursive state of one estimation session: the previous frame
/// timestamp, the gyroscope offset estimate and the filter itself.
pub struct OrientationEstimator {
    config: EstimatorConfig,
    time_unit: TimeUnit,
    clock: DeltaClock,
    offset: Option<GyroOffset>,
    filter: Box<dyn AttitudeFilter>,
    estimates: u64,
    last_delta_time: f64,
}

impl std::fmt::Debug for OrientationEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrientationEstimator")
            .field("config", &self.config)
            .field("time_unit", &self.time_unit)
            .field("clock", &self.clock)
            .field("estimates", &self.estimates)
            .finish_non_exhaustive()
    }
}

impl OrientationEstimator {
    /// Create an estimator backed by [`FusionAhrs`]
    ///
    /// # Errors
    /// `ConfigValidation` when the filter settings are out of range.
    pub fn new(config: EstimatorConfig, time_unit: TimeUnit) -> Result<Self, ContractError> {
        let filter = FusionAhrs::from_config(&config.filter);
        Self::with_filter(config, time_unit, Box::new(filter))
    }

    /// Create an estimator around an arbitrary filter
    ///
    /// # Errors
    /// `ConfigValidation` when the filter settings are out of range.
    pub fn with_filter(
        config: EstimatorConfig,
        time_unit: TimeUnit,
        filter: Box<dyn AttitudeFilter>,
    ) -> Result<Self, ContractError> {
        config.filter.validate().map_err(ContractError::from)?;

        let offset = config
            .filter
            .offset_correction
            .then(|| GyroOffset::new(config.filter.sample_rate));

        debug!(
            ?time_unit,
            gain = config.filter.gain,
            sample_rate = config.filter.sample_rate,
            offset_correction = offset.is_some(),
            "Orientation estimator created"
        );

        Ok(Self {
            config,
            time_unit,
            clock: DeltaClock::new(time_unit),
            offset,
            filter,
            estimates: 0,
            last_delta_time: 0.0,
        })
    }

    /// Estimate orientation for one frame
    ///
    /// Frames must be passed in emission order; the filter state carries
    /// over from the previous call.
    #[instrument(
        level = "trace",
        name = "estimator_estimate",
        skip(self, frame),
        fields(timestamp = frame.timestamp)
    )]
    pub fn estimate(&mut self, frame: &FrameSnapshot) -> OrientationResult {
        let delta_time = self.clock.advance(frame.timestamp);
        self.last_delta_time = delta_time;

        let mut gyroscope = gyro_to_degrees(frame.gyro, self.config.gyro_units);
        if let Some(offset) = self.offset.as_mut() {
            gyroscope = offset.update(gyroscope);
        }
        let accelerometer = accel_to_g(frame.accel, self.config.accel_units);
        let magnetometer = Vector3::from(frame.mag);

        self.filter
            .update(gyroscope, accelerometer, magnetometer, delta_time);
        self.estimates += 1;

        let quaternion = self.filter.quaternion();
        let euler = self.filter.euler_degrees();
        let internal_states = self.filter.internal_states();
        let flags = self.filter.flags();

        metrics::counter!("estimator_updates_total").increment(1);
        metrics::histogram!("estimator_delta_time_seconds").record(delta_time);
        metrics::gauge!("estimator_acceleration_error_degrees")
            .set(internal_states.acceleration_error);
        metrics::gauge!("estimator_magnetic_error_degrees").set(internal_states.magnetic_error);
        if internal_states.accelerometer_ignored {
            metrics::counter!("estimator_sensor_ignored_total", "sensor" => "accelerometer")
                .increment(1);
        }
        if internal_states.magnetometer_ignored {
            metrics::counter!("estimator_sensor_ignored_total", "sensor" => "magnetometer")
                .increment(1);
        }

        OrientationResult {
            timestamp: frame.timestamp,
            quaternion: [quaternion.w, quaternion.i, quaternion.j, quaternion.k],
            euler_angles: [euler.x, euler.y, euler.z],
            internal_states,
            flags,
            orientation: frame.orientation_hint,
        }
    }

    /// Start a new estimation session
    pub fn reset(&mut self) {
        self.clock.reset();
        self.filter.reset();
        if self.offset.is_some() {
            self.offset = Some(GyroOffset::new(self.config.filter.sample_rate));
        }
        self.estimates = 0;
        self.last_delta_time = 0.0;
    }

    /// Configuration in effect
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Timestamp unit
    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    /// Number of estimates produced in this session
    pub fn estimate_count(&self) -> u64 {
        self.estimates
    }

    /// Seconds between the last two estimated frames
    pub fn last_delta_time(&self) -> f64 {
        self.last_delta_time
    }
}
