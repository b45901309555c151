//! Fusion-style complementary AHRS
//!
//! Gyroscope integration corrected by accelerometer and magnetometer feedback,
//! with:
//! - a gain ramp from [`INITIAL_GAIN`] down to the configured gain during start-up
//! - rejection of accelerometer/magnetometer feedback whose error exceeds a
//!   threshold, bounded by a recovery trigger
//! - reinitialisation when the gyroscope range is exceeded

mod offset;

pub use offset::GyroOffset;

use contracts::{Convention, FilterConfig, FilterFlags, InternalStates};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::AttitudeFilter;

/// Gain used at the start of initialisation
pub const INITIAL_GAIN: f64 = 10.0;

/// Duration of the initialisation ramp (seconds)
pub const INITIALISATION_PERIOD: f64 = 3.0;

const NORMALISE_EPSILON: f64 = 1e-12;

/// Derived filter settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionSettings {
    pub convention: Convention,
    pub gain: f64,
    /// Absolute per-axis limit (deg/s), 98% of the sensor range
    pub gyroscope_range: f64,
    /// Squared half-sine of the acceleration rejection angle
    pub acceleration_rejection: f64,
    /// Squared half-sine of the magnetic rejection angle
    pub magnetic_rejection: f64,
    pub recovery_trigger_period: u32,
}

impl FusionSettings {
    /// Derive settings from the user-facing filter configuration
    pub fn from_config(config: &FilterConfig) -> Self {
        let rejection = |degrees: f64| {
            if degrees == 0.0 {
                f64::MAX
            } else {
                (0.5 * degrees.to_radians().sin()).powi(2)
            }
        };

        let mut settings = Self {
            convention: config.convention,
            gain: config.gain,
            gyroscope_range: if config.gyroscope_range == 0.0 {
                f64::MAX
            } else {
                0.98 * config.gyroscope_range
            },
            acceleration_rejection: rejection(config.acceleration_rejection),
            magnetic_rejection: rejection(config.magnetic_rejection),
            recovery_trigger_period: config.recovery_trigger_period,
        };

        if settings.gain == 0.0 || settings.recovery_trigger_period == 0 {
            settings.acceleration_rejection = f64::MAX;
            settings.magnetic_rejection = f64::MAX;
        }

        settings
    }
}

impl From<&FilterConfig> for FusionSettings {
    fn from(config: &FilterConfig) -> Self {
        Self::from_config(config)
    }
}

/// Per-sensor rejection bookkeeping
#[derive(Debug, Clone, Copy)]
struct Rejection {
    half_feedback: Vector3<f64>,
    ignored: bool,
    trigger: i64,
    timeout: i64,
}

impl Rejection {
    fn new(period: u32) -> Self {
        Self {
            half_feedback: Vector3::zeros(),
            ignored: false,
            trigger: 0,
            timeout: i64::from(period),
        }
    }

    fn reset(&mut self, period: u32) {
        *self = Self::new(period);
    }

    /// Update with a new feedback term, returns the feedback to apply
    fn apply(
        &mut self,
        half_feedback: Vector3<f64>,
        threshold: f64,
        initialising: bool,
        period: u32,
    ) -> Vector3<f64> {
        let period = i64::from(period);
        self.half_feedback = half_feedback;
        self.ignored = true;

        if initialising || half_feedback.norm_squared() <= threshold {
            self.ignored = false;
            self.trigger -= 9;
        } else {
            self.trigger += 1;
        }

        if self.trigger > self.timeout {
            self.timeout = 0;
            self.ignored = false;
        } else {
            self.timeout = period;
        }
        self.trigger = self.trigger.clamp(0, period);

        if self.ignored {
            Vector3::zeros()
        } else {
            half_feedback
        }
    }

    fn error_degrees(&self) -> f64 {
        asin_clamped(2.0 * self.half_feedback.norm()).to_degrees()
    }

    fn normalised_trigger(&self, period: u32) -> f64 {
        if period == 0 {
            0.0
        } else {
            self.trigger as f64 / f64::from(period)
        }
    }

    fn recovering(&self) -> bool {
        self.trigger > self.timeout
    }
}

/// Fusion AHRS filter state
#[derive(Debug, Clone)]
pub struct FusionAhrs {
    settings: FusionSettings,
    quaternion: Quaternion<f64>,
    initialising: bool,
    ramped_gain: f64,
    ramped_gain_step: f64,
    angular_rate_recovery: bool,
    accelerometer: Rejection,
    magnetometer: Rejection,
}

impl FusionAhrs {
    /// Create a filter in its initial state
    pub fn new(settings: FusionSettings) -> Self {
        let mut ahrs = Self {
            settings,
            quaternion: Quaternion::identity(),
            initialising: true,
            ramped_gain: INITIAL_GAIN,
            ramped_gain_step: (INITIAL_GAIN - settings.gain) / INITIALISATION_PERIOD,
            angular_rate_recovery: false,
            accelerometer: Rejection::new(settings.recovery_trigger_period),
            magnetometer: Rejection::new(settings.recovery_trigger_period),
        };
        ahrs.reset();
        ahrs
    }

    /// Create a filter from the user-facing configuration
    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(FusionSettings::from_config(config))
    }

    /// Active settings
    pub fn settings(&self) -> &FusionSettings {
        &self.settings
    }

    /// Direction of gravity indicated by the algorithm, scaled by 0.5
    fn half_gravity(&self) -> Vector3<f64> {
        let q = &self.quaternion;
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);
        match self.settings.convention {
            Convention::Nwu | Convention::Enu => {
                Vector3::new(x * z - w * y, y * z + w * x, w * w - 0.5 + z * z)
            }
            Convention::Ned => Vector3::new(w * y - x * z, -(y * z + w * x), 0.5 - w * w - z * z),
        }
    }

    /// Direction of the magnetic field indicated by the algorithm, scaled by 0.5
    fn half_magnetic(&self) -> Vector3<f64> {
        let q = &self.quaternion;
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);
        match self.settings.convention {
            Convention::Nwu => Vector3::new(x * y + w * z, w * w - 0.5 + y * y, y * z - w * x),
            Convention::Enu => Vector3::new(0.5 - w * w - x * x, w * z - x * y, -(x * z + w * y)),
            Convention::Ned => Vector3::new(-(x * y + w * z), 0.5 - w * w - y * y, w * x - y * z),
        }
    }

    fn gyroscope_range_exceeded(&self, gyroscope: &Vector3<f64>) -> bool {
        gyroscope
            .iter()
            .any(|v| v.abs() > self.settings.gyroscope_range)
    }
}

impl AttitudeFilter for FusionAhrs {
    fn update(
        &mut self,
        gyroscope: Vector3<f64>,
        accelerometer: Vector3<f64>,
        magnetometer: Vector3<f64>,
        delta_time: f64,
    ) {
        if self.gyroscope_range_exceeded(&gyroscope) {
            let quaternion = self.quaternion;
            self.reset();
            self.quaternion = quaternion;
            self.angular_rate_recovery = true;
        }

        if self.initialising {
            self.ramped_gain -= self.ramped_gain_step * delta_time;
            if self.ramped_gain < self.settings.gain || self.settings.gain == 0.0 {
                self.ramped_gain = self.settings.gain;
                self.initialising = false;
                self.angular_rate_recovery = false;
            }
        }

        let period = self.settings.recovery_trigger_period;
        let half_gravity = self.half_gravity();

        let mut half_accelerometer_feedback = Vector3::zeros();
        self.accelerometer.ignored = true;
        if let Some(direction) = accelerometer.try_normalize(NORMALISE_EPSILON) {
            half_accelerometer_feedback = self.accelerometer.apply(
                feedback(&direction, &half_gravity),
                self.settings.acceleration_rejection,
                self.initialising,
                period,
            );
        }

        let mut half_magnetometer_feedback = Vector3::zeros();
        self.magnetometer.ignored = true;
        if magnetometer.norm_squared() > NORMALISE_EPSILON {
            let half_magnetic = self.half_magnetic();
            let direction = half_gravity
                .cross(&magnetometer)
                .try_normalize(NORMALISE_EPSILON)
                .unwrap_or_else(Vector3::zeros);
            half_magnetometer_feedback = self.magnetometer.apply(
                feedback(&direction, &half_magnetic),
                self.settings.magnetic_rejection,
                self.initialising,
                period,
            );
        }

        let half_gyroscope = gyroscope * 0.5_f64.to_radians();
        let adjusted_half_gyroscope = half_gyroscope
            + (half_accelerometer_feedback + half_magnetometer_feedback) * self.ramped_gain;

        let step = adjusted_half_gyroscope * delta_time;
        let integrated = self.quaternion + self.quaternion * Quaternion::from_imag(step);
        let norm = integrated.norm();
        self.quaternion = if norm > NORMALISE_EPSILON {
            Quaternion::from(integrated.coords / norm)
        } else {
            Quaternion::identity()
        };
    }

    fn quaternion(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::new_unchecked(self.quaternion)
    }

    fn euler_degrees(&self) -> Vector3<f64> {
        let q = &self.quaternion;
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);
        let half_minus_y_squared = 0.5 - y * y;
        Vector3::new(
            (w * x + y * z).atan2(half_minus_y_squared - x * x).to_degrees(),
            asin_clamped(2.0 * (w * y - z * x)).to_degrees(),
            (w * z + x * y).atan2(half_minus_y_squared - z * z).to_degrees(),
        )
    }

    fn internal_states(&self) -> InternalStates {
        let period = self.settings.recovery_trigger_period;
        InternalStates {
            acceleration_error: self.accelerometer.error_degrees(),
            accelerometer_ignored: self.accelerometer.ignored,
            acceleration_recovery_trigger: self.accelerometer.normalised_trigger(period),
            magnetic_error: self.magnetometer.error_degrees(),
            magnetometer_ignored: self.magnetometer.ignored,
            magnetic_recovery_trigger: self.magnetometer.normalised_trigger(period),
        }
    }

    fn flags(&self) -> FilterFlags {
        FilterFlags {
            initialising: self.initialising,
            angular_rate_recovery: self.angular_rate_recovery,
            acceleration_recovery: self.accelerometer.recovering(),
            magnetic_recovery: self.magnetometer.recovering(),
        }
    }

    fn reset(&mut self) {
        let period = self.settings.recovery_trigger_period;
        self.quaternion = Quaternion::identity();
        self.initialising = true;
        self.ramped_gain = INITIAL_GAIN;
        self.ramped_gain_step = (INITIAL_GAIN - self.settings.gain) / INITIALISATION_PERIOD;
        self.angular_rate_recovery = false;
        self.accelerometer.reset(period);
        self.magnetometer.reset(period);
    }
}

/// Feedback term between a measured and a reference direction
fn feedback(sensor: &Vector3<f64>, reference: &Vector3<f64>) -> Vector3<f64> {
    let cross = sensor.cross(reference);
    if sensor.dot(reference) < 0.0 {
        // more than 90 degrees apart
        cross
            .try_normalize(NORMALISE_EPSILON)
            .unwrap_or_else(Vector3::zeros)
    } else {
        cross
    }
}

fn asin_clamped(value: f64) -> f64 {
    value.clamp(-1.0, 1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.01;

    fn config(gain: f64, rejection: f64, period: u32) -> FilterConfig {
        FilterConfig {
            sample_rate: 100.0,
            gain,
            gyroscope_range: 2000.0,
            acceleration_rejection: rejection,
            magnetic_rejection: rejection,
            recovery_trigger_period: period,
            ..Default::default()
        }
    }

    fn level() -> Vector3<f64> {
        Vector3::new(0.0, 0.0, 1.0)
    }

    #[test]
    fn test_settings_transform() {
        let settings = FusionSettings::from_config(&config(0.5, 90.0, 10));
        assert!((settings.gyroscope_range - 1960.0).abs() < 1e-9);
        assert!((settings.acceleration_rejection - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_zero_gain_disables_rejection() {
        let settings = FusionSettings::from_config(&config(0.0, 10.0, 10));
        assert_eq!(settings.acceleration_rejection, f64::MAX);
        assert_eq!(settings.magnetic_rejection, f64::MAX);
    }

    #[test]
    fn test_level_and_still_stays_identity() {
        let mut ahrs = FusionAhrs::from_config(&config(0.5, 10.0, 50));
        for _ in 0..500 {
            ahrs.update(Vector3::zeros(), level(), Vector3::new(1.0, 0.0, 0.0), DT);
        }
        let euler = ahrs.euler_degrees();
        assert!(euler.norm() < 1e-6, "euler {euler:?}");
        assert!(!ahrs.flags().initialising);
    }

    #[test]
    fn test_gyroscope_integration_without_feedback() {
        let mut ahrs = FusionAhrs::from_config(&config(0.0, 0.0, 0));
        for _ in 0..100 {
            ahrs.update(Vector3::new(0.0, 0.0, 90.0), Vector3::zeros(), Vector3::zeros(), DT);
        }
        let yaw = ahrs.euler_degrees().z;
        assert!((yaw - 90.0).abs() < 0.1, "yaw {yaw}");
        assert!((ahrs.quaternion().norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_initialisation_ramp_ends_after_period() {
        let mut ahrs = FusionAhrs::from_config(&config(0.5, 10.0, 50));
        ahrs.update(Vector3::zeros(), level(), Vector3::zeros(), DT);
        assert!(ahrs.flags().initialising);

        for _ in 0..310 {
            ahrs.update(Vector3::zeros(), level(), Vector3::zeros(), DT);
        }
        assert!(!ahrs.flags().initialising);
    }

    #[test]
    fn test_zero_delta_time_keeps_initialising() {
        let mut ahrs = FusionAhrs::from_config(&config(0.5, 10.0, 50));
        for _ in 0..10 {
            ahrs.update(Vector3::zeros(), level(), Vector3::zeros(), 0.0);
        }
        assert!(ahrs.flags().initialising);
    }

    #[test]
    fn test_gyroscope_range_exceeded_reinitialises() {
        let mut ahrs = FusionAhrs::from_config(&config(0.5, 10.0, 50));
        for _ in 0..400 {
            ahrs.update(Vector3::zeros(), level(), Vector3::zeros(), DT);
        }
        assert!(!ahrs.flags().initialising);

        ahrs.update(Vector3::new(2500.0, 0.0, 0.0), level(), Vector3::zeros(), DT);
        let flags = ahrs.flags();
        assert!(flags.initialising);
        assert!(flags.angular_rate_recovery);
    }

    #[test]
    fn test_acceleration_rejection_and_recovery() {
        let period = 5;
        let mut ahrs = FusionAhrs::from_config(&config(0.5, 10.0, period));
        for _ in 0..400 {
            ahrs.update(Vector3::zeros(), level(), Vector3::zeros(), DT);
        }

        let sideways = Vector3::new(1.0, 0.0, 0.0);
        ahrs.update(Vector3::zeros(), sideways, Vector3::zeros(), DT);
        let states = ahrs.internal_states();
        assert!(states.accelerometer_ignored);
        assert!((states.acceleration_error - 90.0).abs() < 1e-6);
        assert!((states.acceleration_recovery_trigger - 0.2).abs() < 1e-12);
        assert!(!ahrs.flags().acceleration_recovery);

        for _ in 0..period {
            ahrs.update(Vector3::zeros(), sideways, Vector3::zeros(), DT);
        }
        assert!(!ahrs.internal_states().accelerometer_ignored);
        assert!(ahrs.flags().acceleration_recovery);
    }

    #[test]
    fn test_missing_sensors_are_ignored() {
        let mut ahrs = FusionAhrs::from_config(&config(0.5, 10.0, 50));
        ahrs.update(Vector3::zeros(), Vector3::zeros(), Vector3::zeros(), DT);
        let states = ahrs.internal_states();
        assert!(states.accelerometer_ignored);
        assert!(states.magnetometer_ignored);
    }

    #[test]
    fn test_ned_level_reads_zero() {
        let mut cfg = config(0.5, 10.0, 50);
        cfg.convention = Convention::Ned;
        let mut ahrs = FusionAhrs::from_config(&cfg);
        for _ in 0..500 {
            ahrs.update(
                Vector3::zeros(),
                Vector3::new(0.0, 0.0, -1.0),
                Vector3::new(1.0, 0.0, 0.0),
                DT,
            );
        }
        let euler = ahrs.euler_degrees();
        assert!(euler.x.abs() < 1e-3 && euler.y.abs() < 1e-3, "euler {euler:?}");
    }

    #[test]
    fn test_reset_restores_identity() {
        let mut ahrs = FusionAhrs::from_config(&config(0.0, 0.0, 0));
        ahrs.update(Vector3::new(0.0, 0.0, 90.0), Vector3::zeros(), Vector3::zeros(), 0.5);
        ahrs.reset();
        assert_eq!(ahrs.quaternion(), UnitQuaternion::identity());
        assert!(ahrs.flags().initialising);
    }
}
