//! Unit conversion and frame timing

use contracts::{AccelUnits, GyroUnits, TimeUnit, Vec3};
use nalgebra::Vector3;
use tracing::warn;

/// Standard gravity (m/s²)
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Gyroscope reading in deg/s
pub fn gyro_to_degrees(values: Vec3, units: GyroUnits) -> Vector3<f64> {
    let v = Vector3::from(values);
    match units {
        GyroUnits::RadiansPerSecond => v.map(f64::to_degrees),
        GyroUnits::DegreesPerSecond => v,
    }
}

/// Accelerometer reading in g
pub fn accel_to_g(values: Vec3, units: AccelUnits) -> Vector3<f64> {
    let v = Vector3::from(values);
    match units {
        AccelUnits::MetersPerSecondSquared => v / STANDARD_GRAVITY,
        AccelUnits::StandardGravity => v,
    }
}

/// Delta-time between consecutive frames
///
/// The first advance yields 0. A timestamp earlier than the previous one
/// yields 0 as well and is logged.
#[derive(Debug, Clone)]
pub struct DeltaClock {
    ticks_per_second: f64,
    last_timestamp: Option<i64>,
}

impl DeltaClock {
    pub fn new(unit: TimeUnit) -> Self {
        Self {
            ticks_per_second: unit.ticks_per_second(),
            last_timestamp: None,
        }
    }

    /// Seconds elapsed since the previous timestamp
    pub fn advance(&mut self, timestamp: i64) -> f64 {
        let previous = self.last_timestamp.replace(timestamp);

        let Some(previous) = previous else {
            return 0.0;
        };

        let ticks = timestamp.saturating_sub(previous);
        if ticks < 0 {
            warn!(
                previous,
                timestamp, "Out-of-order frame timestamp, delta clamped to 0"
            );
            return 0.0;
        }

        ticks as f64 / self.ticks_per_second
    }

    /// Last timestamp seen
    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }

    /// Forget the previous timestamp
    pub fn reset(&mut self) {
        self.last_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_delta_is_zero() {
        let mut clock = DeltaClock::new(TimeUnit::Nanoseconds);
        assert_eq!(clock.advance(1_000_000_000), 0.0);
        assert_eq!(clock.advance(1_010_000_000), 0.01);
    }

    #[test]
    fn test_microsecond_delta() {
        let mut clock = DeltaClock::new(TimeUnit::Microseconds);
        clock.advance(5_000);
        assert_eq!(clock.advance(25_000), 0.02);
    }

    #[test]
    fn test_backwards_timestamp_clamped() {
        let mut clock = DeltaClock::new(TimeUnit::Milliseconds);
        clock.advance(100);
        assert_eq!(clock.advance(90), 0.0);
        assert_eq!(clock.last_timestamp(), Some(90));
    }

    #[test]
    fn test_unit_conversion() {
        let gyro = gyro_to_degrees([std::f64::consts::PI, 0.0, 0.0], GyroUnits::RadiansPerSecond);
        assert!((gyro.x - 180.0).abs() < 1e-9);

        let accel = accel_to_g([0.0, 0.0, STANDARD_GRAVITY], AccelUnits::MetersPerSecondSquared);
        assert!((accel.z - 1.0).abs() < 1e-12);

        let passthrough = accel_to_g([0.0, 0.0, 1.0], AccelUnits::StandardGravity);
        assert_eq!(passthrough.z, 1.0);
    }
}
