//! Gyroscope offset correction
//!
//! Tracks a slowly varying gyroscope bias while the device is stationary and
//! subtracts it from every reading.

use nalgebra::Vector3;

const CUTOFF_FREQUENCY_HZ: f64 = 0.02;
const TIMEOUT_S: f64 = 5.0;
/// Readings above this rate (deg/s) on any axis count as motion
const THRESHOLD_DPS: f64 = 3.0;

/// Run-time gyroscope offset estimator
#[derive(Debug, Clone)]
pub struct GyroOffset {
    filter_coefficient: f64,
    timeout: u32,
    timer: u32,
    offset: Vector3<f64>,
}

impl GyroOffset {
    /// Create an estimator sized for the nominal sample rate (Hz)
    pub fn new(sample_rate: f64) -> Self {
        Self {
            filter_coefficient: 2.0 * std::f64::consts::PI * CUTOFF_FREQUENCY_HZ / sample_rate,
            timeout: (TIMEOUT_S * sample_rate).round() as u32,
            timer: 0,
            offset: Vector3::zeros(),
        }
    }

    /// Correct one gyroscope reading (deg/s)
    pub fn update(&mut self, gyroscope: Vector3<f64>) -> Vector3<f64> {
        let corrected = gyroscope - self.offset;

        if corrected.iter().any(|v| v.abs() > THRESHOLD_DPS) {
            self.timer = 0;
            return corrected;
        }

        if self.timer < self.timeout {
            self.timer += 1;
            return corrected;
        }

        self.offset += corrected * self.filter_coefficient;
        corrected
    }

    /// Current offset estimate (deg/s)
    pub fn offset(&self) -> Vector3<f64> {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_bias_is_learned_after_timeout() {
        let mut offset = GyroOffset::new(10.0);
        let bias = Vector3::new(1.0, -0.5, 0.25);

        for _ in 0..50 {
            assert_eq!(offset.update(bias), bias);
        }

        let mut last = bias;
        for _ in 0..5000 {
            last = offset.update(bias);
        }

        assert!(last.norm() < 0.01, "residual {last:?}");
        assert!((offset.offset() - bias).norm() < 0.01);
    }

    #[test]
    fn test_motion_resets_timer() {
        let mut offset = GyroOffset::new(10.0);
        let still = Vector3::new(0.5, 0.0, 0.0);
        let moving = Vector3::new(0.0, 45.0, 0.0);

        for _ in 0..49 {
            offset.update(still);
        }
        offset.update(moving);
        for _ in 0..50 {
            offset.update(still);
        }

        assert_eq!(offset.offset(), Vector3::zeros());
    }
}
