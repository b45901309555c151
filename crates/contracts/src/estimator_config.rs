//! Estimator configuration contracts shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Earth axes convention
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convention {
    /// North-West-Up
    #[default]
    Nwu,
    /// East-North-Up
    Enu,
    /// North-East-Down
    Ned,
}

/// Attitude filter settings
///
/// Immutable once the estimator is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct FilterConfig {
    /// Nominal sample rate (Hz), sizes the gyroscope offset estimator
    #[validate(range(exclusive_min = 0.0, message = "sample_rate must be > 0"))]
    pub sample_rate: f64,

    /// Algorithm gain
    #[validate(range(min = 0.0, message = "gain must be >= 0"))]
    pub gain: f64,

    /// Gyroscope range (deg/s)
    #[validate(range(exclusive_min = 0.0, message = "gyroscope_range must be > 0"))]
    pub gyroscope_range: f64,

    /// Acceleration rejection threshold (degrees, 0 disables)
    #[validate(range(min = 0.0, message = "acceleration_rejection must be >= 0"))]
    pub acceleration_rejection: f64,

    /// Magnetic rejection threshold (degrees, 0 disables)
    #[validate(range(min = 0.0, message = "magnetic_rejection must be >= 0"))]
    pub magnetic_rejection: f64,

    /// Recovery trigger period (samples)
    pub recovery_trigger_period: u32,

    /// Earth axes convention
    #[serde(default)]
    pub convention: Convention,

    /// Run the gyroscope offset estimator before the filter
    #[serde(default = "default_offset_correction")]
    pub offset_correction: bool,
}

fn default_offset_correction() -> bool {
    true
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sample_rate: 10.0,
            gain: 0.041,
            gyroscope_range: 2000.0,
            acceleration_rejection: 100.0,
            magnetic_rejection: 100.0,
            recovery_trigger_period: 5 * 10,
            convention: Convention::Nwu,
            offset_correction: true,
        }
    }
}

/// Source timestamp unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    /// Ticks per second
    pub fn ticks_per_second(self) -> f64 {
        match self {
            Self::Nanoseconds => 1e9,
            Self::Microseconds => 1e6,
            Self::Milliseconds => 1e3,
            Self::Seconds => 1.0,
        }
    }
}

/// Gyroscope input unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GyroUnits {
    #[default]
    RadiansPerSecond,
    DegreesPerSecond,
}

/// Accelerometer input unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccelUnits {
    #[default]
    MetersPerSecondSquared,
    StandardGravity,
}

/// Estimator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Filter settings
    #[serde(default)]
    pub filter: FilterConfig,

    /// Timestamp unit (None = derived from the configured sources)
    #[serde(default)]
    pub time_unit: Option<TimeUnit>,

    /// Gyroscope input unit
    #[serde(default)]
    pub gyro_units: GyroUnits,

    /// Accelerometer input unit
    #[serde(default)]
    pub accel_units: AccelUnits,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_config_is_valid() {
        assert!(FilterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let config = FilterConfig {
            sample_rate: 0.0,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("sample_rate"));
    }

    #[test]
    fn test_negative_gain_rejected() {
        let config = FilterConfig {
            gain: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_time_unit_divisors() {
        assert_eq!(TimeUnit::Nanoseconds.ticks_per_second(), 1e9);
        assert_eq!(TimeUnit::Microseconds.ticks_per_second(), 1e6);
    }
}
