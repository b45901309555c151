//! SensorSample - Ingestion output
//!
//! A single-axis reading as decoded from a transport.

use serde::{Deserialize, Serialize};

use crate::ControlEvent;

/// Three-component reading (x, y, z)
pub type Vec3 = [f64; 3];

/// Android sensor type string for the gyroscope
pub const ANDROID_GYROSCOPE: &str = "android.sensor.gyroscope";
/// Android sensor type string for the accelerometer
pub const ANDROID_ACCELEROMETER: &str = "android.sensor.accelerometer";
/// Android sensor type string for the magnetometer
pub const ANDROID_MAGNETIC_FIELD: &str = "android.sensor.magnetic_field";
/// Android sensor type string for the fused orientation sensor
pub const ANDROID_ORIENTATION: &str = "android.sensor.orientation";

/// Axis channel a sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Gyro,
    Accel,
    Mag,
}

impl Axis {
    /// All axis channels, in slot order
    pub const ALL: [Axis; 3] = [Axis::Gyro, Axis::Accel, Axis::Mag];

    /// Map an Android sensor type string to an axis
    pub fn from_android_type(sensor_type: &str) -> Option<Self> {
        match sensor_type {
            ANDROID_GYROSCOPE => Some(Self::Gyro),
            ANDROID_ACCELEROMETER => Some(Self::Accel),
            ANDROID_MAGNETIC_FIELD => Some(Self::Mag),
            _ => None,
        }
    }

    /// Android sensor type string for this axis
    pub fn android_type(self) -> &'static str {
        match self {
            Self::Gyro => ANDROID_GYROSCOPE,
            Self::Accel => ANDROID_ACCELEROMETER,
            Self::Mag => ANDROID_MAGNETIC_FIELD,
        }
    }

    /// Short label (used for logs and metric labels)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gyro => "gyro",
            Self::Accel => "accel",
            Self::Mag => "mag",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-axis sensor sample
///
/// Produced once per inbound message, immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Axis channel
    pub axis: Axis,

    /// Source timestamp in source ticks
    pub timestamp: i64,

    /// Reading (x, y, z) in source units
    pub values: Vec3,
}

impl SensorSample {
    /// Create a new sample
    pub fn new(axis: Axis, timestamp: i64, values: Vec3) -> Self {
        Self {
            axis,
            timestamp,
            values,
        }
    }

    /// Whether every component is finite
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

/// Orientation reported by the device itself (passed through, not fused)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationHint {
    pub timestamp: i64,
    pub values: Vec3,
}

/// Decoded unit forwarded by a transport adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceEvent {
    /// Axis sample, routed to the synchronizer
    Sample(SensorSample),

    /// Device orientation hint, routed to the synchronizer
    Hint(OrientationHint),

    /// Out-of-band marker, routed to the control handler
    Control(ControlEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_android_type_mapping() {
        for axis in Axis::ALL {
            assert_eq!(Axis::from_android_type(axis.android_type()), Some(axis));
        }
        assert_eq!(Axis::from_android_type("android.sensor.light"), None);
        assert_eq!(Axis::from_android_type(ANDROID_ORIENTATION), None);
    }

    #[test]
    fn test_sample_finite_check() {
        let ok = SensorSample::new(Axis::Gyro, 1, [0.1, 0.2, 0.3]);
        assert!(ok.is_finite());

        let bad = SensorSample::new(Axis::Gyro, 1, [0.1, f64::NAN, 0.3]);
        assert!(!bad.is_finite());
    }
}
