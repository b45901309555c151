//! OrientationResult - Estimator output
//!
//! Serialized form is the outbound broadcast JSON.

use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Orientation estimate for one emitted frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationResult {
    /// Timestamp of the frame that produced this estimate (source ticks)
    pub timestamp: i64,

    /// Unit quaternion (w, x, y, z)
    pub quaternion: [f64; 4],

    /// Roll, pitch, yaw in degrees
    pub euler_angles: Vec3,

    /// Filter diagnostics
    pub internal_states: InternalStates,

    /// Filter flags
    pub flags: FilterFlags,

    /// Device-reported orientation passed through from the frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Vec3>,
}

/// Filter internal states
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InternalStates {
    /// Angle between measured and estimated gravity (degrees)
    pub acceleration_error: f64,
    pub accelerometer_ignored: bool,
    /// Acceleration recovery trigger, normalised to 0..=1
    pub acceleration_recovery_trigger: f64,
    /// Angle between measured and estimated magnetic field (degrees)
    pub magnetic_error: f64,
    pub magnetometer_ignored: bool,
    /// Magnetic recovery trigger, normalised to 0..=1
    pub magnetic_recovery_trigger: f64,
}

/// Filter flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterFlags {
    pub initialising: bool,
    pub angular_rate_recovery: bool,
    pub acceleration_recovery: bool,
    pub magnetic_recovery: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_json_shape() {
        let result = OrientationResult {
            timestamp: 200,
            quaternion: [1.0, 0.0, 0.0, 0.0],
            euler_angles: [0.0, 0.0, 0.0],
            internal_states: InternalStates::default(),
            flags: FilterFlags {
                initialising: true,
                ..Default::default()
            },
            orientation: None,
        };

        let value = serde_json::to_value(result).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 5);
        assert_eq!(obj["timestamp"], 200);
        assert_eq!(obj["quaternion"].as_array().unwrap().len(), 4);
        assert_eq!(obj["flags"]["initialising"], true);
        assert!(obj["internal_states"].get("magnetic_recovery_trigger").is_some());
    }

    #[test]
    fn test_orientation_hint_serialized_when_present() {
        let result = OrientationResult {
            timestamp: 1,
            quaternion: [1.0, 0.0, 0.0, 0.0],
            euler_angles: [0.0; 3],
            internal_states: InternalStates::default(),
            flags: FilterFlags::default(),
            orientation: Some([10.0, 20.0, 30.0]),
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"orientation\":[10.0,20.0,30.0]"));
    }
}
