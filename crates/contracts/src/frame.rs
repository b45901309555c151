//! CompositeFrame - Synchronizer state and output

use serde::{Deserialize, Serialize};

use crate::{Axis, Vec3};

/// Pending cross-axis frame
///
/// Owned by the synchronizer and mutated in place as samples arrive.
/// `timestamp` always equals the timestamp of the most recently merged sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeFrame {
    pub timestamp: i64,
    pub gyro: Option<Vec3>,
    pub accel: Option<Vec3>,
    pub mag: Option<Vec3>,
    pub orientation_hint: Option<Vec3>,
}

impl CompositeFrame {
    /// Slot for the given axis
    pub fn slot(&self, axis: Axis) -> Option<Vec3> {
        match axis {
            Axis::Gyro => self.gyro,
            Axis::Accel => self.accel,
            Axis::Mag => self.mag,
        }
    }

    /// Mutable slot for the given axis
    pub fn slot_mut(&mut self, axis: Axis) -> &mut Option<Vec3> {
        match axis {
            Axis::Gyro => &mut self.gyro,
            Axis::Accel => &mut self.accel,
            Axis::Mag => &mut self.mag,
        }
    }

    /// All three axis slots populated
    pub fn is_complete(&self) -> bool {
        self.gyro.is_some() && self.accel.is_some() && self.mag.is_some()
    }

    /// Axes still missing
    pub fn missing_axes(&self) -> Vec<Axis> {
        Axis::ALL
            .into_iter()
            .filter(|axis| self.slot(*axis).is_none())
            .collect()
    }

    /// Clear the three axis slots (the hint is consumed too)
    pub fn clear_axes(&mut self) {
        self.gyro = None;
        self.accel = None;
        self.mag = None;
        self.orientation_hint = None;
    }

    /// Deep copy of a complete frame, `None` while any axis is missing
    pub fn snapshot(&self) -> Option<FrameSnapshot> {
        Some(FrameSnapshot {
            timestamp: self.timestamp,
            gyro: self.gyro?,
            accel: self.accel?,
            mag: self.mag?,
            orientation_hint: self.orientation_hint,
        })
    }
}

/// Emitted frame handed to the estimator
///
/// All three axes are present by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub timestamp: i64,
    pub gyro: Vec3,
    pub accel: Vec3,
    pub mag: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation_hint: Option<Vec3>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_requires_all_axes() {
        let mut frame = CompositeFrame::default();
        *frame.slot_mut(Axis::Gyro) = Some([1.0, 2.0, 3.0]);
        *frame.slot_mut(Axis::Accel) = Some([0.0, 0.0, 9.8]);
        assert!(frame.snapshot().is_none());
        assert_eq!(frame.missing_axes(), vec![Axis::Mag]);

        *frame.slot_mut(Axis::Mag) = Some([20.0, 0.0, -40.0]);
        frame.timestamp = 42;
        let snapshot = frame.snapshot().unwrap();
        assert_eq!(snapshot.timestamp, 42);
        assert_eq!(snapshot.gyro, [1.0, 2.0, 3.0]);
        assert_eq!(snapshot.mag, [20.0, 0.0, -40.0]);
    }

    #[test]
    fn test_clear_axes_keeps_timestamp() {
        let mut frame = CompositeFrame {
            timestamp: 7,
            gyro: Some([0.0; 3]),
            accel: Some([0.0; 3]),
            mag: Some([0.0; 3]),
            orientation_hint: Some([1.0, 2.0, 3.0]),
        };
        frame.clear_axes();
        assert!(!frame.is_complete());
        assert_eq!(frame.timestamp, 7);
        assert!(frame.orientation_hint.is_none());
    }
}
