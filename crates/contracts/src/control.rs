//! ControlEvent - out-of-band markers emitted by serial boards

use serde::{Deserialize, Serialize};

/// Kind of control marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    CompassCalibrationStarted,
    CompassCalibrationEnded,
    ImuCalibrationStarted,
    ImuCalibrationEnded,
    AccelBiasReport,
}

/// Literal line fragments recognized as control markers
const MARKERS: [(&str, ControlKind); 5] = [
    ("Start compass calibration", ControlKind::CompassCalibrationStarted),
    ("End of compass calibration", ControlKind::CompassCalibrationEnded),
    (
        "Calibrating Accelerometer and Gyroscope",
        ControlKind::ImuCalibrationStarted,
    ),
    (
        "Accelerometer & Gyro calibration complete",
        ControlKind::ImuCalibrationEnded,
    ),
    ("Acc Bias", ControlKind::AccelBiasReport),
];

impl ControlKind {
    /// Detect a control marker anywhere in the line
    pub fn detect(line: &str) -> Option<Self> {
        MARKERS
            .iter()
            .find(|(marker, _)| line.contains(marker))
            .map(|(_, kind)| *kind)
    }

    /// Whether this marker opens a calibration phase
    pub fn is_calibration_start(self) -> bool {
        matches!(
            self,
            Self::CompassCalibrationStarted | Self::ImuCalibrationStarted
        )
    }

    /// Whether this marker closes a calibration phase
    pub fn is_calibration_end(self) -> bool {
        matches!(
            self,
            Self::CompassCalibrationEnded | Self::ImuCalibrationEnded
        )
    }
}

/// Control event
///
/// Bypasses the synchronizer and is delivered to the control handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEvent {
    /// Marker kind
    pub kind: ControlKind,

    /// Full line as received (trimmed)
    pub message: String,
}

impl ControlEvent {
    /// Build a control event from a raw line, if it carries a marker
    pub fn from_line(line: &str) -> Option<Self> {
        ControlKind::detect(line).map(|kind| Self {
            kind,
            message: line.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_all_markers() {
        let cases = [
            ("Start compass calibration now", ControlKind::CompassCalibrationStarted),
            ("End of compass calibration", ControlKind::CompassCalibrationEnded),
            (
                ">> Calibrating Accelerometer and Gyroscope",
                ControlKind::ImuCalibrationStarted,
            ),
            (
                "Accelerometer & Gyro calibration complete!",
                ControlKind::ImuCalibrationEnded,
            ),
            ("Acc Bias: 0.01 0.02 -0.03", ControlKind::AccelBiasReport),
        ];

        for (line, expected) in cases {
            assert_eq!(ControlKind::detect(line), Some(expected), "line: {line}");
        }
    }

    #[test]
    fn test_data_line_is_not_control() {
        assert!(ControlEvent::from_line("1000 0.1 0.2 9.8 0 0 0 20 5 -40").is_none());
    }

    #[test]
    fn test_calibration_phase_helpers() {
        assert!(ControlKind::ImuCalibrationStarted.is_calibration_start());
        assert!(ControlKind::CompassCalibrationEnded.is_calibration_end());
        assert!(!ControlKind::AccelBiasReport.is_calibration_start());
        assert!(!ControlKind::AccelBiasReport.is_calibration_end());
    }
}
