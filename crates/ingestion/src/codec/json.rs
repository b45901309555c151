//! Phone sensor JSON messages
//!
//! `{"type": "android.sensor.gyroscope", "values": [x, y, z], "timestamp": 123, "accuracy": 3}`

use contracts::{Axis, OrientationHint, SensorSample, SourceEvent, ANDROID_ORIENTATION};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{IngestionError, Result};

/// Raw inbound sensor message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorMessage {
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub values: Vec<f64>,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<i32>,
}

impl SensorMessage {
    /// First three values
    fn vector(&self) -> Result<[f64; 3]> {
        match self.values.as_slice() {
            [x, y, z, ..] => Ok([*x, *y, *z]),
            other => Err(IngestionError::decode(format!(
                "{} carries {} values, expected 3",
                self.sensor_type,
                other.len()
            ))),
        }
    }
}

/// Decode one JSON message
///
/// Unrecognized sensor types decode to nothing and are logged.
pub fn decode_json(line: &str) -> Result<Vec<SourceEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    let message: SensorMessage = serde_json::from_str(line)
        .map_err(|e| IngestionError::decode(format!("invalid sensor message: {e}")))?;

    if let Some(axis) = Axis::from_android_type(&message.sensor_type) {
        let values = message.vector()?;
        return Ok(vec![SourceEvent::Sample(SensorSample::new(
            axis,
            message.timestamp,
            values,
        ))]);
    }

    if message.sensor_type == ANDROID_ORIENTATION {
        let values = message.vector()?;
        return Ok(vec![SourceEvent::Hint(OrientationHint {
            timestamp: message.timestamp,
            values,
        })]);
    }

    warn!(sensor_type = %message.sensor_type, "Dropping message with unrecognized sensor type");
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_gyroscope() {
        let events = decode_json(
            r#"{"type":"android.sensor.gyroscope","values":[0.1,0.2,0.3],"timestamp":123456789,"accuracy":3}"#,
        )
        .unwrap();
        assert_eq!(
            events,
            vec![SourceEvent::Sample(SensorSample::new(
                Axis::Gyro,
                123456789,
                [0.1, 0.2, 0.3]
            ))]
        );
    }

    #[test]
    fn test_accuracy_is_optional() {
        let events = decode_json(
            r#"{"type":"android.sensor.magnetic_field","values":[20.0,1.0,-40.0],"timestamp":5}"#,
        )
        .unwrap();
        assert!(matches!(events[0], SourceEvent::Sample(s) if s.axis == Axis::Mag));
    }

    #[test]
    fn test_orientation_becomes_hint() {
        let events = decode_json(
            r#"{"type":"android.sensor.orientation","values":[90.0,1.0,2.0],"timestamp":7}"#,
        )
        .unwrap();
        assert_eq!(
            events,
            vec![SourceEvent::Hint(OrientationHint {
                timestamp: 7,
                values: [90.0, 1.0, 2.0]
            })]
        );
    }

    #[test]
    fn test_unknown_type_dropped() {
        let events =
            decode_json(r#"{"type":"android.sensor.light","values":[300.0],"timestamp":1}"#)
                .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(decode_json("{not json").is_err());
        assert!(decode_json(r#"{"type":"android.sensor.gyroscope","values":[1.0],"timestamp":1}"#).is_err());
        assert!(decode_json(r#"{"type":"android.sensor.gyroscope","values":[1.0,2.0,3.0]}"#).is_err());
    }
}
