//! Serial board lines
//!
//! Data line: `<timestamp> <ax> <ay> <az> <gx> <gy> <gz> <mx> <my> <mz>`.
//! Any line containing a known marker is a control event instead.

use contracts::{Axis, ControlEvent, SensorSample, SourceEvent};

use crate::error::{IngestionError, Result};

const FIELD_COUNT: usize = 10;

/// Decode one serial line
///
/// Emits three samples sharing the timestamp in accel, gyro, mag order.
pub fn decode_serial_line(line: &str) -> Result<Vec<SourceEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    if let Some(event) = ControlEvent::from_line(line) {
        return Ok(vec![SourceEvent::Control(event)]);
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != FIELD_COUNT {
        return Err(IngestionError::decode(format!(
            "expected {FIELD_COUNT} fields, got {}",
            fields.len()
        )));
    }

    let timestamp = parse_timestamp(fields[0])?;
    let mut values = [0.0f64; FIELD_COUNT - 1];
    for (slot, field) in values.iter_mut().zip(&fields[1..]) {
        *slot = field
            .parse::<f64>()
            .map_err(|_| IngestionError::decode(format!("invalid number '{field}'")))?;
    }

    Ok(vec![
        SourceEvent::Sample(SensorSample::new(
            Axis::Accel,
            timestamp,
            [values[0], values[1], values[2]],
        )),
        SourceEvent::Sample(SensorSample::new(
            Axis::Gyro,
            timestamp,
            [values[3], values[4], values[5]],
        )),
        SourceEvent::Sample(SensorSample::new(
            Axis::Mag,
            timestamp,
            [values[6], values[7], values[8]],
        )),
    ])
}

/// Integer ticks; a fractional value is truncated
fn parse_timestamp(field: &str) -> Result<i64> {
    if let Ok(ticks) = field.parse::<i64>() {
        return Ok(ticks);
    }

    match field.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value as i64),
        _ => Err(IngestionError::decode(format!("invalid timestamp '{field}'"))),
    }
}
