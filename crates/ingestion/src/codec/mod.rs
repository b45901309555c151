//! Line codecs
//!
//! Each inbound line (or websocket text frame) decodes into zero or more
//! [`SourceEvent`]s. A malformed line is an error; the caller drops it.

mod json;
mod serial;

pub use json::{decode_json, SensorMessage};
pub use serial::decode_serial_line;

use contracts::{CodecKind, SourceEvent};

use crate::error::Result;

/// Line codec selected per source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCodec {
    Json,
    SerialLine,
}

impl LineCodec {
    /// Decode one line
    pub fn decode(self, line: &str) -> Result<Vec<SourceEvent>> {
        match self {
            Self::Json => decode_json(line),
            Self::SerialLine => decode_serial_line(line),
        }
    }
}

impl From<CodecKind> for LineCodec {
    fn from(kind: CodecKind) -> Self {
        match kind {
            CodecKind::Json => Self::Json,
            CodecKind::SerialLine => Self::SerialLine,
        }
    }
}
