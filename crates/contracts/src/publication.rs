//! Publication - Distributor fan-out unit

use serde::{Deserialize, Serialize};

use crate::{FrameSnapshot, OrientationResult};

/// Unit broadcast to subscribers
///
/// Untagged, so an orientation publication serializes exactly as
/// [`OrientationResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Publication {
    /// Orientation estimate
    Orientation(OrientationResult),

    /// Raw composite frame (debugging)
    Frame(FrameSnapshot),
}

impl Publication {
    /// Timestamp of the underlying frame
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Orientation(result) => result.timestamp,
            Self::Frame(frame) => frame.timestamp,
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Orientation(_) => "orientation",
            Self::Frame(_) => "frame",
        }
    }
}

impl From<OrientationResult> for Publication {
    fn from(result: OrientationResult) -> Self {
        Self::Orientation(result)
    }
}

impl From<FrameSnapshot> for Publication {
    fn from(frame: FrameSnapshot) -> Self {
        Self::Frame(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FilterFlags, InternalStates};

    #[test]
    fn test_orientation_publication_matches_result_json() {
        let result = OrientationResult {
            timestamp: 5,
            quaternion: [1.0, 0.0, 0.0, 0.0],
            euler_angles: [1.0, 2.0, 3.0],
            internal_states: InternalStates::default(),
            flags: FilterFlags::default(),
            orientation: None,
        };

        let direct = serde_json::to_string(&result).unwrap();
        let wrapped = serde_json::to_string(&Publication::from(result)).unwrap();
        assert_eq!(direct, wrapped);
    }
}
