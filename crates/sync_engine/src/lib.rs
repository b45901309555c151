//! # Sync Engine
//!
//! Cross-axis stream synchronizer.
//!
//! Responsibilities:
//! - Merge gyroscope, accelerometer and magnetometer samples into one pending frame
//! - Decide when the frame is complete and emit a snapshot
//! - Apply the configured emission policy (flush or retain)
//!
//! ## Example
//!
//! ```
//! use contracts::{Axis, EmissionPolicy, SensorSample};
//! use sync_engine::StreamSynchronizer;
//!
//! let sync = StreamSynchronizer::new(EmissionPolicy::Flush);
//!
//! assert!(sync.ingest(SensorSample::new(Axis::Gyro, 100, [0.0; 3])).is_none());
//! assert!(sync.ingest(SensorSample::new(Axis::Accel, 150, [0.0; 3])).is_none());
//! let frame = sync.ingest(SensorSample::new(Axis::Mag, 200, [0.0; 3])).unwrap();
//! assert_eq!(frame.timestamp, 200);
//! ```

mod engine;

pub use engine::{StreamSynchronizer, SyncState, SyncStats};

// Re-export contracts types
pub use contracts::{CompositeFrame, EmissionPolicy, FrameSnapshot, SensorSample};
