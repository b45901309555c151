//! # Estimator
//!
//! Orientation estimation for emitted frames.
//!
//! Responsibilities:
//! - Compute delta-time between frames from source timestamps
//! - Convert gyroscope and accelerometer readings into filter units
//! - Drive a recursive attitude filter and read back orientation + diagnostics
//!
//! The filter is reached only through [`AttitudeFilter`]; [`FusionAhrs`] is
//! the shipped implementation.

mod estimator;
mod filter;
mod fusion;
mod units;

pub use estimator::OrientationEstimator;
pub use filter::AttitudeFilter;
pub use fusion::{FusionAhrs, FusionSettings, GyroOffset};
pub use units::{DeltaClock, STANDARD_GRAVITY, accel_to_g, gyro_to_degrees};

// Re-export contracts types
pub use contracts::{EstimatorConfig, FilterConfig, FrameSnapshot, OrientationResult, TimeUnit};
