//! AttitudeFilter trait - the estimator's view of a recursive AHRS filter

use contracts::{FilterFlags, InternalStates};
use nalgebra::{UnitQuaternion, Vector3};

/// Recursive attitude filter
///
/// Inputs are gyroscope in deg/s, accelerometer in g, magnetometer in any
/// consistent unit. The filter owns its recursive state; callers never reset
/// it between updates.
pub trait AttitudeFilter: Send {
    /// Single-step update
    fn update(
        &mut self,
        gyroscope: Vector3<f64>,
        accelerometer: Vector3<f64>,
        magnetometer: Vector3<f64>,
        delta_time: f64,
    );

    /// Current orientation
    fn quaternion(&self) -> UnitQuaternion<f64>;

    /// Roll, pitch, yaw in degrees
    fn euler_degrees(&self) -> Vector3<f64>;

    /// Diagnostics of the last update
    fn internal_states(&self) -> InternalStates;

    /// Status flags of the last update
    fn flags(&self) -> FilterFlags;

    /// Return to the initial state
    fn reset(&mut self);
}
