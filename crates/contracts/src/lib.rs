//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the relay.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Time Model
//! - Sample timestamps are integer ticks as sent by the source
//!   (nanoseconds for the phone websocket, microseconds for serial boards)
//! - The estimator converts ticks to seconds with a fixed [`TimeUnit`]

mod blueprint;
mod control;
mod error;
mod estimator_config;
mod frame;
mod orientation;
mod publication;
mod sample;
mod subscriber;

pub use blueprint::*;
pub use control::*;
pub use error::*;
pub use estimator_config::*;
pub use frame::*;
pub use orientation::*;
pub use publication::*;
pub use sample::*;
pub use subscriber::*;
