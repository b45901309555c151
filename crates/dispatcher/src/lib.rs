//! # Dispatcher
//!
//! Publication distribution module.
//!
//! Responsibilities:
//! - Register/unregister subscribers at runtime
//! - Fan out orientation results (and optionally raw frames) to every
//!   subscriber
//! - Isolate slow or failing subscribers, never blocking the estimator

pub mod distributor;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod server;
pub mod subscribers;

pub use contracts::{Publication, Subscriber};
pub use distributor::{create_distributor, Distributor, SubscriberId};
pub use error::DispatcherError;
pub use handle::{SendOutcome, SubscriberHandle};
pub use metrics::{MetricsSnapshot, SubscriberMetrics};
pub use server::{BroadcastServer, DEFAULT_BROADCAST_ADDR};
pub use subscribers::{
    CallbackSubscriber, ChannelSubscriber, FileSubscriber, LogSubscriber, NetworkSubscriber,
    WebSocketSubscriber,
};
