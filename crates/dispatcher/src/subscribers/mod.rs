//! Subscriber implementations
//!
//! In-process: CallbackSubscriber, ChannelSubscriber.
//! Outputs: LogSubscriber, NetworkSubscriber, FileSubscriber, WebSocketSubscriber.

mod callback;
mod channel;
mod file;
mod log;
mod network;
mod websocket;

pub use self::callback::CallbackSubscriber;
pub use self::channel::ChannelSubscriber;
pub use self::file::{FileSubscriber, FileSubscriberConfig};
pub use self::log::LogSubscriber;
pub use self::network::NetworkSubscriber;
pub use self::websocket::WebSocketSubscriber;
