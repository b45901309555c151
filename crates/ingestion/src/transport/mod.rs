//! Transports
//!
//! A [`Connector`] opens one [`Connection`] per connect attempt. The adapter
//! owns the reconnect loop; transports only know how to connect and read.

mod framed;
mod replay;
mod serial;
mod tcp;
mod websocket;

pub use framed::FramedConnection;
pub use replay::{ReplayConnection, ReplayConnector};
pub use serial::SerialConnector;
pub use tcp::TcpConnector;
pub use websocket::{sensor_url, WebSocketConnection, WebSocketConnector};

use std::future::Future;

use crate::error::Result;

/// One open transport session
///
/// `Ok(None)` means the peer ended the stream cleanly; an error means the
/// connection was lost. Both end the session.
#[trait_variant::make(Connection: Send)]
pub trait LocalConnection {
    /// Next line or text frame
    async fn next_line(&mut self) -> Result<Option<String>>;

    /// Release the underlying transport
    async fn close(&mut self);
}

/// Opens connections to one endpoint
pub trait Connector: Send + 'static {
    type Conn: Connection + 'static;

    /// Endpoint description for logs
    fn endpoint(&self) -> String;

    /// Single connect attempt, without timeout
    fn connect(&mut self) -> impl Future<Output = Result<Self::Conn>> + Send;
}
