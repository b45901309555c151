//! Newline-delimited TCP transport

use tokio::net::TcpStream;

use crate::error::{IngestionError, Result};

use super::{Connector, FramedConnection};

/// Connects to `host:port`
#[derive(Debug, Clone)]
pub struct TcpConnector {
    source_name: String,
    address: String,
}

impl TcpConnector {
    pub fn new(source_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            address: address.into(),
        }
    }
}

impl Connector for TcpConnector {
    type Conn = FramedConnection<TcpStream>;

    fn endpoint(&self) -> String {
        format!("tcp://{}", self.address)
    }

    async fn connect(&mut self) -> Result<Self::Conn> {
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| IngestionError::transport(&self.source_name, e))?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(source = %self.source_name, error = %e, "set_nodelay failed");
        }
        Ok(FramedConnection::new(self.source_name.clone(), stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Connection;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b"100 0 0 9.8 0 0 0 20 0 -40\n")
                .await
                .unwrap();
        });

        let mut connector = TcpConnector::new("board", address);
        let mut conn = connector.connect().await.unwrap();
        assert_eq!(
            conn.next_line().await.unwrap().as_deref(),
            Some("100 0 0 9.8 0 0 0 20 0 -40")
        );
        server.await.unwrap();
        assert_eq!(conn.next_line().await.unwrap(), None);
        conn.close().await;
    }

    #[tokio::test]
    async fn test_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut connector = TcpConnector::new("board", address);
        let err = connector.connect().await.err().unwrap();
        assert!(matches!(err, IngestionError::Transport { .. }));
    }
}
