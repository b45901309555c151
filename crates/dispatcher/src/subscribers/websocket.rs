//! WebSocketSubscriber - one connected broadcast client

use contracts::{ContractError, Publication, Subscriber};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::debug;

/// Sends each publication as a JSON text frame
///
/// Holds the write half only; the server watches the read half for the
/// client going away.
pub struct WebSocketSubscriber<S> {
    name: String,
    sink: SplitSink<WebSocketStream<S>, Message>,
}

impl<S> WebSocketSubscriber<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(name: impl Into<String>, sink: SplitSink<WebSocketStream<S>, Message>) -> Self {
        Self {
            name: name.into(),
            sink,
        }
    }
}

impl<S> Subscriber for WebSocketSubscriber<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&mut self, publication: &Publication) -> Result<(), ContractError> {
        let payload = serde_json::to_string(publication)
            .map_err(|e| ContractError::delivery(&self.name, e.to_string()))?;
        self.sink
            .send(Message::text(payload))
            .await
            .map_err(|e| ContractError::delivery(&self.name, e.to_string()))
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        self.sink
            .flush()
            .await
            .map_err(|e| ContractError::delivery(&self.name, e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        if let Err(e) = self.sink.close().await {
            debug!(subscriber = %self.name, error = %e, "Websocket close failed");
        }
        Ok(())
    }
}
