//! Phone sensor websocket transport

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::{IngestionError, Result};

use super::{Connection, Connector};

/// Sensor websocket URL
///
/// The type list is a JSON array of strings, percent-encoded into the query.
pub fn sensor_url(address: &str, sensor_types: &[String]) -> String {
    let quoted: Vec<String> = sensor_types
        .iter()
        .map(|sensor_type| format!("%22{sensor_type}%22"))
        .collect();
    format!(
        "ws://{address}/sensors/connect?types=%5B{}%5D",
        quoted.join(",")
    )
}

#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    source_name: String,
    url: String,
}

impl WebSocketConnector {
    pub fn new(source_name: impl Into<String>, address: &str, sensor_types: &[String]) -> Self {
        Self {
            source_name: source_name.into(),
            url: sensor_url(address, sensor_types),
        }
    }
}

impl Connector for WebSocketConnector {
    type Conn = WebSocketConnection;

    fn endpoint(&self) -> String {
        self.url.clone()
    }

    async fn connect(&mut self) -> Result<Self::Conn> {
        let (stream, response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| IngestionError::transport(&self.source_name, e))?;
        debug!(source = %self.source_name, status = %response.status(), "Websocket handshake complete");

        Ok(WebSocketConnection {
            source_name: self.source_name.clone(),
            stream,
        })
    }
}

pub struct WebSocketConnection {
    source_name: String,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection for WebSocketConnection {
    async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            let message = match self.stream.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(IngestionError::transport(&self.source_name, e)),
                Some(Ok(message)) => message,
            };

            match message {
                Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
                Message::Binary(data) => {
                    return Ok(Some(String::from_utf8_lossy(&data).into_owned()))
                }
                Message::Close(frame) => {
                    debug!(source = %self.source_name, ?frame, "Websocket closed by peer");
                    return Ok(None);
                }
                other => trace!(source = %self.source_name, kind = ?other, "Ignoring control frame"),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(source = %self.source_name, error = %e, "Websocket close failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_url() {
        let types = vec![
            "android.sensor.accelerometer".to_string(),
            "android.sensor.gyroscope".to_string(),
        ];
        assert_eq!(
            sensor_url("192.168.0.10:8080", &types),
            "ws://192.168.0.10:8080/sensors/connect?types=%5B%22android.sensor.accelerometer%22,%22android.sensor.gyroscope%22%5D"
        );
    }
}
