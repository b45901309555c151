//! NetworkSubscriber - pushes publications to a TCP peer as JSON lines

use std::collections::HashMap;
use std::time::Duration;

use contracts::{ContractError, Publication, ReconnectConfig, Subscriber};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

/// Subscriber that streams newline-delimited JSON to one TCP peer
///
/// Connects on first delivery. When a write fails the connection is dropped,
/// and after `backoff_ms` one reconnect is attempted within
/// `connect_timeout_ms`; if that fails the delivery fails and the distributor
/// unregisters the subscriber.
pub struct NetworkSubscriber {
    name: String,
    addr: String,
    reconnect: ReconnectConfig,
    stream: Option<TcpStream>,
    connects: u64,
}

impl NetworkSubscriber {
    pub fn new(name: impl Into<String>, addr: impl Into<String>, reconnect: ReconnectConfig) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            reconnect,
            stream: None,
            connects: 0,
        }
    }

    /// Create from params: `addr` (required), `backoff_ms`, `connect_timeout_ms`
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let addr = params
            .get("addr")
            .ok_or_else(|| ContractError::config_validation(format!("{name}.params.addr"), "missing"))?;

        let mut reconnect = ReconnectConfig::default();
        if let Some(ms) = millis_param(&name, params, "backoff_ms")? {
            reconnect.backoff_ms = ms;
        }
        if let Some(ms) = millis_param(&name, params, "connect_timeout_ms")? {
            reconnect.connect_timeout_ms = ms;
        }

        Ok(Self::new(name, addr.clone(), reconnect))
    }

    /// Peer address
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Successful connects so far
    pub fn connects(&self) -> u64 {
        self.connects
    }

    async fn connect(&mut self) -> Result<(), ContractError> {
        let limit = Duration::from_millis(self.reconnect.connect_timeout_ms);
        let stream = match timeout(limit, TcpStream::connect(&self.addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(ContractError::delivery(&self.name, e.to_string())),
            Err(_) => {
                return Err(ContractError::delivery(
                    &self.name,
                    format!("connect to {} timed out", self.addr),
                ))
            }
        };

        stream.set_nodelay(true)?;
        self.connects += 1;
        info!(subscriber = %self.name, addr = %self.addr, "NetworkSubscriber connected");
        self.stream = Some(stream);
        Ok(())
    }

    async fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.write_all(line).await,
            None => Err(std::io::ErrorKind::NotConnected.into()),
        }
    }
}

fn millis_param(
    name: &str,
    params: &HashMap<String, String>,
    key: &str,
) -> Result<Option<u64>, ContractError> {
    params
        .get(key)
        .map(|raw| {
            raw.parse().map_err(|_| {
                ContractError::config_validation(
                    format!("{name}.params.{key}"),
                    format!("'{raw}' is not a number of milliseconds"),
                )
            })
        })
        .transpose()
}

fn encode(publication: &Publication) -> Result<Vec<u8>, serde_json::Error> {
    let mut line = serde_json::to_vec(publication)?;
    line.push(b'\n');
    Ok(line)
}

impl Subscriber for NetworkSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_subscriber_deliver",
        skip(self, publication),
        fields(subscriber = %self.name, timestamp = publication.timestamp())
    )]
    async fn deliver(&mut self, publication: &Publication) -> Result<(), ContractError> {
        let line = encode(publication).map_err(|e| ContractError::delivery(&self.name, e.to_string()))?;

        if self.stream.is_some() {
            match self.write_line(&line).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(error = %e, backoff_ms = self.reconnect.backoff_ms, "Peer write failed, reconnecting");
                    self.stream = None;
                    sleep(Duration::from_millis(self.reconnect.backoff_ms)).await;
                }
            }
        }

        self.connect().await?;
        self.write_line(&line).await.map_err(|e| {
            self.stream = None;
            ContractError::delivery(&self.name, e.to_string())
        })
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(stream) = self.stream.as_mut() {
            stream.flush().await?;
        }
        Ok(())
    }

    #[instrument(name = "network_subscriber_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!(subscriber = %self.name, error = %e, "Shutdown of peer stream failed");
            }
        }
        debug!(subscriber = %self.name, "NetworkSubscriber closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FilterFlags, InternalStates, OrientationResult};
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    fn result(timestamp: i64) -> Publication {
        Publication::Orientation(OrientationResult {
            timestamp,
            quaternion: [1.0, 0.0, 0.0, 0.0],
            euler_angles: [0.0, 0.0, 90.0],
            internal_states: InternalStates::default(),
            flags: FilterFlags::default(),
            orientation: None,
        })
    }

    fn quick_reconnect() -> ReconnectConfig {
        ReconnectConfig {
            backoff_ms: 10,
            connect_timeout_ms: 1_000,
        }
    }

    async fn read_json(reader: &mut BufReader<TcpStream>) -> serde_json::Value {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[test]
    fn test_params() {
        let mut params = HashMap::new();
        assert!(NetworkSubscriber::from_params("tcp", &params).is_err());

        params.insert("addr".to_string(), "127.0.0.1:9000".to_string());
        params.insert("backoff_ms".to_string(), "250".to_string());
        let subscriber = NetworkSubscriber::from_params("tcp", &params).unwrap();
        assert_eq!(subscriber.addr(), "127.0.0.1:9000");
        assert_eq!(subscriber.reconnect.backoff_ms, 250);
        assert_eq!(subscriber.reconnect.connect_timeout_ms, 10_000);

        params.insert("connect_timeout_ms".to_string(), "soon".to_string());
        let err = NetworkSubscriber::from_params("tcp", &params).err().unwrap();
        assert!(err.to_string().contains("connect_timeout_ms"));
    }

    #[tokio::test]
    async fn test_streams_json_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let mut subscriber = NetworkSubscriber::new("tcp", addr, quick_reconnect());

        subscriber.deliver(&result(1)).await.unwrap();
        subscriber.deliver(&result(2)).await.unwrap();

        let (stream, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(stream);
        assert_eq!(read_json(&mut reader).await["timestamp"], 1);
        let second = read_json(&mut reader).await;
        assert_eq!(second["timestamp"], 2);
        assert_eq!(second["euler_angles"][2], 90.0);
        assert_eq!(subscriber.connects(), 1);
    }

    #[tokio::test]
    async fn test_reconnects_after_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let mut subscriber = NetworkSubscriber::new("tcp", addr, quick_reconnect());

        subscriber.deliver(&result(1)).await.unwrap();
        subscriber.close().await.unwrap();
        subscriber.deliver(&result(2)).await.unwrap();

        let (first, _) = listener.accept().await.unwrap();
        let (second, _) = listener.accept().await.unwrap();
        assert_eq!(read_json(&mut BufReader::new(first)).await["timestamp"], 1);
        assert_eq!(read_json(&mut BufReader::new(second)).await["timestamp"], 2);
        assert_eq!(subscriber.connects(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_delivery_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut subscriber = NetworkSubscriber::new("tcp", addr, quick_reconnect());
        let err = subscriber.deliver(&result(1)).await.unwrap_err();
        assert!(matches!(err, ContractError::SubscriberDelivery { .. }));
    }
}
