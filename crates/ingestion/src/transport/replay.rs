//! Recorded file replay
//!
//! Feeds a newline-delimited capture back at a fixed pace. End of file ends
//! the session like a disconnect.

use std::path::PathBuf;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::error::{IngestionError, Result};

use super::{Connection, Connector};

#[derive(Debug, Clone)]
pub struct ReplayConnector {
    source_name: String,
    path: PathBuf,
    interval: Duration,
}

impl ReplayConnector {
    pub fn new(source_name: impl Into<String>, path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            source_name: source_name.into(),
            path: path.into(),
            interval,
        }
    }
}

impl Connector for ReplayConnector {
    type Conn = ReplayConnection;

    fn endpoint(&self) -> String {
        format!("file://{}", self.path.display())
    }

    async fn connect(&mut self) -> Result<Self::Conn> {
        let file = File::open(&self.path)
            .await
            .map_err(|e| IngestionError::transport(&self.source_name, e))?;
        Ok(ReplayConnection {
            source_name: self.source_name.clone(),
            lines: BufReader::new(file).lines(),
            interval: self.interval,
            started: false,
        })
    }
}

pub struct ReplayConnection {
    source_name: String,
    lines: Lines<BufReader<File>>,
    interval: Duration,
    started: bool,
}

impl Connection for ReplayConnection {
    async fn next_line(&mut self) -> Result<Option<String>> {
        if self.started && !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
        self.started = true;

        self.lines
            .next_line()
            .await
            .map_err(|e| IngestionError::transport(&self.source_name, e))
    }

    async fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_replays_file_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first").unwrap();
        writeln!(file, "second").unwrap();

        let mut connector = ReplayConnector::new("replay", file.path(), Duration::ZERO);
        let mut conn = connector.connect().await.unwrap();

        assert_eq!(conn.next_line().await.unwrap().as_deref(), Some("first"));
        assert_eq!(conn.next_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(conn.next_line().await.unwrap(), None);

        // a second session starts over
        let mut again = connector.connect().await.unwrap();
        assert_eq!(again.next_line().await.unwrap().as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_missing_file_is_transport_error() {
        let mut connector =
            ReplayConnector::new("replay", "/nonexistent/capture.jsonl", Duration::ZERO);
        assert!(connector.connect().await.is_err());
    }
}
