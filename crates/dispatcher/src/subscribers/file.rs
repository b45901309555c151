//! FileSubscriber - appends publications as JSON lines to a session file

use chrono::{DateTime, Local};
use contracts::{ContractError, Publication, Subscriber};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Configuration for FileSubscriber
#[derive(Debug, Clone)]
pub struct FileSubscriberConfig {
    /// Output directory
    pub base_path: PathBuf,
    /// File name prefix
    pub prefix: String,
}

impl FileSubscriberConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./recordings"));
        let prefix = params
            .get("prefix")
            .cloned()
            .unwrap_or_else(|| "orientation".to_string());

        Self { base_path, prefix }
    }

    /// Session file name, stamped with the session start time
    pub fn session_file_name(&self, started_at: DateTime<Local>) -> String {
        format!("{}_{}.jsonl", self.prefix, started_at.format("%Y%m%d_%H%M%S"))
    }
}

/// Subscriber that records publications to disk
pub struct FileSubscriber {
    name: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    lines: u64,
}

impl FileSubscriber {
    /// Create a new FileSubscriber, opening the session file
    pub fn new(name: impl Into<String>, config: FileSubscriberConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;
        let path = config
            .base_path
            .join(config.session_file_name(Local::now()));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            name: name.into(),
            path,
            writer: Some(BufWriter::new(file)),
            lines: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, FileSubscriberConfig::from_params(params))
    }

    /// Session file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, publication: &Publication) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("file already closed"))?;
        serde_json::to_writer(&mut *writer, publication)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }
}

impl Subscriber for FileSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_subscriber_deliver",
        skip(self, publication),
        fields(subscriber = %self.name, timestamp = publication.timestamp())
    )]
    async fn deliver(&mut self, publication: &Publication) -> Result<(), ContractError> {
        self.append(publication)
            .map_err(|e| ContractError::delivery(&self.name, e.to_string()))
    }

    #[instrument(name = "file_subscriber_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::delivery(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_subscriber_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        debug!(
            subscriber = %self.name,
            path = %self.path.display(),
            lines = self.lines,
            "FileSubscriber closed"
        );
        Ok(())
    }
}
