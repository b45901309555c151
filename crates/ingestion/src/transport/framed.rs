//! Newline-framed byte stream connection (tcp, serial)

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{IngestionError, Result};
use crate::framing::LineFramer;

use super::Connection;

const READ_CHUNK: usize = 4096;

/// Line reader over any async byte stream
pub struct FramedConnection<S> {
    source_name: String,
    stream: S,
    framer: LineFramer,
    eof: bool,
}

impl<S> FramedConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(source_name: impl Into<String>, stream: S) -> Self {
        Self {
            source_name: source_name.into(),
            stream,
            framer: LineFramer::new(),
            eof: false,
        }
    }
}

impl<S> Connection for FramedConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn next_line(&mut self) -> Result<Option<String>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.framer.next_line() {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(self.framer.finish());
            }

            let read = self
                .stream
                .read(&mut chunk)
                .await
                .map_err(|e| IngestionError::transport(&self.source_name, e))?;
            if read == 0 {
                self.eof = true;
            } else {
                self.framer.extend(&chunk[..read]);
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(source = %self.source_name, error = %e, "Stream shutdown failed");
        }
    }
}
