//! Scripted transport for tests
//!
//! A [`MockConnector`] plays back a list of sessions. Each connect attempt
//! consumes the next session; once the script is exhausted every further
//! attempt is refused.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{IngestionError, Result};
use crate::transport::{Connection, Connector};

/// How a scripted session ends once its lines are exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Clean end of stream
    Eof,
    /// Connection reset
    Reset,
    /// Stay connected without data until closed
    Hold,
}

/// One scripted connect outcome
#[derive(Debug, Clone)]
pub enum MockSession {
    /// Connect attempt fails
    Refuse(String),
    /// Connect attempt hangs past any timeout
    Stall,
    /// Connect succeeds and yields `lines`, one per `line_delay`
    Stream {
        lines: Vec<String>,
        line_delay: Duration,
        end: SessionEnd,
    },
}

impl MockSession {
    /// Session yielding `lines` without delay
    pub fn lines<I, S>(lines: I, end: SessionEnd) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stream {
            lines: lines.into_iter().map(Into::into).collect(),
            line_delay: Duration::ZERO,
            end,
        }
    }
}

/// Observations shared between a connector and the test
#[derive(Debug, Default)]
pub struct MockProbe {
    attempts: Mutex<Vec<Instant>>,
    closes: AtomicU64,
}

impl MockProbe {
    /// Instants of every connect attempt
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of connect attempts
    pub fn attempt_count(&self) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of connections explicitly closed
    pub fn close_count(&self) -> u64 {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Scripted connector
#[derive(Debug)]
pub struct MockConnector {
    source_name: String,
    script: VecDeque<MockSession>,
    probe: Arc<MockProbe>,
}

impl MockConnector {
    pub fn new(source_name: impl Into<String>, script: Vec<MockSession>) -> Self {
        Self {
            source_name: source_name.into(),
            script: script.into(),
            probe: Arc::new(MockProbe::default()),
        }
    }

    /// Handle for inspecting attempts and closes
    pub fn probe(&self) -> Arc<MockProbe> {
        self.probe.clone()
    }
}

impl Connector for MockConnector {
    type Conn = MockConnection;

    fn endpoint(&self) -> String {
        format!("mock://{}", self.source_name)
    }

    async fn connect(&mut self) -> Result<Self::Conn> {
        self.probe
            .attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Instant::now());

        match self.script.pop_front() {
            None => Err(IngestionError::transport(
                &self.source_name,
                "script exhausted",
            )),
            Some(MockSession::Refuse(message)) => {
                Err(IngestionError::transport(&self.source_name, message))
            }
            Some(MockSession::Stall) => {
                std::future::pending::<()>().await;
                Err(IngestionError::transport(&self.source_name, "stalled"))
            }
            Some(MockSession::Stream {
                lines,
                line_delay,
                end,
            }) => Ok(MockConnection {
                source_name: self.source_name.clone(),
                lines: lines.into(),
                line_delay,
                end,
                probe: self.probe.clone(),
            }),
        }
    }
}

/// Scripted connection
#[derive(Debug)]
pub struct MockConnection {
    source_name: String,
    lines: VecDeque<String>,
    line_delay: Duration,
    end: SessionEnd,
    probe: Arc<MockProbe>,
}

impl Connection for MockConnection {
    async fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.lines.pop_front() {
            if !self.line_delay.is_zero() {
                tokio::time::sleep(self.line_delay).await;
            }
            return Ok(Some(line));
        }

        match self.end {
            SessionEnd::Eof => Ok(None),
            SessionEnd::Reset => Err(IngestionError::transport(
                &self.source_name,
                "connection reset by peer",
            )),
            SessionEnd::Hold => {
                std::future::pending::<()>().await;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
    }
}
