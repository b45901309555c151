//! Ingestion error types

use contracts::ContractError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Connection refused/reset, serial I/O failure
    #[error("transport error on {source_name}: {message}")]
    Transport {
        /// Source name
        source_name: String,
        /// Error message
        message: String,
    },

    /// Connect attempt exceeded its timeout
    #[error("connect to {source_name} timed out after {timeout_ms} ms")]
    ConnectTimeout {
        /// Source name
        source_name: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Malformed message or line
    #[error("failed to decode line: {message}")]
    Decode {
        /// Error message
        message: String,
    },

    /// Downstream channel closed
    #[error("channel closed for source {source_name}")]
    ChannelClosed {
        /// Source name
        source_name: String,
    },

    /// Source registered twice
    #[error("source {source_name} is already registered")]
    DuplicateSource {
        /// Source name
        source_name: String,
    },

    /// Adapters already running
    #[error("ingestion pipeline is already running")]
    AlreadyRunning,
}

impl IngestionError {
    pub(crate) fn transport(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Transport {
                source_name,
                message,
            } => ContractError::transport(source_name, message),
            IngestionError::ConnectTimeout {
                source_name,
                timeout_ms,
            } => ContractError::transport(
                source_name,
                format!("connect timed out after {timeout_ms} ms"),
            ),
            IngestionError::Decode { message } => ContractError::decode("<line>", message),
            other => ContractError::Other(other.to_string()),
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
