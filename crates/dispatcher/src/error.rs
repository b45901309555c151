//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Subscriber creation error
    #[error("failed to create subscriber '{name}': {message}")]
    SubscriberCreation { name: String, message: String },

    /// Broadcast server could not bind
    #[error("failed to bind broadcast server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Subscriber error (from contract)
    #[error("subscriber error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a subscriber creation error
    pub fn subscriber_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SubscriberCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
