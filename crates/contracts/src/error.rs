//! Layered error definitions
//!
//! Categorized by source: config / transport / decode / delivery

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// Connection refused/reset, serial I/O failure
    #[error("transport error on '{source_name}': {message}")]
    Transport {
        source_name: String,
        message: String,
    },

    /// Malformed message or line
    #[error("decode error on '{source_name}': {message}")]
    Decode {
        source_name: String,
        message: String,
    },

    // ===== Delivery Errors =====
    /// Subscriber delivery error
    #[error("subscriber '{subscriber}' delivery error: {message}")]
    SubscriberDelivery { subscriber: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create decode error
    pub fn decode(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create subscriber delivery error
    pub fn delivery(subscriber: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SubscriberDelivery {
            subscriber: subscriber.into(),
            message: message.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ContractError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("invalid value for {field}"));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("<unknown>".to_string(), errors.to_string()));

        Self::ConfigValidation { field, message }
    }
}
