//! Error types for CLI operations.

use std::path::Path;

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration in {path}: {source}")]
    ConfigInvalid {
        path: String,
        #[source]
        source: ContractError,
    },

    /// A pipeline stage could not be built
    #[error("Failed to start {stage}: {message}")]
    Startup { stage: &'static str, message: String },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn config_invalid(path: &Path, source: ContractError) -> Self {
        Self::ConfigInvalid {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn startup(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Startup {
            stage,
            message: message.into(),
        }
    }
}

/// Load and validate a blueprint, mapping failures to [`CliError`]
pub fn load_blueprint(path: &Path) -> Result<contracts::PipelineBlueprint, CliError> {
    if !path.exists() {
        return Err(CliError::config_not_found(path));
    }
    config_loader::ConfigLoader::load_from_path(path)
        .map_err(|source| CliError::config_invalid(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_config() {
        let err = load_blueprint(Path::new("/nonexistent/relay.toml")).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { .. }));
        assert!(err.to_string().contains("/nonexistent/relay.toml"));
    }

    #[test]
    fn test_invalid_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "sources = []").unwrap();

        let err = load_blueprint(file.path()).unwrap_err();
        assert!(matches!(err, CliError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_startup_message() {
        let err = CliError::startup("distributor", "address in use");
        assert_eq!(err.to_string(), "Failed to start distributor: address in use");
    }
}
