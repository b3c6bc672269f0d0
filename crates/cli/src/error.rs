//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Command-line override rejected by validation
    #[error("Invalid override --{flag}: {message}")]
    InvalidOverride { flag: String, message: String },

    /// Coordinator thread did not return a report
    #[error("Coordinator task failed: {message}")]
    Coordinator { message: String },

    /// Synced log could not be read back
    #[error("Failed to read synced log {path}: {message}")]
    LogRead { path: String, message: String },
}

impl CliError {
    pub fn config_not_found(path: &std::path::Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn invalid_override(flag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOverride {
            flag: flag.into(),
            message: message.into(),
        }
    }

    pub fn coordinator(message: impl Into<String>) -> Self {
        Self::Coordinator {
            message: message.into(),
        }
    }

    pub fn log_read(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::LogRead {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}
