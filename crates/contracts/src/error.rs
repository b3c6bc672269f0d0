//! Layered error definitions
//!
//! Categorized by source: config / buffer / alignment / persistence

use thiserror::Error;

use crate::Timestamp;

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

    // ===== Buffer Errors =====
    /// A frame older than the buffer's newest frame was offered
    #[error("ordering violation on '{source_id}': frame at {timestamp} is older than last stored {last}")]
    OrderingViolation {
        source_id: String,
        timestamp: Timestamp,
        last: Timestamp,
    },

    /// Prefix consumption asked for an index past the end of the buffer
    #[error("index {index} out of range for '{source_id}' (len={len})")]
    IndexOutOfRange {
        source_id: String,
        index: usize,
        len: usize,
    },

    // ===== Alignment Errors =====
    /// Matched frame lies too far from the base frame
    #[error("skew exceeded on '{source_id}' for entry {entry}: {skew_s:.3}s > {max_skew_s:.3}s")]
    SkewExceeded {
        source_id: String,
        entry: Timestamp,
        skew_s: f64,
        max_skew_s: f64,
    },

    /// Timestamp text could not be parsed
    #[error("invalid timestamp '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },

    // ===== Persistence Errors =====
    /// Failed to write or read a persisted log/snapshot
    #[error("persist error for '{path}': {message}")]
    Persist { path: String, message: String },

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

    /// Create ordering violation error
    pub fn ordering_violation(
        source_id: impl Into<String>,
        timestamp: Timestamp,
        last: Timestamp,
    ) -> Self {
        Self::OrderingViolation {
            source_id: source_id.into(),
            timestamp,
            last,
        }
    }

    /// Create index out of range error
    pub fn index_out_of_range(source_id: impl Into<String>, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            source_id: source_id.into(),
            index,
            len,
        }
    }

    /// Create persistence error
    pub fn persist(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persist {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Transient conditions a producer may log and move past.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::OrderingViolation { .. } | Self::SkewExceeded { .. }
        )
    }
}
