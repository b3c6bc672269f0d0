//! Ingestion error types

use contracts::ContractError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Raw record could not be turned into a frame
    #[error("failed to parse record {sequence} from {source_id}: {message}")]
    ParseFailed {
        source_id: String,
        sequence: u64,
        message: String,
    },

    /// The record source itself failed
    #[error("record source {source_id} failed")]
    Source {
        source_id: String,
        #[source]
        error: ContractError,
    },

    /// Producer thread could not be started
    #[error("failed to spawn producer for {source_id}")]
    Spawn {
        source_id: String,
        #[source]
        error: std::io::Error,
    },

    /// Pipeline was already started
    #[error("ingestion pipeline is already running")]
    AlreadyRunning,
}

impl IngestionError {
    pub(crate) fn parse_failed(
        source_id: &str,
        sequence: u64,
        message: impl Into<String>,
    ) -> Self {
        Self::ParseFailed {
            source_id: source_id.to_string(),
            sequence,
            message: message.into(),
        }
    }
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
