//! Append-only log of aligned tuples, persisted once on shutdown.

use std::fs;
use std::path::{Path, PathBuf};

use contracts::{AlignedTuple, ContractError};
use tracing::info;

use crate::buffer::write_json_pretty;

/// Aligned tuples in emission order.
///
/// Only complete tuples are ever appended, so whatever is flushed is a valid
/// log up to the stop point.
#[derive(Debug)]
pub struct SyncedLog {
    path: PathBuf,
    entries: Vec<AlignedTuple>,
    flushed: bool,
}

impl SyncedLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            flushed: false,
        }
    }

    pub fn append(&mut self, tuple: AlignedTuple) {
        self.entries.push(tuple);
    }

    pub fn entries(&self) -> &[AlignedTuple] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Write the log as a pretty JSON array. Only the first successful call
    /// writes; a failed write leaves the log unflushed so it can be retried.
    ///
    /// Returns whether this call performed the write.
    pub fn flush(&mut self) -> Result<bool, ContractError> {
        if self.flushed {
            return Ok(false);
        }

        write_json_pretty(&self.path, &self.entries)?;
        self.flushed = true;
        info!(
            path = %self.path.display(),
            tuples = self.entries.len(),
            "Synced log written"
        );
        Ok(true)
    }

    /// Read a persisted log back.
    pub fn load(path: &Path) -> Result<Vec<AlignedTuple>, ContractError> {
        let display = path.display().to_string();
        let text =
            fs::read_to_string(path).map_err(|e| ContractError::persist(&display, e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| ContractError::persist(&display, e.to_string()))
    }
}
