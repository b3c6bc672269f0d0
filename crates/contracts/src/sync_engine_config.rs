//! Sync engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::SourceId;

pub(crate) const DEFAULT_MAX_SKEW_SECONDS: f64 = 0.2;
pub(crate) const DEFAULT_POLLING_INTERVAL_SECONDS: f64 = 0.05;

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEngineConfig {
    /// Source IDs in stable order (buffer i belongs to source_ids[i])
    pub source_ids: Vec<SourceId>,

    /// Index of the base (reference clock) source
    #[serde(default)]
    pub base_source_index: usize,

    /// Largest accepted |matched - base| distance in seconds
    #[serde(default = "default_max_skew_seconds")]
    pub max_skew_seconds: f64,

    /// Upper bound on every blocking wait (seconds)
    #[serde(default = "default_polling_interval_seconds")]
    pub polling_interval_seconds: f64,

    /// What a skew violation does to the coordinator
    #[serde(default)]
    pub skew_policy: SkewPolicy,
}

pub(crate) fn default_max_skew_seconds() -> f64 {
    DEFAULT_MAX_SKEW_SECONDS
}

pub(crate) fn default_polling_interval_seconds() -> f64 {
    DEFAULT_POLLING_INTERVAL_SECONDS
}

impl SyncEngineConfig {
    /// Config with `n` sources named `source0..source{n-1}`, base at index 0
    pub fn with_source_count(n: usize) -> Self {
        Self {
            source_ids: (0..n).map(SourceId::indexed).collect(),
            ..Self::default()
        }
    }

    pub fn source_count(&self) -> usize {
        self.source_ids.len()
    }

    /// Base source id, if the index is in range
    pub fn base_source_id(&self) -> Option<&SourceId> {
        self.source_ids.get(self.base_source_index)
    }

    /// Polling interval as a `Duration`; falls back to the default for
    /// negative or non-finite values.
    pub fn polling_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.polling_interval_seconds)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_millis(50))
    }

    /// Non-base source indices in stable order
    pub fn other_source_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.source_count()).filter(move |&i| i != self.base_source_index)
    }
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self {
            source_ids: vec![SourceId::indexed(0), SourceId::indexed(1)],
            base_source_index: 0,
            max_skew_seconds: DEFAULT_MAX_SKEW_SECONDS,
            polling_interval_seconds: DEFAULT_POLLING_INTERVAL_SECONDS,
            skew_policy: SkewPolicy::default(),
        }
    }
}

/// Reaction to a matched frame outside the skew tolerance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkewPolicy {
    /// Drop the entry, keep running
    #[default]
    SkipEntry,
    /// Flush the log and stop the coordinator with an error
    Abort,
}
