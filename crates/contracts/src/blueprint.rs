//! AlignerBlueprint - Config Loader output
//!
//! Describes a complete aligner run: sources, sync strategy and output.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::sync_engine_config::{default_max_skew_seconds, default_polling_interval_seconds};
use crate::{SkewPolicy, SourceId, SyncEngineConfig};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete aligner configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignerBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Sync strategy
    #[serde(default)]
    pub sync: SyncSettings,

    /// Output locations
    #[serde(default)]
    pub output: OutputConfig,

    /// Source definitions, in stable order
    pub sources: Vec<SourceConfig>,
}

/// Sync strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Maximum skew (seconds)
    #[serde(default = "default_max_skew_seconds")]
    pub max_skew_seconds: f64,

    /// Bounded wait interval (seconds)
    #[serde(default = "default_polling_interval_seconds")]
    pub polling_interval_seconds: f64,

    /// Index into `sources` of the reference clock
    #[serde(default)]
    pub base_source_index: usize,

    #[serde(default)]
    pub skew_policy: SkewPolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_skew_seconds: default_max_skew_seconds(),
            polling_interval_seconds: default_polling_interval_seconds(),
            base_source_index: 0,
            skew_policy: SkewPolicy::default(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Synced log written once on shutdown
    #[serde(default = "default_synced_log_path")]
    pub synced_log_path: PathBuf,

    /// Directory for per-source buffer snapshots (disabled when unset)
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
}

fn default_synced_log_path() -> PathBuf {
    PathBuf::from("synced_data.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            synced_log_path: default_synced_log_path(),
            snapshot_dir: None,
        }
    }
}

/// Source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique identifier
    pub id: String,

    /// Source type
    pub source_type: SourceType,

    /// Recording to replay (replay sources only)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Generator settings (synthetic sources only)
    #[serde(default)]
    pub synthetic: SyntheticSourceConfig,
}

/// Source type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Generated object-list records
    Synthetic,
    /// Records read back from a file
    Replay,
}

/// Synthetic generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSourceConfig {
    /// Nominal interval between frames (seconds)
    pub period_s: f64,

    /// Uniform jitter added to every timestamp, in `[-jitter_s, jitter_s]`
    pub jitter_s: f64,

    /// Constant clock offset of this source (seconds)
    pub offset_s: f64,

    /// Stop after this many records
    pub max_records: Option<u64>,

    /// Sleep `period_s` between records
    pub realtime: bool,

    /// RNG seed for reproducible runs
    pub seed: Option<u64>,

    /// Timestamp of the first frame (defaults to now)
    pub start_time: Option<String>,

    pub objects_per_frame: u32,
}

impl Default for SyntheticSourceConfig {
    fn default() -> Self {
        Self {
            period_s: 0.1,
            jitter_s: 0.02,
            offset_s: 0.0,
            max_records: None,
            realtime: true,
            seed: None,
            start_time: None,
            objects_per_frame: 3,
        }
    }
}

impl AlignerBlueprint {
    /// Build the runtime SyncEngineConfig
    pub fn to_sync_engine_config(&self) -> SyncEngineConfig {
        SyncEngineConfig {
            source_ids: self.source_ids(),
            base_source_index: self.sync.base_source_index,
            max_skew_seconds: self.sync.max_skew_seconds,
            polling_interval_seconds: self.sync.polling_interval_seconds,
            skew_policy: self.sync.skew_policy,
        }
    }

    pub fn source_ids(&self) -> Vec<SourceId> {
        self.sources
            .iter()
            .map(|source| SourceId::from(source.id.as_str()))
            .collect()
    }

    /// Base source config, if the index is in range
    pub fn base_source(&self) -> Option<&SourceConfig> {
        self.sources.get(self.sync.base_source_index)
    }
}
