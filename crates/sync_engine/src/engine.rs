//! Explicit owned graph of buffers, feeds, signal and coordinator.

use std::sync::Arc;

use contracts::{ContractError, SourceId, SyncEngineConfig};
use tracing::info;

use crate::buffer::TimeOrderedBuffer;
use crate::coordinator::SynchronizationCoordinator;
use crate::feed::SourceFeed;
use crate::signal::{LivenessSignal, ShutdownHandle};
use crate::synced_log::SyncedLog;

/// Multi-source alignment engine
///
/// Owns one buffer per configured source, created once here and never
/// recreated. Producers write through [`SourceFeed`]s; the single
/// [`SynchronizationCoordinator`] is obtained by consuming the engine.
#[derive(Debug)]
pub struct SyncEngine {
    config: SyncEngineConfig,
    /// Buffers in stable source order
    buffers: Vec<Arc<TimeOrderedBuffer>>,
    signal: Arc<LivenessSignal>,
    shutdown: ShutdownHandle,
}

impl SyncEngine {
    /// Build the engine graph.
    ///
    /// # Errors
    /// `ConfigValidation` for fewer than two sources or an out-of-range base index.
    pub fn new(config: SyncEngineConfig) -> Result<Self, ContractError> {
        if config.source_count() < 2 {
            return Err(ContractError::config_validation(
                "source_ids",
                format!("at least 2 sources are required, got {}", config.source_count()),
            ));
        }
        if config.base_source_index >= config.source_count() {
            return Err(ContractError::config_validation(
                "base_source_index",
                format!(
                    "base_source_index ({}) must be < source count ({})",
                    config.base_source_index,
                    config.source_count()
                ),
            ));
        }

        let buffers = config
            .source_ids
            .iter()
            .cloned()
            .map(|id| Arc::new(TimeOrderedBuffer::new(id)))
            .collect();
        let signal = Arc::new(LivenessSignal::new());
        let shutdown = ShutdownHandle::new(Arc::clone(&signal));

        info!(
            sources = config.source_count(),
            base = %config.source_ids[config.base_source_index],
            max_skew_s = config.max_skew_seconds,
            "Sync engine created"
        );

        Ok(Self {
            config,
            buffers,
            signal,
            shutdown,
        })
    }

    pub fn config(&self) -> &SyncEngineConfig {
        &self.config
    }

    pub fn source_ids(&self) -> &[SourceId] {
        &self.config.source_ids
    }

    /// Feed for the source at `index` in stable order
    pub fn feed(&self, index: usize) -> Option<SourceFeed> {
        let buffer = self.buffers.get(index)?;
        let signal = (index == self.config.base_source_index).then(|| Arc::clone(&self.signal));
        Some(SourceFeed::new(Arc::clone(buffer), signal))
    }

    /// Feeds for every source, in stable order
    pub fn feeds(&self) -> Vec<SourceFeed> {
        (0..self.buffers.len())
            .filter_map(|index| self.feed(index))
            .collect()
    }

    pub fn buffer(&self, index: usize) -> Option<&Arc<TimeOrderedBuffer>> {
        self.buffers.get(index)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Hand the buffers to the one coordinator that will consume them.
    pub fn into_coordinator(self, log: SyncedLog) -> SynchronizationCoordinator {
        let base_index = self.config.base_source_index;
        let base = Arc::clone(&self.buffers[base_index]);
        let others = self
            .config
            .other_source_indices()
            .map(|index| Arc::clone(&self.buffers[index]))
            .collect();

        SynchronizationCoordinator::new(
            self.config,
            base,
            others,
            self.signal,
            self.shutdown,
            log,
        )
    }
}
