//! Pipeline orchestrator - wires sources, producers and the coordinator.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::AlignerBlueprint;
use ingestion::IngestionPipeline;
use sync_engine::{SyncEngine, SyncedLog, TimeOrderedBuffer};
use tracing::{debug, info, warn};

use super::{PipelineStats, StopReason};
use crate::error::CliError;

/// Consecutive unchanged base-depth polls, after every producer finished,
/// before the run is treated as drained.
const DRAIN_STALL_POLLS: u32 = 10;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blueprint: AlignerBlueprint,

    /// Stop after this many tuples (None = unlimited)
    pub max_tuples: Option<usize>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the timeout elapses, the tuple limit is
    /// reached or every source is exhausted and drained.
    ///
    /// Shutdown order: producers stop, then the coordinator stops and
    /// flushes its log.
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Sync engine
        let sync_config = blueprint.to_sync_engine_config();
        let polling_interval = sync_config.polling_interval();
        let engine = SyncEngine::new(sync_config).context("Failed to build sync engine")?;
        let base_buffer = engine
            .buffer(blueprint.sync.base_source_index)
            .cloned()
            .context("Base source buffer missing")?;

        // Ingestion
        let mut ingestion = IngestionPipeline::new();
        for (source_config, feed) in blueprint.sources.iter().zip(engine.feeds()) {
            let source = ingestion::sources::from_config(source_config)
                .with_context(|| format!("Failed to open source {}", source_config.id))?;
            ingestion.register(source, Arc::new(feed));
        }
        info!(sources = ingestion.source_count(), "Ingestion pipeline configured");

        let shutdown_handle = engine.shutdown_handle();
        let coordinator = engine
            .into_coordinator(SyncedLog::new(&blueprint.output.synced_log_path))
            .with_snapshot_dir(blueprint.output.snapshot_dir.clone())
            .with_max_tuples(self.config.max_tuples);

        let mut coordinator_task = tokio::task::spawn_blocking(move || {
            let mut coordinator = coordinator;
            coordinator.run()
        });

        if let Err(e) = ingestion.start() {
            shutdown_handle.request_stop();
            return Err(e).context("Failed to start producers");
        }
        info!(max_tuples = ?self.config.max_tuples, timeout = ?self.config.timeout, "Pipeline running");

        let timeout = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        let mut finished = None;
        let stop_reason = tokio::select! {
            result = &mut coordinator_task => {
                finished = Some(result);
                StopReason::CoordinatorFinished
            }
            _ = shutdown => StopReason::Signal,
            _ = timeout => {
                warn!(timeout = ?self.config.timeout, "Pipeline timed out");
                StopReason::Timeout
            }
            _ = wait_for_drain(&ingestion, &base_buffer, polling_interval) => StopReason::SourcesExhausted,
        };
        info!(reason = %stop_reason, "Shutting down pipeline...");

        // 1. producers stop accepting records
        ingestion.stop();
        let metrics = ingestion.metrics();
        let producers = tokio::task::spawn_blocking(move || ingestion.join())
            .await
            .map_err(|e| CliError::coordinator(format!("producer join failed: {e}")))?;

        // 2. coordinator abandons its entry and 3. flushes once
        shutdown_handle.request_stop();
        let joined = match finished {
            Some(result) => result,
            None => coordinator_task.await,
        };
        let report = joined
            .map_err(|e| CliError::coordinator(e.to_string()))?
            .context("Coordinator failed")?;

        let duration = start_time.elapsed();
        info!(
            tuples = report.tuples,
            log = %report.log_path.display(),
            duration_secs = duration.as_secs_f64(),
            "Pipeline shutdown complete"
        );

        Ok(PipelineStats {
            report,
            producers,
            ingestion: metrics.snapshot(),
            stop_reason,
            duration,
        })
    }
}

/// Resolves once every producer has returned and the base buffer stopped
/// shrinking, i.e. the coordinator has consumed everything it can match.
async fn wait_for_drain(
    ingestion: &IngestionPipeline,
    base: &TimeOrderedBuffer,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    let mut last_depth = None;
    let mut stalled = 0;

    loop {
        ticker.tick().await;
        if !ingestion.is_finished() {
            continue;
        }

        let depth = base.len();
        if last_depth == Some(depth) {
            stalled += 1;
        } else {
            stalled = 0;
        }
        last_depth = Some(depth);

        if stalled >= DRAIN_STALL_POLLS {
            debug!(remaining = depth, "Sources exhausted and base buffer drained");
            return;
        }
    }
}
