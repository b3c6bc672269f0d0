//! The single consumer: drains base frames and aligns the other sources.
//!
//! One call to [`SynchronizationCoordinator::step`] runs one full
//! `Idle -> Draining -> Matching -> Idle` cycle, or moves to `Stopped`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use contracts::{
    skew_seconds, AlignedTuple, ContractError, Frame, SkewPolicy, SourceId, SyncEngineConfig,
    Timestamp,
};
use observability::{AlignmentStatsAggregator, AlignmentSummary};
use tracing::{debug, error, info, instrument, warn};

use crate::buffer::TimeOrderedBuffer;
use crate::signal::{LivenessSignal, ShutdownHandle};
use crate::synced_log::SyncedLog;

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Waiting for the liveness signal
    Idle,
    /// Taking the next base frame
    Draining,
    /// Resolving the other sources against the entry
    Matching,
    /// Log flushed, no further buffer reads
    Stopped,
}

/// Result of one coordinator step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// No signal within one polling interval
    Waiting,
    /// Signalled, but the base buffer was empty
    NoData,
    /// Tuple appended to the log
    Aligned,
    /// Entry dropped; `source_id` matched too far from the base frame
    SkewRejected { source_id: SourceId, skew_s: f64 },
    /// Coordinator has stopped
    Stopped,
}

/// End-of-run report
#[derive(Debug, Clone)]
pub struct CoordinatorReport {
    pub tuples: usize,
    pub log_path: PathBuf,
    pub flushed: bool,
    pub summary: AlignmentSummary,
}

/// Consumer side of the engine.
///
/// Built by [`SyncEngine::into_coordinator`](crate::SyncEngine::into_coordinator);
/// there is exactly one per engine.
#[derive(Debug)]
pub struct SynchronizationCoordinator {
    config: SyncEngineConfig,
    base: Arc<TimeOrderedBuffer>,
    /// Non-base buffers in stable source order
    others: Vec<Arc<TimeOrderedBuffer>>,
    signal: Arc<LivenessSignal>,
    shutdown: ShutdownHandle,
    log: SyncedLog,
    snapshot_dir: Option<PathBuf>,
    max_tuples: Option<usize>,
    state: CoordinatorState,
    stats: AlignmentStatsAggregator,
}

impl SynchronizationCoordinator {
    pub(crate) fn new(
        config: SyncEngineConfig,
        base: Arc<TimeOrderedBuffer>,
        others: Vec<Arc<TimeOrderedBuffer>>,
        signal: Arc<LivenessSignal>,
        shutdown: ShutdownHandle,
        log: SyncedLog,
    ) -> Self {
        Self {
            config,
            base,
            others,
            signal,
            shutdown,
            log,
            snapshot_dir: None,
            max_tuples: None,
            state: CoordinatorState::Idle,
            stats: AlignmentStatsAggregator::new(),
        }
    }

    /// Persist remaining buffer contents to `dir/buffer_<source>.json` on stop
    pub fn with_snapshot_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.snapshot_dir = dir;
        self
    }

    /// Request a stop once the log holds `max` tuples
    pub fn with_max_tuples(mut self, max: Option<usize>) -> Self {
        self.max_tuples = max;
        self
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn log(&self) -> &SyncedLog {
        &self.log
    }

    pub fn stats(&self) -> &AlignmentStatsAggregator {
        &self.stats
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Step until stopped.
    ///
    /// # Errors
    /// `IndexOutOfRange`, a skew violation under [`SkewPolicy::Abort`], or a
    /// failed flush. The log is flushed before any of these is returned.
    pub fn run(&mut self) -> Result<CoordinatorReport, ContractError> {
        info!(
            base = %self.base.source_id(),
            others = self.others.len(),
            max_skew_s = self.config.max_skew_seconds,
            policy = ?self.config.skew_policy,
            "Coordinator started"
        );

        while self.step()? != StepOutcome::Stopped {}

        Ok(self.report())
    }

    /// Stop and flush. Safe to call repeatedly; only the first successful
    /// flush writes, so a failed one is retried by the next call.
    ///
    /// Returns whether this call flushed the log.
    pub fn stop(&mut self) -> Result<bool, ContractError> {
        self.shutdown.request_stop();
        self.enter_stopped()
    }

    pub fn report(&self) -> CoordinatorReport {
        CoordinatorReport {
            tuples: self.log.len(),
            log_path: self.log.path().to_path_buf(),
            flushed: self.log.is_flushed(),
            summary: self.stats.summary(),
        }
    }

    /// Run one alignment cycle.
    #[instrument(level = "debug", name = "coordinator_step", skip(self))]
    pub fn step(&mut self) -> Result<StepOutcome, ContractError> {
        if self.state == CoordinatorState::Stopped {
            return Ok(StepOutcome::Stopped);
        }
        if self.shutdown.is_requested() {
            return self.stopped();
        }

        // Idle
        self.state = CoordinatorState::Idle;
        let signalled = self.signal.wait_and_clear(self.polling_interval());
        if self.shutdown.is_requested() {
            return self.stopped();
        }
        if !signalled {
            return Ok(StepOutcome::Waiting);
        }

        // Draining
        self.state = CoordinatorState::Draining;
        let Some(entry) = self.base.pop_front() else {
            self.state = CoordinatorState::Idle;
            thread::sleep(self.polling_interval());
            return Ok(StepOutcome::NoData);
        };
        observability::record_buffer_depth(self.base.source_id(), self.base.len());

        // Matching
        self.state = CoordinatorState::Matching;
        let entry_time = entry.timestamp;
        let mut matched = Vec::with_capacity(self.others.len());
        for pos in 0..self.others.len() {
            let buffer = Arc::clone(&self.others[pos]);
            match self.match_source(&buffer, &entry_time) {
                Ok(Some(frame)) => matched.push(frame),
                Ok(None) => {
                    debug!(entry = %entry_time, "Stop requested while matching, entry abandoned");
                    return self.stopped();
                }
                Err(err) => return Err(self.fail(err)),
            }
        }

        self.validate_and_emit(entry, matched)
    }

    /// Wait for `buffer` to cover `entry_time`, then consume through the
    /// nearest frame. `None` if a stop arrives first.
    fn match_source(
        &mut self,
        buffer: &TimeOrderedBuffer,
        entry_time: &Timestamp,
    ) -> Result<Option<Frame>, ContractError> {
        let interval = self.polling_interval();
        loop {
            if self.shutdown.is_requested() {
                return Ok(None);
            }
            if !buffer.wait_for_frontier(entry_time, interval) {
                continue;
            }
            let Some(index) = buffer.find_closest_index(entry_time) else {
                continue;
            };

            let frame = buffer.consume_prefix_through(index)?;
            observability::record_frames_discarded(buffer.source_id(), index);
            observability::record_buffer_depth(buffer.source_id(), buffer.len());
            self.stats.record_discarded(index);
            return Ok(Some(frame));
        }
    }

    fn validate_and_emit(
        &mut self,
        entry: Frame,
        matched: Vec<Frame>,
    ) -> Result<StepOutcome, ContractError> {
        let entry_time = entry.timestamp;
        let max_skew_s = self.config.max_skew_seconds;
        let skews: Vec<f64> = matched
            .iter()
            .map(|frame| skew_seconds(&entry_time, &frame.timestamp))
            .collect();

        if let Some((pos, &skew_s)) = skews.iter().enumerate().find(|(_, s)| **s > max_skew_s) {
            let source_id = self.others[pos].source_id().clone();
            observability::record_skew_rejected(&source_id);
            self.stats.record_rejection(&source_id);

            let err = ContractError::SkewExceeded {
                source_id: source_id.to_string(),
                entry: entry_time,
                skew_s,
                max_skew_s,
            };

            return match self.config.skew_policy {
                SkewPolicy::SkipEntry => {
                    warn!(error = %err, "Entry skipped");
                    self.state = CoordinatorState::Idle;
                    self.rearm_if_backlog();
                    Ok(StepOutcome::SkewRejected { source_id, skew_s })
                }
                SkewPolicy::Abort => {
                    error!(error = %err, "Aborting alignment");
                    Err(self.fail(err))
                }
            };
        }

        let labelled = self
            .others
            .iter()
            .map(|buffer| buffer.source_id().as_str())
            .zip(skews.iter().copied());
        observability::record_aligned_tuple(labelled.clone());
        self.stats.record_tuple(labelled);

        self.log.append(AlignedTuple::new(entry, matched));
        self.state = CoordinatorState::Idle;
        self.rearm_if_backlog();
        debug!(entry = %entry_time, tuples = self.log.len(), "Tuple aligned");

        if let Some(max) = self.max_tuples {
            if self.log.len() >= max && self.shutdown.request_stop() {
                info!(max_tuples = max, "Tuple limit reached, stopping");
            }
        }

        Ok(StepOutcome::Aligned)
    }

    /// Raises coalesce, so base frames that arrived during matching would
    /// otherwise wait for the next push.
    fn rearm_if_backlog(&self) {
        if !self.base.is_empty() {
            self.signal.raise();
        }
    }

    fn stopped(&mut self) -> Result<StepOutcome, ContractError> {
        self.enter_stopped()?;
        Ok(StepOutcome::Stopped)
    }

    /// Flush on the way out of a fatal error; the triggering error wins.
    fn fail(&mut self, err: ContractError) -> ContractError {
        if let Err(flush_err) = self.enter_stopped() {
            error!(error = %flush_err, "Failed to flush synced log after fatal error");
        }
        err
    }

    fn enter_stopped(&mut self) -> Result<bool, ContractError> {
        self.state = CoordinatorState::Stopped;
        self.shutdown.request_stop();

        let flushed = self.log.flush()?;
        if flushed {
            if let Some(dir) = self.snapshot_dir.clone() {
                self.persist_snapshots(&dir);
            }
            info!(
                tuples = self.log.len(),
                rejections = self.stats.skew_rejections,
                "Coordinator stopped"
            );
        }
        Ok(flushed)
    }

    fn persist_snapshots(&self, dir: &Path) {
        for buffer in std::iter::once(&self.base).chain(self.others.iter()) {
            let path = dir.join(format!("buffer_{}.json", buffer.source_id()));
            if let Err(err) = buffer.persist(&path) {
                warn!(source_id = %buffer.source_id(), error = %err, "Buffer snapshot failed");
            }
        }
    }

    fn polling_interval(&self) -> Duration {
        self.config.polling_interval()
    }
}
