//! Ingestion Pipeline main entry

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use contracts::{FrameSink, RecordSource, SourceId};
use tracing::{debug, error, info, instrument};

use crate::config::IngestionMetrics;
use crate::error::{IngestionError, Result};
use crate::parser::{ObjectListParser, RecordParser};
use crate::producer::{Producer, ProducerExit, ProducerReport};

struct Registration {
    source: Box<dyn RecordSource>,
    sink: Arc<dyn FrameSink>,
}

/// Ingestion Pipeline
///
/// Runs one named producer thread per registered source. All producers share
/// a parser, a stop flag and the metrics counters.
pub struct IngestionPipeline {
    pending: Vec<Registration>,
    running: Vec<(SourceId, JoinHandle<ProducerReport>)>,
    parser: Arc<dyn RecordParser>,
    stop: Arc<AtomicBool>,
    metrics: Arc<IngestionMetrics>,
    started: bool,
}

impl IngestionPipeline {
    /// Pipeline parsing the object-list wire format
    pub fn new() -> Self {
        Self::with_parser(Arc::new(ObjectListParser))
    }

    pub fn with_parser(parser: Arc<dyn RecordParser>) -> Self {
        Self {
            pending: Vec::new(),
            running: Vec::new(),
            parser,
            stop: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(IngestionMetrics::new()),
            started: false,
        }
    }

    /// Register a source and the sink its frames go to
    #[instrument(
        name = "ingestion_register",
        skip(self, source, sink),
        fields(source_id = %source.source_id())
    )]
    pub fn register(&mut self, source: Box<dyn RecordSource>, sink: Arc<dyn FrameSink>) {
        debug!(sink = %sink.source_id(), "registered record source");
        self.pending.push(Registration { source, sink });
    }

    /// Spawn one producer thread per registered source.
    ///
    /// # Errors
    /// `AlreadyRunning` on a second call, `Spawn` if a thread cannot be
    /// created. Producers spawned before a failure keep running until
    /// [`stop`](Self::stop).
    #[instrument(name = "ingestion_start", skip(self))]
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(IngestionError::AlreadyRunning);
        }
        self.started = true;

        info!(count = self.pending.len(), "starting producers");
        for Registration { source, sink } in self.pending.drain(..) {
            let source_id = source.source_id().clone();
            let producer = Producer::new(
                source,
                Arc::clone(&self.parser),
                sink,
                Arc::clone(&self.stop),
                Arc::clone(&self.metrics),
            );
            let handle = thread::Builder::new()
                .name(format!("producer-{source_id}"))
                .spawn(move || producer.run())
                .map_err(|error| IngestionError::Spawn {
                    source_id: source_id.to_string(),
                    error,
                })?;
            self.running.push((source_id, handle));
        }
        Ok(())
    }

    /// Ask every producer to stop after its current record
    pub fn stop(&self) {
        if !self.stop.swap(true, Ordering::SeqCst) {
            info!(count = self.running.len(), "stopping producers");
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Whether every started producer has returned
    pub fn is_finished(&self) -> bool {
        self.running.iter().all(|(_, handle)| handle.is_finished())
    }

    /// Wait for all producers and collect their reports.
    ///
    /// Does not request a stop; call [`stop`](Self::stop) first for
    /// unbounded sources.
    pub fn join(&mut self) -> Vec<ProducerReport> {
        self.running
            .drain(..)
            .map(|(source_id, handle)| {
                handle.join().unwrap_or_else(|_| {
                    error!(source_id = %source_id, "Producer thread panicked");
                    ProducerReport {
                        source_id,
                        records: 0,
                        frames: 0,
                        parse_failures: 0,
                        ordering_violations: 0,
                        exit: ProducerExit::Failed("producer thread panicked".to_string()),
                    }
                })
            })
            .collect()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Registered plus running producers
    pub fn source_count(&self) -> usize {
        self.pending.len() + self.running.len()
    }
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}
