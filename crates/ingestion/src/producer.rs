//! One producer: source → parser → sink

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{ContractError, FrameSink, RecordSource, SourceId};
use metrics::counter;
use tracing::{debug, error, info, warn};

use crate::config::IngestionMetrics;
use crate::parser::RecordParser;

/// How a producer ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerExit {
    /// Source returned end of stream
    Exhausted,
    /// Stop was requested
    Stopped,
    /// Source or sink failed with an unrecoverable error
    Failed(String),
}

/// Per-producer outcome returned by `IngestionPipeline::join`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerReport {
    pub source_id: SourceId,
    pub records: u64,
    pub frames: u64,
    pub parse_failures: u64,
    pub ordering_violations: u64,
    pub exit: ProducerExit,
}

impl ProducerReport {
    fn new(source_id: SourceId) -> Self {
        Self {
            source_id,
            records: 0,
            frames: 0,
            parse_failures: 0,
            ordering_violations: 0,
            exit: ProducerExit::Stopped,
        }
    }
}

/// Pulls records from one source and pushes parsed frames into its sink.
///
/// Unparseable records and out-of-order frames are dropped and counted.
pub struct Producer {
    source: Box<dyn RecordSource>,
    parser: Arc<dyn RecordParser>,
    sink: Arc<dyn FrameSink>,
    stop: Arc<AtomicBool>,
    metrics: Arc<IngestionMetrics>,
}

impl Producer {
    pub fn new(
        source: Box<dyn RecordSource>,
        parser: Arc<dyn RecordParser>,
        sink: Arc<dyn FrameSink>,
        stop: Arc<AtomicBool>,
        metrics: Arc<IngestionMetrics>,
    ) -> Self {
        Self {
            source,
            parser,
            sink,
            stop,
            metrics,
        }
    }

    pub fn source_id(&self) -> &SourceId {
        self.source.source_id()
    }

    /// Run until the source is exhausted, a stop is requested or something
    /// unrecoverable happens.
    pub fn run(mut self) -> ProducerReport {
        let source_id = self.source.source_id().clone();
        let mut report = ProducerReport::new(source_id.clone());
        info!(source_id = %source_id, sink = %self.sink.source_id(), "Producer started");

        loop {
            if self.stop.load(Ordering::Relaxed) {
                report.exit = ProducerExit::Stopped;
                break;
            }

            let record = match self.source.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => {
                    report.exit = ProducerExit::Exhausted;
                    break;
                }
                Err(err) => {
                    error!(source_id = %source_id, error = %err, "Record source failed");
                    report.exit = ProducerExit::Failed(err.to_string());
                    break;
                }
            };

            // A stop observed here means the record arrived after shutdown began
            if self.stop.load(Ordering::Relaxed) {
                report.exit = ProducerExit::Stopped;
                break;
            }

            report.records += 1;
            self.metrics.record_received();
            counter!(
                "stream_aligner_records_received_total",
                "source_id" => source_id.to_string()
            )
            .increment(1);

            let frame = match self.parser.parse(&source_id, &record) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(source_id = %source_id, error = %err, "Dropping unparseable record");
                    report.parse_failures += 1;
                    self.metrics.record_parse_failure();
                    counter!(
                        "stream_aligner_parse_failures_total",
                        "source_id" => source_id.to_string()
                    )
                    .increment(1);
                    continue;
                }
            };

            match self.sink.push(frame) {
                Ok(()) => {
                    report.frames += 1;
                    self.metrics.record_pushed();
                }
                Err(err @ ContractError::OrderingViolation { .. }) => {
                    debug!(source_id = %source_id, error = %err, "Frame rejected by sink");
                    report.ordering_violations += 1;
                    self.metrics.record_ordering_violation();
                }
                Err(err) => {
                    error!(source_id = %source_id, error = %err, "Sink failed");
                    report.exit = ProducerExit::Failed(err.to_string());
                    break;
                }
            }
        }

        info!(
            source_id = %source_id,
            records = report.records,
            frames = report.frames,
            parse_failures = report.parse_failures,
            ordering_violations = report.ordering_violations,
            exit = ?report.exit,
            "Producer finished"
        );
        report
    }
}
