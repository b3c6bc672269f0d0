//! Pipeline statistics.

use std::fmt;
use std::time::Duration;

use ingestion::{MetricsSnapshot, ProducerExit, ProducerReport};
use sync_engine::CoordinatorReport;

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Ctrl+C or SIGTERM
    Signal,
    Timeout,
    /// Coordinator returned on its own (tuple limit or abort)
    CoordinatorFinished,
    /// Every source ended and the base buffer drained
    SourcesExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Signal => "signal",
            Self::Timeout => "timeout",
            Self::CoordinatorFinished => "coordinator finished",
            Self::SourcesExhausted => "sources exhausted",
        };
        f.write_str(text)
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub report: CoordinatorReport,
    pub producers: Vec<ProducerReport>,
    pub ingestion: MetricsSnapshot,
    pub stop_reason: StopReason,
    pub duration: Duration,
}

impl PipelineStats {
    /// Aligned tuples per second
    pub fn tuples_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.report.tuples as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Run Statistics ===");
        println!("Stop reason: {}", self.stop_reason);
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!(
            "Synced log: {} ({} tuples, {:.2}/s)",
            self.report.log_path.display(),
            self.report.tuples,
            self.tuples_per_second()
        );
        println!(
            "Records: {} received, {} pushed, {} unparseable, {} out of order",
            self.ingestion.records_received,
            self.ingestion.frames_pushed,
            self.ingestion.parse_failures,
            self.ingestion.ordering_violations
        );

        println!("Producers:");
        for producer in &self.producers {
            let exit = match &producer.exit {
                ProducerExit::Exhausted => "exhausted".to_string(),
                ProducerExit::Stopped => "stopped".to_string(),
                ProducerExit::Failed(message) => format!("failed: {message}"),
            };
            println!(
                "  {}: {} frames ({})",
                producer.source_id, producer.frames, exit
            );
        }

        println!();
        print!("{}", self.report.summary);
    }
}
