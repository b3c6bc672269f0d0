//! `inspect` command implementation.

use anyhow::{Context, Result};
use contracts::{format_timestamp, source_label, AlignedTuple};
use observability::{AlignmentStatsAggregator, AlignmentSummary};
use serde::Serialize;
use sync_engine::SyncedLog;
use tracing::info;

use crate::cli::InspectArgs;
use crate::error::CliError;

#[derive(Serialize)]
struct LogReport {
    path: String,
    tuples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_base: Option<String>,
    sources: Vec<SourceSkew>,
}

#[derive(Serialize)]
struct SourceSkew {
    label: String,
    count: u64,
    min_ms: f64,
    max_ms: f64,
    mean_ms: f64,
    std_dev_ms: f64,
}

/// Execute the `inspect` command
pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    info!(log = %args.log.display(), "Inspecting synced log");

    let tuples =
        SyncedLog::load(&args.log).map_err(|e| CliError::log_read(&args.log, e.to_string()))?;
    let summary = summarize(&tuples);

    if args.json {
        let report = build_report(args, &tuples, &summary);
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        println!("Synced log: {}", args.log.display());
        if let (Some(first), Some(last)) = (tuples.first(), tuples.last()) {
            println!(
                "Base span: {} .. {}",
                format_timestamp(&first.base.timestamp),
                format_timestamp(&last.base.timestamp)
            );
        }
        print!("{}", summary);
    }

    Ok(())
}

/// Skew statistics per positional label
fn summarize(tuples: &[AlignedTuple]) -> AlignmentSummary {
    let mut aggregator = AlignmentStatsAggregator::new();
    for tuple in tuples {
        let labels: Vec<String> = (0..tuple.others.len()).map(source_label).collect();
        aggregator.record_tuple(
            labels
                .iter()
                .map(String::as_str)
                .zip(tuple.skews()),
        );
    }
    aggregator.summary()
}

fn build_report(args: &InspectArgs, tuples: &[AlignedTuple], summary: &AlignmentSummary) -> LogReport {
    LogReport {
        path: args.log.display().to_string(),
        tuples: tuples.len(),
        first_base: tuples.first().map(|t| format_timestamp(&t.base.timestamp)),
        last_base: tuples.last().map(|t| format_timestamp(&t.base.timestamp)),
        sources: summary
            .source_skew_ms
            .iter()
            .map(|(label, stats)| SourceSkew {
                label: label.clone(),
                count: stats.count,
                min_ms: stats.min,
                max_ms: stats.max,
                mean_ms: stats.mean,
                std_dev_ms: stats.std_dev,
            })
            .collect(),
    }
}
