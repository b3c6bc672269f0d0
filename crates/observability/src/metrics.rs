//! Alignment metrics
//!
//! Thin wrappers over the `metrics` facade plus an in-memory aggregator for
//! end-of-run summaries. All metric names share the `stream_aligner_` prefix.

use std::collections::BTreeMap;

use metrics::{counter, gauge, histogram};

/// Frame accepted by a source buffer
pub fn record_frame_appended(source_id: &str) {
    counter!(
        "stream_aligner_frames_appended_total",
        "source_id" => source_id.to_string()
    )
    .increment(1);
}

/// Frame rejected because it was older than the buffer's newest frame
pub fn record_ordering_violation(source_id: &str) {
    counter!(
        "stream_aligner_ordering_violations_total",
        "source_id" => source_id.to_string()
    )
    .increment(1);
}

/// Frames skipped over by prefix consumption (never matched)
pub fn record_frames_discarded(source_id: &str, count: usize) {
    if count == 0 {
        return;
    }
    counter!(
        "stream_aligner_frames_discarded_total",
        "source_id" => source_id.to_string()
    )
    .increment(count as u64);
}

/// Aligned tuple appended to the synced log
///
/// `skews` holds one `(source_id, |matched - base|)` pair per non-base source.
pub fn record_aligned_tuple<'a>(skews: impl IntoIterator<Item = (&'a str, f64)>) {
    counter!("stream_aligner_aligned_tuples_total").increment(1);

    for (source_id, skew_s) in skews {
        histogram!(
            "stream_aligner_skew_ms",
            "source_id" => source_id.to_string()
        )
        .record(skew_s * 1000.0);
    }
}

/// Entry dropped because a matched frame exceeded the skew tolerance
pub fn record_skew_rejected(source_id: &str) {
    counter!(
        "stream_aligner_skew_rejections_total",
        "source_id" => source_id.to_string()
    )
    .increment(1);
}

/// Current number of frames held by a source buffer
pub fn record_buffer_depth(source_id: &str, depth: usize) {
    gauge!(
        "stream_aligner_buffer_depth",
        "source_id" => source_id.to_string()
    )
    .set(depth as f64);
}

/// Alignment statistics aggregator
///
/// Aggregates in memory so a run can end with a summary.
#[derive(Debug, Clone, Default)]
pub struct AlignmentStatsAggregator {
    /// Tuples written to the log
    pub total_tuples: u64,

    /// Entries dropped by skew validation
    pub skew_rejections: u64,

    /// Frames discarded by prefix consumption
    pub frames_discarded: u64,

    /// Per-source skew (ms)
    pub skew_stats: BTreeMap<String, RunningStats>,

    /// Largest skew of each tuple (ms)
    pub max_skew_stats: RunningStats,

    /// Rejections per offending source
    pub rejection_counts: BTreeMap<String, u64>,
}

impl AlignmentStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one aligned tuple
    pub fn record_tuple<'a>(&mut self, skews: impl IntoIterator<Item = (&'a str, f64)>) {
        self.total_tuples += 1;

        let mut worst: f64 = 0.0;
        for (source_id, skew_s) in skews {
            let skew_ms = skew_s * 1000.0;
            worst = worst.max(skew_ms);
            self.skew_stats
                .entry(source_id.to_string())
                .or_default()
                .push(skew_ms);
        }
        self.max_skew_stats.push(worst);
    }

    /// Account for one skew-rejected entry
    pub fn record_rejection(&mut self, source_id: &str) {
        self.skew_rejections += 1;
        *self
            .rejection_counts
            .entry(source_id.to_string())
            .or_insert(0) += 1;
    }

    pub fn record_discarded(&mut self, count: usize) {
        self.frames_discarded += count as u64;
    }

    /// Build a summary report
    pub fn summary(&self) -> AlignmentSummary {
        let attempts = self.total_tuples + self.skew_rejections;
        AlignmentSummary {
            total_tuples: self.total_tuples,
            skew_rejections: self.skew_rejections,
            frames_discarded: self.frames_discarded,
            rejection_rate: if attempts > 0 {
                self.skew_rejections as f64 / attempts as f64 * 100.0
            } else {
                0.0
            },
            max_skew_ms: StatsSummary::from(&self.max_skew_stats),
            source_skew_ms: self
                .skew_stats
                .iter()
                .map(|(source_id, stats)| (source_id.clone(), StatsSummary::from(stats)))
                .collect(),
            rejection_counts: self.rejection_counts.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Alignment summary
#[derive(Debug, Clone, Default)]
pub struct AlignmentSummary {
    pub total_tuples: u64,
    pub skew_rejections: u64,
    pub frames_discarded: u64,
    /// Rejected share of all completed attempts (%)
    pub rejection_rate: f64,
    pub max_skew_ms: StatsSummary,
    pub source_skew_ms: BTreeMap<String, StatsSummary>,
    pub rejection_counts: BTreeMap<String, u64>,
}

impl std::fmt::Display for AlignmentSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Alignment Summary ===")?;
        writeln!(f, "Aligned tuples: {}", self.total_tuples)?;
        writeln!(
            f,
            "Skew rejections: {} ({:.2}%)",
            self.skew_rejections, self.rejection_rate
        )?;
        writeln!(f, "Discarded frames: {}", self.frames_discarded)?;
        writeln!(f, "Max skew per tuple (ms): {}", self.max_skew_ms)?;

        if !self.source_skew_ms.is_empty() {
            writeln!(f, "Skew per source (ms):")?;
            for (source, stats) in &self.source_skew_ms {
                writeln!(f, "  {}: {}", source, stats)?;
            }
        }

        if !self.rejection_counts.is_empty() {
            writeln!(f, "Rejections per source:")?;
            for (source, count) in &self.rejection_counts {
                writeln!(f, "  {}: {}", source, count)?;
            }
        }

        Ok(())
    }
}

/// Summary of one running statistic
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
