//! Run counters and human-readable summaries. Nothing here feeds back into
//! the output document.

use crate::log;
use crate::pipeline::{RecordOutcome, SkipReason};
use crate::tier::TierBuckets;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub scanned: u64,
    pub not_sampled: u64,
    pub out_of_range: u64,
    pub malformed: u64,
    pub kept: u64,
}

impl RunStats {
    pub fn record(&mut self, outcome: &RecordOutcome) {
        self.scanned += 1;
        match outcome {
            RecordOutcome::Parsed(_) => self.kept += 1,
            RecordOutcome::Skipped(SkipReason::NotSampled) => self.not_sampled += 1,
            RecordOutcome::Skipped(SkipReason::OutOfRange(_)) => self.out_of_range += 1,
            RecordOutcome::Skipped(SkipReason::Malformed(_)) => self.malformed += 1,
        }
    }

    pub fn progress_line(&self) -> String {
        format!(
            "Processed {} rows, kept {} puzzles...",
            group_thousands(self.scanned),
            group_thousands(self.kept)
        )
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Scanned {} rows: kept {}, not sampled {}, out of rating range {}, malformed {}",
            group_thousands(self.scanned),
            group_thousands(self.kept),
            group_thousands(self.not_sampled),
            group_thousands(self.out_of_range),
            group_thousands(self.malformed)
        )
    }
}

/// Emits a progress line every `interval` scanned rows.
#[derive(Debug, Clone, Copy)]
pub struct ProgressReporter {
    interval: u64,
}

impl ProgressReporter {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
        }
    }

    pub fn is_due(&self, stats: &RunStats) -> bool {
        stats.scanned > 0 && stats.scanned.is_multiple_of(self.interval)
    }

    pub fn observe(&self, stats: &RunStats) {
        if self.is_due(stats) {
            log::info(stats.progress_line());
        }
    }
}

pub fn tier_distribution_lines(buckets: &TierBuckets) -> Vec<String> {
    buckets
        .counts()
        .iter()
        .map(|(tier, count)| {
            format!(
                "  {:<12}: {:>6} puzzles",
                tier.name(),
                group_thousands(*count as u64)
            )
        })
        .collect()
}

pub fn log_distribution(buckets: &TierBuckets) {
    log::info("Puzzle distribution:");
    for line in tier_distribution_lines(buckets) {
        log::info(line);
    }
}

/// `1234567` -> `"1,234,567"`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
