use std::ops::RangeInclusive;

use chrono::{NaiveDate, Utc};

use crate::error::PipelineError;
use crate::tier::TIER_FLOOR;

pub const DEFAULT_SOURCE_LABEL: &str = "Lichess Puzzle Database";
pub const DEFAULT_SAMPLE_RATE: f64 = 0.02;
pub const DEFAULT_MIN_RATING: i64 = 600;
pub const DEFAULT_MAX_RATING: i64 = 2000;
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Settings for one ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Per-record keep probability, in `(0, 1]`.
    pub sample_rate: f64,
    /// Inclusive rating bounds.
    pub min_rating: i64,
    pub max_rating: i64,
    pub source_label: String,
    pub date_processed: String,
    /// Scanned-row interval between progress lines.
    pub progress_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            min_rating: DEFAULT_MIN_RATING,
            max_rating: DEFAULT_MAX_RATING,
            source_label: DEFAULT_SOURCE_LABEL.to_string(),
            date_processed: today_utc(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.sample_rate > 0.0 && self.sample_rate <= 1.0) {
            return Err(PipelineError::Config(format!(
                "sample_rate must be in (0, 1], got {}",
                self.sample_rate
            )));
        }
        if self.min_rating < TIER_FLOOR {
            return Err(PipelineError::Config(format!(
                "min_rating must be at least {}, got {}",
                TIER_FLOOR, self.min_rating
            )));
        }
        if self.min_rating > self.max_rating {
            return Err(PipelineError::Config(format!(
                "min_rating ({}) is greater than max_rating ({})",
                self.min_rating, self.max_rating
            )));
        }
        if self.progress_interval == 0 {
            return Err(PipelineError::Config(
                "progress_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rating_range(&self) -> RangeInclusive<i64> {
        self.min_rating..=self.max_rating
    }
}

pub fn today_utc() -> String {
    Utc::now().date_naive().format(DATE_FORMAT).to_string()
}

/// Checks a caller-supplied `YYYY-MM-DD` date and returns it normalized.
pub fn parse_date(raw: &str) -> Result<String, PipelineError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map(|date| date.format(DATE_FORMAT).to_string())
        .map_err(|e| {
            PipelineError::Config(format!(
                "date_processed='{}' is not a YYYY-MM-DD date (chrono: {})",
                raw, e
            ))
        })
}
