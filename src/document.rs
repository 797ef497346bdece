use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::tier::TierBuckets;
use crate::types::Puzzle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub total_puzzles: usize,
    pub source: String,
    pub sample_rate: String,
    pub date_processed: String,
}

/// The single artifact of a run: metadata plus the six tier buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub meta: DocumentMeta,
    pub tiers: TierBuckets,
}

impl OutputDocument {
    /// Buckets `puzzles` (kept in source order) and fills in the metadata.
    pub fn assemble(puzzles: Vec<Puzzle>, config: &PipelineConfig) -> Self {
        let tiers = TierBuckets::from_puzzles(puzzles);
        Self {
            meta: DocumentMeta {
                total_puzzles: tiers.total(),
                source: config.source_label.clone(),
                sample_rate: sample_rate_label(config.sample_rate),
                date_processed: config.date_processed.clone(),
            },
            tiers,
        }
    }

    pub fn to_json_pretty(&self) -> Result<Vec<u8>, PipelineError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// `0.02` -> `"2%"`. Truncated toward zero, so `0.999` is `"99%"` and never
/// claims a full sample.
pub fn sample_rate_label(rate: f64) -> String {
    format!("{}%", (rate * 100.0) as i64)
}

/// Writes the pretty-printed document to a temp file next to `path`, then
/// renames it into place. A failed write leaves any previous document intact.
pub fn write_document(document: &OutputDocument, path: &Path) -> Result<(), PipelineError> {
    let bytes = document.to_json_pretty()?;
    let destination = |source| PipelineError::Destination {
        path: path.to_path_buf(),
        source,
    };

    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut temp = NamedTempFile::new_in(parent).map_err(destination)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        writer.write_all(&bytes).map_err(destination)?;
        writer.flush().map_err(destination)?;
    }
    temp.persist(path).map_err(|e| destination(e.error))?;
    Ok(())
}
