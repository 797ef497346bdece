use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator(Option<String>);

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        match &mut self.0 {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(msg);
            }
            None => {
                self.0 = Some(msg.to_string());
            }
        }
    }

    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

/// A single input row that could not be turned into a puzzle.
///
/// Row-level: the pipeline counts it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed record{}: {reason}", row_suffix(.row))]
pub struct MalformedRecord {
    pub row: Option<u64>,
    pub reason: String,
}

impl MalformedRecord {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            row: None,
            reason: reason.into(),
        }
    }

    pub fn at_row(mut self, row: u64) -> Self {
        self.row = Some(row);
        self
    }
}

fn row_suffix(row: &Option<u64>) -> String {
    match row {
        Some(row) => format!(" at row {}", row),
        None => String::new(),
    }
}

/// Failures that abort a whole run. Nothing is written when one of these
/// surfaces before the output document is serialized.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid path pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("No files match pattern '{0}'")]
    NoSourceFiles(String),

    #[error("Failed to open source '{}': {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read source '{}' near row {row}: {message}", .path.display())]
    SourceRead {
        path: PathBuf,
        row: u64,
        message: String,
    },

    #[error("Failed to write output '{}': {source}", .path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize output document: {0}")]
    Serialize(#[from] serde_json::Error),
}
