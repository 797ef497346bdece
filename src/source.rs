use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ErrorKind, ReaderBuilder, StringRecord};
use zstd::stream::read::Decoder as ZstdDecoder;

use crate::error::{MalformedRecord, PipelineError};
use crate::types::RawRecord;

pub type SourceInput = Box<dyn Read + Send>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionMode {
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(
                "Invalid compression value ''. Supported values: 'zstd' or NULL/omitted."
                    .to_string(),
            );
        }

        if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else {
            Err(format!(
                "Invalid compression value '{}'. Supported values: 'zstd' or NULL/omitted.",
                normalized
            ))
        }
    }

    /// Explicit mode wins; otherwise `.zst` files are read as zstd.
    pub fn resolve(explicit: Option<Self>, path: &Path) -> Self {
        match explicit {
            Some(mode) => mode,
            None if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("zst")) =>
            {
                Self::Zstd
            }
            None => Self::Plain,
        }
    }
}

/// Expands a single path or a glob pattern (`*` / `?`) into input files,
/// sorted so runs over the same pattern read files in the same order.
pub fn expand_paths(pattern: &str) -> Result<Vec<PathBuf>, PipelineError> {
    if !(pattern.contains('*') || pattern.contains('?')) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let mut paths: Vec<PathBuf> = glob::glob(pattern)
        .map_err(|e| PipelineError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(PipelineError::NoSourceFiles(pattern.to_string()));
    }
    Ok(paths)
}

pub fn open_input_stream(
    path: &Path,
    compression: Option<CompressionMode>,
) -> Result<SourceInput, PipelineError> {
    let file = File::open(path).map_err(|source| PipelineError::Source {
        path: path.to_path_buf(),
        source,
    })?;

    match CompressionMode::resolve(compression, path) {
        CompressionMode::Plain => Ok(Box::new(file)),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(decoder) as SourceInput)
            .map_err(|source| PipelineError::Source {
                path: path.to_path_buf(),
                source,
            }),
    }
}

/// Positions of the consumed columns in the CSV header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ColumnMap {
    puzzle_id: Option<usize>,
    fen: Option<usize>,
    moves: Option<usize>,
    rating: Option<usize>,
    themes: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Self {
        let mut columns = Self::default();
        for (idx, name) in headers.iter().enumerate() {
            let slot = match name.trim().trim_start_matches('\u{feff}') {
                "PuzzleId" => &mut columns.puzzle_id,
                "FEN" => &mut columns.fen,
                "Moves" => &mut columns.moves,
                "Rating" => &mut columns.rating,
                "Themes" => &mut columns.themes,
                _ => continue,
            };
            slot.get_or_insert(idx);
        }
        columns
    }

    fn missing_required(&self) -> Vec<&'static str> {
        [
            ("PuzzleId", self.puzzle_id),
            ("FEN", self.fen),
            ("Rating", self.rating),
            ("Themes", self.themes),
        ]
        .into_iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name)
        .collect()
    }

    fn raw_record(&self, record: &StringRecord) -> RawRecord {
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).map(str::to_string);
        RawRecord {
            puzzle_id: field(self.puzzle_id),
            fen: field(self.fen),
            moves: field(self.moves),
            rating: field(self.rating),
            themes: field(self.themes),
        }
    }
}

/// One data row, numbered from 1 after the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub row: u64,
    pub record: Result<RawRecord, MalformedRecord>,
}

/// Streaming reader over one Lichess puzzle CSV.
pub struct PuzzleSource<R: Read> {
    path: PathBuf,
    reader: csv::Reader<R>,
    columns: ColumnMap,
    buffer: StringRecord,
    rows_read: u64,
}

impl PuzzleSource<SourceInput> {
    pub fn open(path: &Path, compression: Option<CompressionMode>) -> Result<Self, PipelineError> {
        let input = open_input_stream(path, compression)?;
        Self::new(path, input)
    }
}

impl<R: Read> PuzzleSource<R> {
    /// Reads the header row. The csv reader buffers `input` itself.
    pub fn new(path: impl Into<PathBuf>, input: R) -> Result<Self, PipelineError> {
        let path = path.into();
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);

        let columns = match reader.headers() {
            Ok(headers) => ColumnMap::from_headers(headers),
            Err(e) => return Err(read_error(&path, 0, e)),
        };

        let missing = columns.missing_required();
        if !missing.is_empty() {
            crate::log::warn(format!(
                "Source '{}' has no {} column; every row will be skipped",
                path.display(),
                missing.join("/")
            ));
        }

        Ok(Self {
            path,
            reader,
            columns,
            buffer: StringRecord::new(),
            rows_read: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next data row, `Ok(None)` at end of input.
    ///
    /// Rows that cannot be decoded come back as malformed; only I/O failures
    /// are returned as errors.
    pub fn next_row(&mut self) -> Result<Option<SourceRow>, PipelineError> {
        let row = self.rows_read + 1;
        match self.reader.read_record(&mut self.buffer) {
            Ok(false) => Ok(None),
            Ok(true) => {
                self.rows_read = row;
                Ok(Some(SourceRow {
                    row,
                    record: Ok(self.columns.raw_record(&self.buffer)),
                }))
            }
            Err(e) if matches!(e.kind(), ErrorKind::Io(_)) => Err(read_error(&self.path, row, e)),
            Err(e) => {
                self.rows_read = row;
                Ok(Some(SourceRow {
                    row,
                    record: Err(MalformedRecord::new(e.to_string()).at_row(row)),
                }))
            }
        }
    }
}

fn read_error(path: &Path, row: u64, error: csv::Error) -> PipelineError {
    PipelineError::SourceRead {
        path: path.to_path_buf(),
        row,
        message: error.to_string(),
    }
}
