use std::borrow::Cow;
use std::error::Error;
use std::ffi::CString;
use std::path::PathBuf;
use std::sync::Mutex;

use ::duckdb::{
    core::{DataChunkHandle, Inserter, LogicalTypeHandle, LogicalTypeId},
    vtab::{BindInfo, InitInfo, TableFunctionInfo, VTab},
};
use rand::rngs::StdRng;

use crate::config::PipelineConfig;
use crate::duckdb_impl::params::{
    RunParameters, bind_lookup, run_named_parameters, run_parameters,
};
use crate::error::ErrorAccumulator;
use crate::log;
use crate::pipeline::{Ingestor, RecordOutcome, log_skip};
use crate::sampling::RngDraw;
use crate::source::{PuzzleSource, SourceInput, expand_paths};
use crate::tier::Tier;
use crate::types::{Puzzle, side_to_move_label};

const PATH_PATTERN_PARAM_INDEX: u64 = 0;
const ROWS_PER_CHUNK: usize = 2048;
const READ_PUZZLES_COLUMN_COUNT: usize = 10;

/// `read_puzzles` keeps every row by default; sampling is opt-in.
const READ_SAMPLE_RATE: f64 = 1.0;

pub struct ReadPuzzlesBindData {
    paths: Vec<PathBuf>,
    params: RunParameters,
}

pub struct ReadPuzzlesInitData {
    state: Mutex<ScanState>,
}

/// Streaming position across all bound files. One file is open at a time.
struct ScanState {
    next_path_idx: usize,
    current: Option<PuzzleSource<SourceInput>>,
    ingestor: Option<Ingestor<RngDraw<StdRng>>>,
    finished: bool,
}

impl ScanState {
    fn new() -> Self {
        Self {
            next_path_idx: 0,
            current: None,
            ingestor: None,
            finished: false,
        }
    }
}

pub struct ReadPuzzlesVTab;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PuzzleColumn {
    PuzzleId = 0,
    Fen = 1,
    Solution = 2,
    Hint = 3,
    Title = 4,
    ToMove = 5,
    Rating = 6,
    Themes = 7,
    Tier = 8,
    Source = 9,
}

impl PuzzleColumn {
    const fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        READ_PUZZLES_COLUMNS[self.index()].name
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PuzzleLogicalType {
    Varchar,
    Bigint,
}

impl PuzzleLogicalType {
    fn to_handle(self) -> LogicalTypeHandle {
        match self {
            Self::Varchar => LogicalTypeHandle::from(LogicalTypeId::Varchar),
            Self::Bigint => LogicalTypeHandle::from(LogicalTypeId::Bigint),
        }
    }
}

struct PuzzleColumnDef {
    name: &'static str,
    logical_type: PuzzleLogicalType,
}

const fn varchar(name: &'static str) -> PuzzleColumnDef {
    PuzzleColumnDef {
        name,
        logical_type: PuzzleLogicalType::Varchar,
    }
}

const READ_PUZZLES_COLUMNS: [PuzzleColumnDef; READ_PUZZLES_COLUMN_COUNT] = [
    varchar("PuzzleId"),
    varchar("FEN"),
    varchar("solution"),
    varchar("hint"),
    varchar("title"),
    varchar("to_move"),
    PuzzleColumnDef {
        name: "rating",
        logical_type: PuzzleLogicalType::Bigint,
    },
    varchar("themes"),
    varchar("tier"),
    varchar("Source"),
];

/// The text columns of one output row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PuzzleRowText {
    solution: String,
    themes: String,
    tier: &'static str,
    to_move: &'static str,
}

impl PuzzleRowText {
    fn render(puzzle: &Puzzle) -> Result<Self, serde_json::Error> {
        Ok(Self {
            solution: serde_json::to_string(&[puzzle.player_moves()])?,
            themes: puzzle.themes.join(" "),
            tier: Tier::classify(puzzle.rating).name(),
            to_move: side_to_move_label(puzzle.to_move),
        })
    }
}

fn sanitize_for_cstring<'a>(
    value: &'a str,
    field_name: &str,
    warnings: &mut ErrorAccumulator,
) -> Cow<'a, str> {
    if value.contains('\0') {
        warnings.push(&format!("Sanitized interior NUL in {}", field_name));
        Cow::Owned(value.replace('\0', " "))
    } else {
        Cow::Borrowed(value)
    }
}

struct ChunkWriter<'a> {
    output: &'a mut DataChunkHandle,
    row_count: usize,
}

impl<'a> ChunkWriter<'a> {
    fn new(output: &'a mut DataChunkHandle) -> Self {
        Self {
            output,
            row_count: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.row_count >= ROWS_PER_CHUNK
    }

    fn write_row(&mut self, puzzle: &Puzzle, source: &str) -> Result<(), Box<dyn Error>> {
        let row_idx = self.row_count;
        let text = PuzzleRowText::render(puzzle)?;
        let mut warnings = ErrorAccumulator::default();

        self.write_varchar(PuzzleColumn::PuzzleId, row_idx, &puzzle.id, &mut warnings)?;
        self.write_varchar(PuzzleColumn::Fen, row_idx, &puzzle.fen, &mut warnings)?;
        self.write_varchar(PuzzleColumn::Solution, row_idx, &text.solution, &mut warnings)?;
        self.write_varchar(PuzzleColumn::Hint, row_idx, &puzzle.hint, &mut warnings)?;
        self.write_varchar(PuzzleColumn::Title, row_idx, &puzzle.title, &mut warnings)?;
        self.write_varchar(PuzzleColumn::ToMove, row_idx, text.to_move, &mut warnings)?;
        let mut rating_vec = self.output.flat_vector(PuzzleColumn::Rating.index());
        rating_vec.as_mut_slice::<i64>()[row_idx] = puzzle.rating;
        self.write_varchar(PuzzleColumn::Themes, row_idx, &text.themes, &mut warnings)?;
        self.write_varchar(PuzzleColumn::Tier, row_idx, text.tier, &mut warnings)?;
        self.write_varchar(PuzzleColumn::Source, row_idx, source, &mut warnings)?;

        if let Some(message) = warnings.take() {
            log::warn(format!("Puzzle '{}': {}", puzzle.id, message));
        }

        self.row_count += 1;
        Ok(())
    }

    fn set_output_len(&mut self) {
        self.output.set_len(self.row_count);
    }

    fn write_varchar(
        &mut self,
        column: PuzzleColumn,
        row_idx: usize,
        value: &str,
        warnings: &mut ErrorAccumulator,
    ) -> Result<(), Box<dyn Error>> {
        let vector = self.output.flat_vector(column.index());
        let sanitized = sanitize_for_cstring(value, column.name(), warnings);
        vector.insert(row_idx, CString::new(sanitized.as_ref())?);
        Ok(())
    }
}

/// Makes sure `state.current` holds an open source. Returns `false` once
/// every path has been consumed.
fn acquire_source(
    state: &mut ScanState,
    paths: &[PathBuf],
    params: &RunParameters,
) -> Result<bool, Box<dyn Error>> {
    if state.current.is_some() {
        return Ok(true);
    }
    let Some(path) = paths.get(state.next_path_idx) else {
        return Ok(false);
    };
    state.next_path_idx += 1;
    state.current = Some(PuzzleSource::open(path, params.compression)?);
    Ok(true)
}

fn finish_scan(state: &mut ScanState) {
    if state.finished {
        return;
    }
    state.finished = true;
    if let Some(ingestor) = &state.ingestor {
        log::info(ingestor.stats().summary_line());
    }
}

impl VTab for ReadPuzzlesVTab {
    type InitData = ReadPuzzlesInitData;
    type BindData = ReadPuzzlesBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let pattern = bind.get_parameter(PATH_PATTERN_PARAM_INDEX).to_string();
        let defaults = PipelineConfig {
            sample_rate: READ_SAMPLE_RATE,
            ..PipelineConfig::default()
        };
        let params = run_parameters(&mut bind_lookup(bind), defaults)?;
        let paths = expand_paths(&pattern)?;

        for column in READ_PUZZLES_COLUMNS.iter() {
            bind.add_result_column(column.name, column.logical_type.to_handle());
        }

        Ok(ReadPuzzlesBindData { paths, params })
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(ReadPuzzlesInitData {
            state: Mutex::new(ScanState::new()),
        })
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let init_data = func.get_init_data();
        let bind_data = func.get_bind_data();
        let mut chunk_writer = ChunkWriter::new(output);
        let mut state = init_data
            .state
            .lock()
            .map_err(|_| "read_puzzles scan state lock poisoned")?;

        while !chunk_writer.is_full() {
            if !acquire_source(&mut state, &bind_data.paths, &bind_data.params)? {
                finish_scan(&mut state);
                break;
            }

            let ScanState {
                current, ingestor, ..
            } = &mut *state;
            // The sampler is seeded on the first scan call, so one query sees one draw sequence.
            let ingestor = ingestor.get_or_insert_with(|| {
                let params = &bind_data.params;
                Ingestor::new(&params.config, RngDraw::from_seed(params.seed))
            });
            let Some(source) = current.as_mut() else {
                continue;
            };
            let Some(row) = source.next_row()? else {
                *current = None;
                continue;
            };

            let outcome = ingestor.ingest(row);
            log_skip(source.path(), &outcome);
            if let RecordOutcome::Parsed(puzzle) = outcome {
                let source_label = source.path().display().to_string();
                chunk_writer.write_row(&puzzle, &source_label)?;
            }
        }

        chunk_writer.set_output_len();
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![
            LogicalTypeHandle::from(LogicalTypeId::Varchar), // path pattern (required)
        ])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(run_named_parameters())
    }
}
