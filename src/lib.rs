//! Lichess puzzle ingestion: samples the puzzle CSV, filters by rating,
//! normalizes each record and buckets it into difficulty tiers. Exposed to
//! DuckDB as the `read_puzzles` and `export_puzzles` table functions plus a
//! handful of per-column scalars.

pub mod config;
pub mod document;
mod duckdb_impl;
pub mod error;
mod export;
mod log;
pub mod parser;
pub mod pipeline;
mod reader;
pub mod report;
pub mod sampling;
mod scalars;
pub mod source;
pub mod themes;
pub mod tier;
pub mod types;

use duckdb::{Connection, Result};
use duckdb_ext_macros::duckdb_extension;
use export::ExportPuzzlesVTab;
use reader::ReadPuzzlesVTab;
use scalars::{
    PuzzleHintScalar, PuzzleSolutionScalar, PuzzleTierScalar, PuzzleTitleScalar,
    PuzzleToMoveScalar,
};
use std::error::Error;

#[duckdb_extension(name = "chess_puzzles", api_version = "v1.0.0")]
pub unsafe fn extension_entrypoint(con: Connection) -> Result<(), Box<dyn Error>> {
    // Table functions
    con.register_table_function::<ReadPuzzlesVTab>("read_puzzles")?;
    con.register_table_function::<ExportPuzzlesVTab>("export_puzzles")?;

    // Scalar functions
    con.register_scalar_function::<PuzzleTierScalar>("puzzle_tier")?;
    con.register_scalar_function::<PuzzleTitleScalar>("puzzle_title")?;
    con.register_scalar_function::<PuzzleHintScalar>("puzzle_hint")?;
    con.register_scalar_function::<PuzzleSolutionScalar>("puzzle_solution")?;
    con.register_scalar_function::<PuzzleToMoveScalar>("puzzle_to_move")?;

    Ok(())
}
