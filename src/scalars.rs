use duckdb::{
    Result,
    core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId},
    vscalar::{ScalarFunctionSignature, VScalar},
    vtab::arrow::WritableVector,
};
use std::error::Error;

use crate::duckdb_impl::scalar::{
    VarcharOutput, invoke_unary_i64_to_varchar, invoke_unary_varchar_to_varchar,
};
use crate::parser::{extract_solution, side_to_move};
use crate::themes::{hint_for, split_themes, title_for};
use crate::tier::Tier;
use crate::types::side_to_move_label;

fn varchar_to_varchar() -> Vec<ScalarFunctionSignature> {
    vec![ScalarFunctionSignature::exact(
        vec![LogicalTypeHandle::from(LogicalTypeId::Varchar)],
        LogicalTypeHandle::from(LogicalTypeId::Varchar),
    )]
}

fn tier_name(rating: i64) -> VarcharOutput {
    Tier::for_rating(rating)
        .map(|tier| tier.name().to_string())
        .into()
}

fn title_of(themes: &str) -> VarcharOutput {
    VarcharOutput::Value(title_for(&split_themes(themes)).to_string())
}

fn hint_of(themes: &str) -> VarcharOutput {
    VarcharOutput::Value(hint_for(&split_themes(themes)).to_string())
}

/// `[[...]]` JSON, the shape the client expects for `solution`.
fn solution_json(moves: &str) -> Result<VarcharOutput, serde_json::Error> {
    let solution = [extract_solution(moves)];
    Ok(VarcharOutput::Value(serde_json::to_string(&solution)?))
}

fn to_move_of(fen: &str) -> VarcharOutput {
    side_to_move(fen)
        .ok()
        .map(|color| side_to_move_label(color).to_string())
        .into()
}

pub struct PuzzleTierScalar;

impl VScalar for PuzzleTierScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_i64_to_varchar(input, output, tier_name)
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        vec![ScalarFunctionSignature::exact(
            vec![LogicalTypeHandle::from(LogicalTypeId::Bigint)],
            LogicalTypeHandle::from(LogicalTypeId::Varchar),
        )]
    }
}

pub struct PuzzleTitleScalar;

impl VScalar for PuzzleTitleScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_varchar(input, output, title_of)
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        varchar_to_varchar()
    }
}

pub struct PuzzleHintScalar;

impl VScalar for PuzzleHintScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_varchar(input, output, hint_of)
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        varchar_to_varchar()
    }
}

pub struct PuzzleSolutionScalar;

impl VScalar for PuzzleSolutionScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        let mut failure = None;
        invoke_unary_varchar_to_varchar(input, output, |moves| {
            solution_json(moves).unwrap_or_else(|e| {
                failure.get_or_insert(e);
                VarcharOutput::Null
            })
        })?;
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        varchar_to_varchar()
    }
}

pub struct PuzzleToMoveScalar;

impl VScalar for PuzzleToMoveScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_varchar(input, output, to_move_of)
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        varchar_to_varchar()
    }
}
