//! Shared DuckDB scalar invoke helpers.
//!
//! Each helper walks the flat input vector, maps NULL rows to NULL output,
//! decodes the value and inserts whatever the row closure returns.
//!
//! # Safety
//! Only call these from inside a scalar `invoke()` while DuckDB's vectors are
//! valid. The registered signature must match the helper (`VARCHAR` inputs for
//! `duckdb_string_t`, `BIGINT` inputs for `i64`).

use std::error::Error;
use std::ffi::CString;

use duckdb::{
    Result,
    core::{DataChunkHandle, FlatVector, Inserter, LogicalTypeId},
    vtab::arrow::WritableVector,
};
use libduckdb_sys::duckdb_string_t;

use super::string::decode_duckdb_string;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarcharOutput {
    Null,
    Value(String),
}

impl From<Option<String>> for VarcharOutput {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

fn ensure_type(
    vec: &FlatVector,
    expected: LogicalTypeId,
    label: &str,
) -> Result<(), Box<dyn Error>> {
    let actual = vec.logical_type().id();
    if actual != expected {
        return Err(format!(
            "scalar helper type mismatch: {label} expected {expected:?}, got {actual:?}"
        )
        .into());
    }
    Ok(())
}

fn write_varchar(
    output_vec: &mut FlatVector,
    row: usize,
    value: VarcharOutput,
) -> Result<(), Box<dyn Error>> {
    match value {
        VarcharOutput::Null => output_vec.set_null(row),
        VarcharOutput::Value(v) => output_vec.insert(row, CString::new(v)?),
    }
    Ok(())
}

/// Invoke a unary `VARCHAR -> VARCHAR` scalar.
pub fn invoke_unary_varchar_to_varchar<F>(
    input: &DataChunkHandle,
    output: &mut dyn WritableVector,
    mut f: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(&str) -> VarcharOutput,
{
    let len = input.len();
    let input_vec = input.flat_vector(0);
    ensure_type(&input_vec, LogicalTypeId::Varchar, "input[0]")?;
    let input_slice = input_vec.as_slice::<duckdb_string_t>();
    let mut output_vec = output.flat_vector();
    ensure_type(&output_vec, LogicalTypeId::Varchar, "output")?;

    for (i, s) in input_slice.iter().take(len).enumerate() {
        if input_vec.row_is_null(i as u64) {
            output_vec.set_null(i);
            continue;
        }

        // SAFETY: Row nullability is checked above.
        let val = unsafe { decode_duckdb_string(s) };
        write_varchar(&mut output_vec, i, f(&val))?;
    }

    Ok(())
}

/// Invoke a unary `BIGINT -> VARCHAR` scalar.
pub fn invoke_unary_i64_to_varchar<F>(
    input: &DataChunkHandle,
    output: &mut dyn WritableVector,
    mut f: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(i64) -> VarcharOutput,
{
    let len = input.len();
    let input_vec = input.flat_vector(0);
    ensure_type(&input_vec, LogicalTypeId::Bigint, "input[0]")?;
    let input_slice = input_vec.as_slice::<i64>();
    let mut output_vec = output.flat_vector();
    ensure_type(&output_vec, LogicalTypeId::Varchar, "output")?;

    for (i, value) in input_slice.iter().take(len).enumerate() {
        if input_vec.row_is_null(i as u64) {
            output_vec.set_null(i);
            continue;
        }
        write_varchar(&mut output_vec, i, f(*value))?;
    }

    Ok(())
}
