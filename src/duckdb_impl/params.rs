use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use duckdb::core::{LogicalTypeHandle, LogicalTypeId};
use duckdb::vtab::BindInfo;

use super::bind_info_ffi::get_named_parameter_varchar;
use crate::config::{PipelineConfig, parse_date};
use crate::source::CompressionMode;

pub(crate) const DEFAULT_OUTPUT_PATH: &str = "puzzles.json";

/// Settings shared by every table function that runs the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunParameters {
    pub(crate) config: PipelineConfig,
    pub(crate) seed: Option<u64>,
    pub(crate) compression: Option<CompressionMode>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExportParameters {
    pub(crate) run: RunParameters,
    pub(crate) output: PathBuf,
}

pub(crate) fn run_named_parameters() -> Vec<(String, LogicalTypeHandle)> {
    vec![
        named("sample_rate", LogicalTypeId::Double),
        named("min_rating", LogicalTypeId::Bigint),
        named("max_rating", LogicalTypeId::Bigint),
        named("seed", LogicalTypeId::UBigint),
        named("compression", LogicalTypeId::Varchar),
    ]
}

pub(crate) fn export_named_parameters() -> Vec<(String, LogicalTypeHandle)> {
    let mut params = run_named_parameters();
    params.extend([
        named("output", LogicalTypeId::Varchar),
        named("source_label", LogicalTypeId::Varchar),
        named("date_processed", LogicalTypeId::Varchar),
    ]);
    params
}

fn named(name: &str, id: LogicalTypeId) -> (String, LogicalTypeHandle) {
    (name.to_string(), LogicalTypeHandle::from(id))
}

/// Named parameter lookup from a bind callback; omitted and NULL both read
/// as `None`.
pub(crate) fn bind_lookup(
    bind: &BindInfo,
) -> impl FnMut(&str) -> Result<Option<String>, Box<dyn Error>> + '_ {
    move |name: &str| Ok(get_named_parameter_varchar(bind, name)?.into_option())
}

pub(crate) fn run_parameters<L>(
    lookup: &mut L,
    mut config: PipelineConfig,
) -> Result<RunParameters, Box<dyn Error>>
where
    L: FnMut(&str) -> Result<Option<String>, Box<dyn Error>>,
{
    if let Some(raw) = lookup("sample_rate")? {
        config.sample_rate = parse_value("sample_rate", &raw)?;
    }
    if let Some(raw) = lookup("min_rating")? {
        config.min_rating = parse_value("min_rating", &raw)?;
    }
    if let Some(raw) = lookup("max_rating")? {
        config.max_rating = parse_value("max_rating", &raw)?;
    }
    let seed = lookup("seed")?
        .map(|raw| parse_value::<u64>("seed", &raw))
        .transpose()?;
    let compression = match lookup("compression")? {
        Some(raw) if !raw.trim().eq_ignore_ascii_case("null") => {
            Some(CompressionMode::parse(&raw)?)
        }
        _ => None,
    };

    config.validate()?;
    Ok(RunParameters {
        config,
        seed,
        compression,
    })
}

pub(crate) fn export_parameters<L>(
    lookup: &mut L,
    mut config: PipelineConfig,
) -> Result<ExportParameters, Box<dyn Error>>
where
    L: FnMut(&str) -> Result<Option<String>, Box<dyn Error>>,
{
    if let Some(label) = lookup("source_label")? {
        config.source_label = label;
    }
    if let Some(raw) = lookup("date_processed")? {
        config.date_processed = parse_date(&raw)?;
    }
    let output = match lookup("output")? {
        Some(raw) if raw.trim().is_empty() => {
            return Err("output must be a non-empty path".into());
        }
        Some(raw) => PathBuf::from(raw),
        None => PathBuf::from(DEFAULT_OUTPUT_PATH),
    };

    Ok(ExportParameters {
        run: run_parameters(lookup, config)?,
        output,
    })
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, Box<dyn Error>>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("Invalid {} value '{}': {}", name, raw, e).into())
}
