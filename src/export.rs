use std::error::Error;
use std::ffi::CString;
use std::sync::Mutex;

use ::duckdb::{
    core::{DataChunkHandle, Inserter, LogicalTypeHandle, LogicalTypeId},
    vtab::{BindInfo, InitInfo, TableFunctionInfo, VTab},
};

use crate::config::PipelineConfig;
use crate::duckdb_impl::params::{
    ExportParameters, bind_lookup, export_named_parameters, export_parameters,
};
use crate::log;
use crate::pipeline;
use crate::sampling::RngDraw;
use crate::tier::{Tier, TierBuckets};

const PATH_PATTERN_PARAM_INDEX: u64 = 0;
const TIER_COLUMN: usize = 0;
const PUZZLES_COLUMN: usize = 1;

pub struct ExportPuzzlesBindData {
    pattern: String,
    params: ExportParameters,
}

pub struct ExportPuzzlesInitData {
    done: Mutex<bool>,
}

/// Runs the whole pipeline once per query and reports the per-tier counts
/// of the document it wrote.
pub struct ExportPuzzlesVTab;

fn export_once(bind_data: &ExportPuzzlesBindData) -> Result<TierBuckets, Box<dyn Error>> {
    let ExportParameters { run, output } = &bind_data.params;
    let exported = pipeline::export(
        &bind_data.pattern,
        run.compression,
        output,
        &run.config,
        RngDraw::from_seed(run.seed),
    );

    match exported {
        Ok(finished) => Ok(finished.document.tiers),
        Err(e) => {
            log::error(format!("export_puzzles failed: {}", e));
            Err(e.into())
        }
    }
}

fn tier_rows(buckets: &TierBuckets) -> Vec<(Tier, i64)> {
    buckets
        .counts()
        .iter()
        .map(|(tier, count)| (*tier, *count as i64))
        .collect()
}

impl VTab for ExportPuzzlesVTab {
    type InitData = ExportPuzzlesInitData;
    type BindData = ExportPuzzlesBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let pattern = bind.get_parameter(PATH_PATTERN_PARAM_INDEX).to_string();
        let params = export_parameters(&mut bind_lookup(bind), PipelineConfig::default())?;

        bind.add_result_column("tier", LogicalTypeHandle::from(LogicalTypeId::Varchar));
        bind.add_result_column("puzzles", LogicalTypeHandle::from(LogicalTypeId::Bigint));

        Ok(ExportPuzzlesBindData { pattern, params })
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(ExportPuzzlesInitData {
            done: Mutex::new(false),
        })
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let init_data = func.get_init_data();
        let bind_data = func.get_bind_data();
        let mut done = init_data
            .done
            .lock()
            .map_err(|_| "export_puzzles state lock poisoned")?;

        if *done {
            output.set_len(0);
            return Ok(());
        }
        *done = true;

        let rows = tier_rows(&export_once(bind_data)?);
        let tier_vec = output.flat_vector(TIER_COLUMN);
        for (idx, (tier, _)) in rows.iter().enumerate() {
            tier_vec.insert(idx, CString::new(tier.name())?);
        }
        let mut count_vec = output.flat_vector(PUZZLES_COLUMN);
        let counts = count_vec.as_mut_slice::<i64>();
        for (idx, (_, count)) in rows.iter().enumerate() {
            counts[idx] = *count;
        }

        output.set_len(rows.len());
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![
            LogicalTypeHandle::from(LogicalTypeId::Varchar), // path pattern (required)
        ])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(export_named_parameters())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duckdb_impl::params::RunParameters;
    use crate::document::OutputDocument;

    const HEADER: &str = "PuzzleId,FEN,Moves,Rating,RatingDeviation,Popularity,NbPlays,Themes,GameUrl,OpeningTags";

    #[test]
    fn test_tier_rows_cover_every_tier_in_order() {
        let rows = tier_rows(&TierBuckets::default());
        let tiers: Vec<Tier> = rows.iter().map(|(tier, _)| *tier).collect();
        assert_eq!(tiers, Tier::ALL);
        assert!(rows.iter().all(|(_, count)| *count == 0));
    }

    #[test]
    fn test_export_once_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("puzzles.csv");
        std::fs::write(
            &input,
            format!(
                "{HEADER}\n\
                 a,8/8/8/8/8/8/8/8 w - - 0 1,e2e4 e7e5,1100,0,0,0,skewer,,\n\
                 b,8/8/8/8/8/8/8/8 b - - 0 1,d7d5,1150,0,0,0,fork,,\n\
                 c,8/8/8/8/8/8/8/8 b - - 0 1,d7d5,2300,0,0,0,fork,,\n"
            ),
        )
        .unwrap();
        let output = dir.path().join("out.json");
        let bind_data = ExportPuzzlesBindData {
            pattern: input.display().to_string(),
            params: ExportParameters {
                run: RunParameters {
                    config: PipelineConfig {
                        sample_rate: 1.0,
                        date_processed: "2025-12-07".to_string(),
                        ..PipelineConfig::default()
                    },
                    seed: Some(5),
                    compression: None,
                },
                output: output.clone(),
            },
        };

        let rows = tier_rows(&export_once(&bind_data).unwrap());
        assert_eq!(rows[2], (Tier::Intermediate, 2));
        assert_eq!(rows.iter().map(|(_, n)| n).sum::<i64>(), 2);

        let written: OutputDocument =
            serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
        assert_eq!(written.meta.total_puzzles, 2);
        assert_eq!(written.meta.date_processed, "2025-12-07");
        assert_eq!(written.tiers.get(Tier::Intermediate)[0].title, "Skewer");
    }

    #[test]
    fn test_export_once_surfaces_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let bind_data = ExportPuzzlesBindData {
            pattern: dir.path().join("*.csv").display().to_string(),
            params: ExportParameters {
                run: RunParameters {
                    config: PipelineConfig::default(),
                    seed: None,
                    compression: None,
                },
                output: dir.path().join("out.json"),
            },
        };
        let err = export_once(&bind_data).unwrap_err();
        assert!(err.to_string().contains("*.csv"));
    }
}
