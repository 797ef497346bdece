//! Single-pass ingestion: sampling gate, rating gate, record parsing, then
//! tier bucketing once the sources are exhausted.

use std::io::Read;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::document::{OutputDocument, write_document};
use crate::error::{MalformedRecord, PipelineError};
use crate::log;
use crate::parser::{parse_rating, parse_record};
use crate::report::{ProgressReporter, RunStats, log_distribution};
use crate::sampling::{BernoulliSampler, UnitDraw};
use crate::source::{CompressionMode, PuzzleSource, SourceRow, expand_paths};
use crate::types::Puzzle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotSampled,
    OutOfRange(i64),
    Malformed(MalformedRecord),
}

/// What happened to one source row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Parsed(Puzzle),
    Skipped(SkipReason),
}

/// Per-row gates shared by the batch pipeline and the streaming table
/// function. Owns the sampler and the run counters.
pub struct Ingestor<D> {
    sampler: BernoulliSampler<D>,
    ratings: RangeInclusive<i64>,
    stats: RunStats,
    progress: ProgressReporter,
}

impl<D: UnitDraw> Ingestor<D> {
    pub fn new(config: &PipelineConfig, draws: D) -> Self {
        Self {
            sampler: BernoulliSampler::new(config.sample_rate, draws),
            ratings: config.rating_range(),
            stats: RunStats::default(),
            progress: ProgressReporter::new(config.progress_interval),
        }
    }

    pub fn ingest(&mut self, row: SourceRow) -> RecordOutcome {
        let outcome = self.evaluate(row);
        self.stats.record(&outcome);
        self.progress.observe(&self.stats);
        outcome
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    fn evaluate(&mut self, row: SourceRow) -> RecordOutcome {
        // One draw per row, taken before anything else looks at the row.
        if !self.sampler.keep() {
            return RecordOutcome::Skipped(SkipReason::NotSampled);
        }

        let SourceRow { row, record } = row;
        let record = match record {
            Ok(record) => record,
            Err(malformed) => return RecordOutcome::Skipped(SkipReason::Malformed(malformed)),
        };

        let rating = match record.rating.as_deref().map(parse_rating) {
            Some(Ok(rating)) => rating,
            Some(Err(reason)) => {
                return RecordOutcome::Skipped(SkipReason::Malformed(
                    MalformedRecord::new(reason).at_row(row),
                ));
            }
            None => {
                return RecordOutcome::Skipped(SkipReason::Malformed(
                    MalformedRecord::new("missing Rating").at_row(row),
                ));
            }
        };

        if !self.ratings.contains(&rating) {
            return RecordOutcome::Skipped(SkipReason::OutOfRange(rating));
        }

        match parse_record(&record) {
            Ok(puzzle) => RecordOutcome::Parsed(puzzle),
            Err(malformed) => RecordOutcome::Skipped(SkipReason::Malformed(malformed.at_row(row))),
        }
    }
}

pub(crate) fn log_skip(source: &Path, outcome: &RecordOutcome) {
    if let RecordOutcome::Skipped(SkipReason::Malformed(malformed)) = outcome {
        log::warn(format!("Skipping row in '{}': {}", source.display(), malformed));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    pub document: OutputDocument,
    pub stats: RunStats,
}

/// Runs the pipeline over `sources` in order.
///
/// Sources are pulled lazily, so only one input handle is open at a time.
/// The first source or read error aborts the run.
pub fn run<R, S, D>(sources: S, config: &PipelineConfig, draws: D) -> Result<PipelineRun, PipelineError>
where
    R: Read,
    S: IntoIterator<Item = Result<PuzzleSource<R>, PipelineError>>,
    D: UnitDraw,
{
    config.validate()?;

    let mut ingestor = Ingestor::new(config, draws);
    let mut puzzles = Vec::new();

    for source in sources {
        let mut source = source?;
        while let Some(row) = source.next_row()? {
            let outcome = ingestor.ingest(row);
            log_skip(source.path(), &outcome);
            if let RecordOutcome::Parsed(puzzle) = outcome {
                puzzles.push(puzzle);
            }
        }
    }

    let stats = ingestor.stats();
    log::info(format!("Collected {} puzzles", puzzles.len()));
    log::info(stats.summary_line());

    Ok(PipelineRun {
        document: OutputDocument::assemble(puzzles, config),
        stats,
    })
}

pub fn run_paths<D: UnitDraw>(
    paths: &[PathBuf],
    compression: Option<CompressionMode>,
    config: &PipelineConfig,
    draws: D,
) -> Result<PipelineRun, PipelineError> {
    let sources = paths.iter().map(|path| {
        log::info(format!("Reading '{}'", path.display()));
        PuzzleSource::open(path, compression)
    });
    run(sources, config, draws)
}

/// Reads every file matching `pattern`, writes the document to `output`,
/// and returns the run for reporting.
pub fn export<D: UnitDraw>(
    pattern: &str,
    compression: Option<CompressionMode>,
    output: &Path,
    config: &PipelineConfig,
    draws: D,
) -> Result<PipelineRun, PipelineError> {
    let paths = expand_paths(pattern)?;
    let run = run_paths(&paths, compression, config, draws)?;

    log_distribution(&run.document.tiers);
    write_document(&run.document, output)?;
    log::info(format!(
        "Saved {} puzzles to '{}'",
        run.document.meta.total_puzzles,
        output.display()
    ));
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::RngDraw;
    use crate::sampling::tests::FixedDraws;
    use crate::tier::Tier;
    use crate::types::RawRecord;
    use std::fs::File;
    use std::io::Write;

    const HEADER: &str = "PuzzleId,FEN,Moves,Rating,RatingDeviation,Popularity,NbPlays,Themes,GameUrl,OpeningTags";
    const FEN_W: &str = "8/8/8/8/8/8/8/8 w - - 0 1";
    const FEN_B: &str = "8/8/8/8/8/8/8/8 b - - 0 1";

    fn csv_row(id: &str, fen: &str, moves: &str, rating: &str, themes: &str) -> String {
        format!("{id},{fen},{moves},{rating},75,90,100,{themes},https://lichess.org/x,\n")
    }

    fn csv(rows: &[String]) -> String {
        let mut data = format!("{HEADER}\n");
        for row in rows {
            data.push_str(row);
        }
        data
    }

    fn config(rate: f64) -> PipelineConfig {
        PipelineConfig {
            sample_rate: rate,
            date_processed: "2025-12-07".to_string(),
            ..PipelineConfig::default()
        }
    }

    fn run_bytes<D: UnitDraw>(data: &str, config: &PipelineConfig, draws: D) -> PipelineRun {
        let source = PuzzleSource::new("<memory>", data.as_bytes());
        run([source], config, draws).unwrap()
    }

    fn ids(run: &PipelineRun, tier: Tier) -> Vec<String> {
        run.document
            .tiers
            .get(tier)
            .iter()
            .map(|p| p.id.clone())
            .collect()
    }

    fn source_row(row: u64, rating: &str) -> SourceRow {
        SourceRow {
            row,
            record: Ok(RawRecord {
                puzzle_id: Some(format!("p{}", row)),
                fen: Some(FEN_W.to_string()),
                moves: Some("e2e4 e7e5".to_string()),
                rating: Some(rating.to_string()),
                themes: Some("fork".to_string()),
            }),
        }
    }

    #[test]
    fn test_ingest_gate_order() {
        let mut ingestor = Ingestor::new(&config(0.5), FixedDraws::new([0.9, 0.1, 0.1, 0.1]));

        assert_eq!(
            ingestor.ingest(source_row(1, "1500")),
            RecordOutcome::Skipped(SkipReason::NotSampled)
        );
        assert!(matches!(
            ingestor.ingest(source_row(2, "abc")),
            RecordOutcome::Skipped(SkipReason::Malformed(MalformedRecord { row: Some(2), .. }))
        ));
        assert_eq!(
            ingestor.ingest(source_row(3, "2001")),
            RecordOutcome::Skipped(SkipReason::OutOfRange(2001))
        );
        assert!(matches!(
            ingestor.ingest(source_row(4, "1500")),
            RecordOutcome::Parsed(_)
        ));

        let stats = ingestor.stats();
        assert_eq!(stats.scanned, 4);
        assert_eq!(stats.not_sampled, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.out_of_range, 1);
        assert_eq!(stats.kept, 1);
    }

    #[test]
    fn test_out_of_range_row_never_reaches_record_parser() {
        // FEN is broken; an out-of-range rating must short-circuit first.
        let mut ingestor = Ingestor::new(&config(1.0), FixedDraws::new([0.0]));
        let row = SourceRow {
            row: 1,
            record: Ok(RawRecord {
                puzzle_id: Some("x".to_string()),
                fen: Some("garbage".to_string()),
                rating: Some("599".to_string()),
                ..RawRecord::default()
            }),
        };
        assert_eq!(
            ingestor.ingest(row),
            RecordOutcome::Skipped(SkipReason::OutOfRange(599))
        );
    }

    #[test]
    fn test_decode_failure_counts_as_malformed_even_when_sampled() {
        let mut ingestor = Ingestor::new(&config(1.0), FixedDraws::new([0.0]));
        let row = SourceRow {
            row: 7,
            record: Err(MalformedRecord::new("invalid utf-8").at_row(7)),
        };
        assert!(matches!(
            ingestor.ingest(row),
            RecordOutcome::Skipped(SkipReason::Malformed(_))
        ));
    }

    #[test]
    fn test_full_rate_keeps_every_in_range_record() {
        let data = csv(&[
            csv_row("a", FEN_W, "e2e4 e7e5 g1f3", "600", "fork"),
            csv_row("b", FEN_B, "e7e5", "599", "pin"),
            csv_row("c", FEN_W, "", "2000", "mateIn1"),
            csv_row("d", FEN_W, "", "2001", "mateIn1"),
            csv_row("e", FEN_B, "d7d5 c2c4", "1450", "quietMove fork"),
            csv_row("f", FEN_W, "a2a3", "not-a-number", "fork"),
            csv_row("g", FEN_W, "a2a3", "799", ""),
        ]);

        let run = run_bytes(&data, &config(1.0), RngDraw::from_seed(Some(1)));

        assert_eq!(ids(&run, Tier::Beginner), ["a", "g"]);
        assert_eq!(ids(&run, Tier::Expert), ["e"]);
        assert_eq!(ids(&run, Tier::Master), ["c"]);
        assert!(ids(&run, Tier::Easy).is_empty());
        assert_eq!(run.document.meta.total_puzzles, 4);
        assert_eq!(run.document.meta.sample_rate, "100%");
        assert_eq!(run.stats.out_of_range, 2);
        assert_eq!(run.stats.malformed, 1);
        assert_eq!(run.stats.kept, 4);

        let expert = &run.document.tiers.get(Tier::Expert)[0];
        assert_eq!(expert.title, "Quiet Move");
        assert_eq!(expert.hint, "Look for a fork attacking multiple pieces!");
        assert_eq!(expert.player_moves(), ["d7d5"]);
    }

    #[test]
    fn test_total_matches_bucket_sum() {
        let rows: Vec<String> = (0..300)
            .map(|i| csv_row(&format!("p{i}"), FEN_W, "e2e4", &(500 + i * 7).to_string(), "fork"))
            .collect();
        let run = run_bytes(&csv(&rows), &config(0.5), RngDraw::from_seed(Some(3)));

        let total = run.document.meta.total_puzzles;
        assert_eq!(total, run.document.tiers.total());
        let bucket_sum: usize = run.document.tiers.counts().iter().map(|(_, n)| n).sum();
        assert_eq!(total, bucket_sum);
        assert_eq!(total as u64, run.stats.kept);

        for tier in Tier::ALL {
            for puzzle in run.document.tiers.get(tier) {
                assert!((600..=2000).contains(&puzzle.rating));
                assert_eq!(Tier::classify(puzzle.rating), tier);
            }
        }
    }

    #[test]
    fn test_fixed_draws_select_exact_rows_in_order() {
        let data = csv(&[
            csv_row("a", FEN_W, "", "900", ""),
            csv_row("b", FEN_W, "", "910", ""),
            csv_row("c", FEN_W, "", "920", ""),
            csv_row("d", FEN_W, "", "930", ""),
        ]);
        let draws = FixedDraws::new([0.01, 0.5, 0.02, 0.02]);
        let run = run_bytes(&data, &config(0.02), draws);

        assert_eq!(ids(&run, Tier::Easy), ["a", "c", "d"]);
        assert_eq!(run.stats.not_sampled, 1);
        assert_eq!(run.document.meta.sample_rate, "2%");
    }

    #[test]
    fn test_tiny_rate_keeps_nearly_nothing() {
        let rows: Vec<String> = (0..2_000)
            .map(|i| csv_row(&format!("p{i}"), FEN_W, "", "1000", ""))
            .collect();
        let run = run_bytes(&csv(&rows), &config(1e-9), RngDraw::from_seed(Some(11)));
        assert!(run.document.meta.total_puzzles <= 1);
        assert_eq!(run.stats.scanned, 2_000);
    }

    #[test]
    fn test_invalid_config_fails_before_reading() {
        let err = run(
            std::iter::empty::<Result<PuzzleSource<&[u8]>, PipelineError>>(),
            &config(0.0),
            FixedDraws::new([0.0]),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_empty_source_gives_empty_document() {
        let run = run_bytes(&format!("{HEADER}\n"), &config(1.0), FixedDraws::new([0.0]));
        assert_eq!(run.document.meta.total_puzzles, 0);
        assert_eq!(run.stats, RunStats::default());
    }

    #[test]
    fn test_source_without_themes_column_is_all_malformed() {
        let data = format!(
            "PuzzleId,FEN,Moves,Rating\n\
             a,{FEN_W},e2e4,900\n\
             b,{FEN_B},d7d5,1500\n"
        );
        let run = run_bytes(&data, &config(1.0), FixedDraws::new([0.0]));
        assert_eq!(run.document.meta.total_puzzles, 0);
        assert_eq!(run.stats.malformed, 2);
        assert_eq!(run.stats.kept, 0);
    }

    #[test]
    fn test_progress_interval_does_not_change_output() {
        let rows: Vec<String> = (0..50)
            .map(|i| {
                let rating = (600 + i * 30).to_string();
                csv_row(&format!("p{i}"), FEN_W, "e2e4 e7e5", &rating, "fork")
            })
            .collect();
        let data = csv(&rows);
        let draws: Vec<f64> = (0..50).map(|i| if i % 3 == 0 { 0.9 } else { 0.1 }).collect();

        let chatty = PipelineConfig {
            progress_interval: 1,
            ..config(0.5)
        };
        let quiet = config(0.5);
        let with_progress = run_bytes(&data, &chatty, FixedDraws::new(draws.clone()));
        let default_progress = run_bytes(&data, &quiet, FixedDraws::new(draws));

        assert_eq!(with_progress, default_progress);
        assert!(with_progress.stats.not_sampled > 0);
        assert!(with_progress.document.meta.total_puzzles > 0);
    }

    #[test]
    fn test_export_writes_document_across_glob() {
        let dir = tempfile::tempdir().unwrap();
        let first = csv(&[csv_row("a", FEN_W, "e2e4 e7e5 d2d4", "700", "fork")]);
        let second = csv(&[csv_row("b", FEN_B, "e7e5", "1750", "pin")]);
        File::create(dir.path().join("part-1.csv"))
            .unwrap()
            .write_all(first.as_bytes())
            .unwrap();
        let compressed = zstd::stream::encode_all(second.as_bytes(), 0).unwrap();
        File::create(dir.path().join("part-2.csv.zst"))
            .unwrap()
            .write_all(&compressed)
            .unwrap();

        let output = dir.path().join("puzzles.json");
        let pattern = format!("{}/part-*", dir.path().display());
        let run = export(&pattern, None, &output, &config(1.0), FixedDraws::new([0.0])).unwrap();
        assert_eq!(run.document.meta.total_puzzles, 2);

        let written: OutputDocument =
            serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
        assert_eq!(written, run.document);
        assert_eq!(written.tiers.get(Tier::Beginner)[0].player_moves(), ["e2e4", "d2d4"]);
        assert_eq!(written.tiers.get(Tier::Master)[0].hint, "Can you pin a piece?");
    }

    #[test]
    fn test_export_missing_source_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("puzzles.json");
        let missing = dir.path().join("nope.csv");

        let err = export(
            &missing.display().to_string(),
            None,
            &output,
            &config(1.0),
            FixedDraws::new([0.0]),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Source { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_export_unwritable_destination_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("puzzles.csv");
        std::fs::write(&input, csv(&[csv_row("a", FEN_W, "", "700", "")])).unwrap();
        let output = dir.path().join("no-such-dir").join("puzzles.json");

        let err = export(
            &input.display().to_string(),
            None,
            &output,
            &config(1.0),
            FixedDraws::new([0.0]),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Destination { .. }));
    }
}
