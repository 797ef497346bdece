use shakmaty::Color;

use crate::error::{ErrorAccumulator, MalformedRecord};
use crate::themes::{hint_for, split_themes, title_for};
use crate::types::{MoveList, Puzzle, RawRecord};

/// Keeps the player's moves from a Lichess move list.
///
/// Lichess lists alternate player and opponent replies starting with the
/// player, so the solution is every even-indexed move.
pub fn extract_solution(moves: &str) -> MoveList {
    moves
        .split_whitespace()
        .step_by(2)
        .map(str::to_string)
        .collect()
}

/// Side to move from the second FEN field. Only `w` and `b` are accepted.
pub fn side_to_move(fen: &str) -> Result<Color, String> {
    let field = fen
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| format!("FEN='{}' has no side-to-move field", fen))?;

    let mut chars = field.chars();
    match (chars.next().and_then(Color::from_char), chars.next()) {
        (Some(color), None) => Ok(color),
        _ => Err(format!(
            "FEN='{}' has side-to-move '{}', expected 'w' or 'b'",
            fen, field
        )),
    }
}

pub fn parse_rating(raw: &str) -> Result<i64, String> {
    raw.trim()
        .parse::<i64>()
        .map_err(|e| format!("Rating='{}' is not an integer: {}", raw, e))
}

/// Converts one raw CSV row into a [`Puzzle`].
///
/// Every problem with the row is collected before failing, so the error
/// names all missing or unparseable fields at once.
pub fn parse_record(raw: &RawRecord) -> Result<Puzzle, MalformedRecord> {
    let mut problems = ErrorAccumulator::default();

    let id = match raw.puzzle_id.as_deref() {
        Some(id) if !id.trim().is_empty() => Some(id),
        Some(_) => {
            problems.push("PuzzleId is empty");
            None
        }
        None => {
            problems.push("missing PuzzleId");
            None
        }
    };

    let fen = raw.fen.as_deref();
    let to_move = match fen {
        Some(fen) => side_to_move(fen)
            .map_err(|e| problems.push(&e))
            .ok(),
        None => {
            problems.push("missing FEN");
            None
        }
    };

    let rating = match raw.rating.as_deref() {
        Some(rating) => parse_rating(rating).map_err(|e| problems.push(&e)).ok(),
        None => {
            problems.push("missing Rating");
            None
        }
    };

    let themes = match raw.themes.as_deref() {
        Some(themes) => Some(split_themes(themes)),
        None => {
            problems.push("missing Themes");
            None
        }
    };

    match (id, fen, to_move, rating, themes) {
        (Some(id), Some(fen), Some(to_move), Some(rating), Some(themes)) => {
            let solution = raw
                .moves
                .as_deref()
                .map(extract_solution)
                .unwrap_or_default();

            Ok(Puzzle {
                id: id.to_string(),
                fen: fen.to_string(),
                solution: [solution],
                hint: hint_for(&themes).to_string(),
                title: title_for(&themes).to_string(),
                to_move,
                rating,
                themes,
            })
        }
        _ => Err(MalformedRecord::new(
            problems
                .take()
                .unwrap_or_else(|| "incomplete record".to_string()),
        )),
    }
}
