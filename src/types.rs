use serde::{Deserialize, Serialize};
use shakmaty::Color;
use smallvec::SmallVec;

/// Player moves of one puzzle. Lichess solutions rarely exceed a handful of
/// moves, so they stay inline.
pub type MoveList = SmallVec<[String; 8]>;

/// One row of the Lichess puzzle CSV, fields as read.
///
/// A field is `None` when its column is absent from the header or the row
/// is short.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub puzzle_id: Option<String>,
    pub fen: Option<String>,
    pub moves: Option<String>,
    pub rating: Option<String>,
    pub themes: Option<String>,
}

/// Normalized puzzle as consumed by the client application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    pub id: String,
    pub fen: String,
    pub solution: [MoveList; 1],
    pub hint: String,
    pub title: String,
    #[serde(rename = "toMove", with = "side_to_move")]
    pub to_move: Color,
    pub rating: i64,
    pub themes: Vec<String>,
}

impl Puzzle {
    pub fn player_moves(&self) -> &[String] {
        &self.solution[0]
    }
}

pub fn side_to_move_label(color: Color) -> &'static str {
    color.fold_wb("White", "Black")
}

pub(crate) mod side_to_move {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use shakmaty::Color;

    pub fn serialize<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(super::side_to_move_label(*color))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Color, D::Error> {
        let label = String::deserialize(deserializer)?;
        match label.as_str() {
            "White" => Ok(Color::White),
            "Black" => Ok(Color::Black),
            other => Err(D::Error::custom(format!(
                "expected \"White\" or \"Black\", got \"{}\"",
                other
            ))),
        }
    }
}
