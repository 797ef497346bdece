//! Theme tag lookups for puzzle titles and hints.
//!
//! Titles and hints use two separate tables with different precedence:
//! - title: the first theme *in the puzzle's own order* that has a label
//! - hint: the first entry *of `HINT_PRIORITY`* present in the puzzle's themes
//!
//! `["quietMove", "fork"]` therefore gets the title "Quiet Move" and the fork
//! hint. Client output depends on this, so the tables must stay separate.

pub const DEFAULT_TITLE: &str = "Tactical Puzzle";
pub const DEFAULT_HINT: &str = "Find the best move!";

const THEME_TITLES: [(&str, &str); 15] = [
    ("fork", "Fork"),
    ("pin", "Pin"),
    ("skewer", "Skewer"),
    ("discoveredAttack", "Discovered Attack"),
    ("doubleCheck", "Double Check"),
    ("mateIn1", "Mate in 1"),
    ("mateIn2", "Mate in 2"),
    ("mateIn3", "Mate in 3"),
    ("hangingPiece", "Hanging Piece"),
    ("sacrifice", "Sacrifice"),
    ("crushing", "Crushing Move"),
    ("defensiveMove", "Defense"),
    ("quietMove", "Quiet Move"),
    ("attackingF2F7", "f7 Attack"),
    ("advantage", "Winning Advantage"),
];

const HINT_PRIORITY: [(&str, &str); 8] = [
    ("fork", "Look for a fork attacking multiple pieces!"),
    ("pin", "Can you pin a piece?"),
    ("skewer", "Attack through one piece to another!"),
    ("mateIn1", "Checkmate in one move!"),
    ("mateIn2", "Force checkmate in two moves!"),
    ("hangingPiece", "There's an undefended piece!"),
    ("sacrifice", "A sacrifice leads to victory!"),
    ("discoveredAttack", "Move one piece to unleash another!"),
];

fn title_label(theme: &str) -> Option<&'static str> {
    THEME_TITLES
        .iter()
        .find(|(key, _)| *key == theme)
        .map(|(_, label)| *label)
}

pub fn title_for<S: AsRef<str>>(themes: &[S]) -> &'static str {
    themes
        .iter()
        .find_map(|theme| title_label(theme.as_ref()))
        .unwrap_or(DEFAULT_TITLE)
}

pub fn hint_for<S: AsRef<str>>(themes: &[S]) -> &'static str {
    HINT_PRIORITY
        .iter()
        .find(|(key, _)| themes.iter().any(|theme| theme.as_ref() == *key))
        .map(|(_, hint)| *hint)
        .unwrap_or(DEFAULT_HINT)
}

/// Splits a Lichess `Themes` field into tags, order and duplicates kept.
pub fn split_themes(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
