use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Puzzle;

/// Lowest rating any tier covers.
pub const TIER_FLOOR: i64 = 600;

/// Rating bucket. Variant order is the document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Beginner,
    Easy,
    Intermediate,
    Advanced,
    Expert,
    Master,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Beginner,
        Tier::Easy,
        Tier::Intermediate,
        Tier::Advanced,
        Tier::Expert,
        Tier::Master,
    ];

    /// Total over ratings at or above [`TIER_FLOOR`]; everything from 1700 up
    /// is master. Callers filter out lower ratings beforehand.
    pub fn classify(rating: i64) -> Tier {
        match rating {
            ..800 => Tier::Beginner,
            800..1000 => Tier::Easy,
            1000..1200 => Tier::Intermediate,
            1200..1400 => Tier::Advanced,
            1400..1700 => Tier::Expert,
            _ => Tier::Master,
        }
    }

    /// Like [`Tier::classify`] but `None` below [`TIER_FLOOR`].
    pub fn for_rating(rating: i64) -> Option<Tier> {
        (rating >= TIER_FLOOR).then(|| Tier::classify(rating))
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Beginner => "beginner",
            Tier::Easy => "easy",
            Tier::Intermediate => "intermediate",
            Tier::Advanced => "advanced",
            Tier::Expert => "expert",
            Tier::Master => "master",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Puzzles grouped by tier. All six tiers are always present; within a tier
/// puzzles keep the order they were added in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierBuckets(BTreeMap<Tier, Vec<Puzzle>>);

impl Default for TierBuckets {
    fn default() -> Self {
        Self(Tier::ALL.into_iter().map(|tier| (tier, Vec::new())).collect())
    }
}

impl TierBuckets {
    pub fn from_puzzles(puzzles: impl IntoIterator<Item = Puzzle>) -> Self {
        let mut buckets = Self::default();
        for puzzle in puzzles {
            buckets.push(puzzle);
        }
        buckets
    }

    pub fn push(&mut self, puzzle: Puzzle) {
        self.0
            .entry(Tier::classify(puzzle.rating))
            .or_default()
            .push(puzzle);
    }

    pub fn get(&self, tier: Tier) -> &[Puzzle] {
        self.0.get(&tier).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn counts(&self) -> [(Tier, usize); 6] {
        Tier::ALL.map(|tier| (tier, self.get(tier).len()))
    }

    pub fn total(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}
