//! Request, outcome and view types of the bracket engine.

use serde::{Deserialize, Serialize};

use super::advancement::Advancement;
use crate::tournament::{
    Entry, EntryId, MatchRecord, MatchResult, MatchStatus, TBD_NAME, Tournament,
};

/// A player as submitted by the caller
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerSeed {
    #[serde(default)]
    pub name: String,
    /// Zero means unseeded
    #[serde(default)]
    pub seed: i32,
}

impl PlayerSeed {
    pub fn new(name: impl Into<String>, seed: i32) -> Self {
        Self {
            name: name.into(),
            seed,
        }
    }

    /// Slot that is decided later in the tournament
    pub fn undecided() -> Self {
        Self::new(TBD_NAME, 0)
    }
}

/// One match of a submitted bracket shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeMatch {
    pub player1: PlayerSeed,
    pub player2: PlayerSeed,
    #[serde(default)]
    pub score1: i32,
    #[serde(default)]
    pub score2: i32,
}

impl ShapeMatch {
    pub fn new(player1: PlayerSeed, player2: PlayerSeed) -> Self {
        Self {
            player1,
            player2,
            score1: 0,
            score2: 0,
        }
    }

    pub fn with_scores(mut self, score1: i32, score2: i32) -> Self {
        self.score1 = score1;
        self.score2 = score2;
        self
    }
}

/// Rounds of matches, first round first
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BracketShape(pub Vec<Vec<ShapeMatch>>);

impl BracketShape {
    pub fn rounds(&self) -> &[Vec<ShapeMatch>] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Input of a bracket build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub players: Vec<PlayerSeed>,
    /// Empty means "generate the standard seeded shape"
    #[serde(default)]
    pub bracket: BracketShape,
}

/// Result of a bracket build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutcome {
    pub bracket: BracketShape,
    pub matches_created: usize,
}

/// A score submission addressed by zero-based round and match index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSubmission {
    pub round: u32,
    #[serde(alias = "matchIndex")]
    pub match_index: u32,
    pub score1: i32,
    pub score2: i32,
}

/// What a submission wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedResult {
    pub result: MatchResult,
    pub status: MatchStatus,
    /// `None` when the result was a tie
    pub advancement: Option<Advancement>,
}

/// One side of a match as shown to readers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub name: String,
    pub seed: i32,
    pub id: Option<EntryId>,
}

/// A match as shown to readers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchView {
    pub player1: SlotView,
    pub player2: SlotView,
    pub score1: i32,
    pub score2: i32,
    pub status: MatchStatus,
}

/// An entry as shown to readers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    pub id: EntryId,
    pub name: String,
    pub seed: i32,
}

impl From<&Entry> for EntryView {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            name: entry.player_name.clone(),
            seed: entry.seed_number,
        }
    }
}

/// Full read model of a tournament's bracket
#[derive(Debug, Clone, Serialize)]
pub struct BracketView {
    pub tournament: Tournament,
    pub entries: Vec<EntryView>,
    /// Zero-based rounds of matches ordered by match number
    pub bracket: Vec<Vec<MatchView>>,
    pub matches: Vec<MatchRecord>,
    /// Winner of the final once it is decided
    pub champion: Option<SlotView>,
}
