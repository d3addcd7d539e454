//! Tournament data models: tournaments, entries, matches and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{TournamentError, TournamentResult};

/// Tournament ID type
pub type TournamentId = i64;

/// Entry ID type
pub type EntryId = i64;

/// Match ID type
pub type MatchId = i64;

/// Match result ID type
pub type ResultId = i64;

/// User ID type (the authenticated caller)
pub type UserId = i64;

/// Name persisted for a BYE slot.
pub const BYE_NAME: &str = "BYE";

/// Name persisted for a slot that is not decided yet.
pub const TBD_NAME: &str = "TBD";

/// Default player cap for new tournaments
pub const DEFAULT_MAX_PLAYERS: i32 = 16;

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Created, not open yet
    Draft,
    /// Accepting entries
    Registration,
    /// Matches are being played
    Active,
    /// Finished
    Completed,
    /// Called off
    Cancelled,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Draft => "draft",
            TournamentStatus::Registration => "registration",
            TournamentStatus::Active => "active",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> TournamentResult<Self> {
        match value {
            "draft" => Ok(TournamentStatus::Draft),
            "registration" => Ok(TournamentStatus::Registration),
            "active" => Ok(TournamentStatus::Active),
            "completed" => Ok(TournamentStatus::Completed),
            "cancelled" => Ok(TournamentStatus::Cancelled),
            other => Err(TournamentError::Storage(format!(
                "unknown tournament status '{other}'"
            ))),
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tournament format.
///
/// Only single elimination has bracket logic; the other formats can be stored
/// but a bracket cannot be built for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentType {
    #[default]
    SingleElimination,
    DoubleElimination,
    RoundRobin,
}

impl TournamentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentType::SingleElimination => "single_elimination",
            TournamentType::DoubleElimination => "double_elimination",
            TournamentType::RoundRobin => "round_robin",
        }
    }

    pub fn parse(value: &str) -> TournamentResult<Self> {
        match value {
            "single_elimination" => Ok(TournamentType::SingleElimination),
            "double_elimination" => Ok(TournamentType::DoubleElimination),
            "round_robin" => Ok(TournamentType::RoundRobin),
            other => Err(TournamentError::Storage(format!(
                "unknown tournament type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for TournamentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
    Bye,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
            MatchStatus::Bye => "bye",
        }
    }

    pub fn parse(value: &str) -> TournamentResult<Self> {
        match value {
            "pending" => Ok(MatchStatus::Pending),
            "in_progress" => Ok(MatchStatus::InProgress),
            "completed" => Ok(MatchStatus::Completed),
            "cancelled" => Ok(MatchStatus::Cancelled),
            "bye" => Ok(MatchStatus::Bye),
            other => Err(TournamentError::Storage(format!(
                "unknown match status '{other}'"
            ))),
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tournament record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub description: Option<String>,
    pub tournament_type: TournamentType,
    pub max_players: i32,
    /// Entry fee in minor currency units
    pub entry_fee: i64,
    pub status: TournamentStatus,
    pub created_by: UserId,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_on: DateTime<Utc>,
    pub modified_on: DateTime<Utc>,
}

fn default_max_players() -> i32 {
    DEFAULT_MAX_PLAYERS
}

/// Settings for a new tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tournament_type: TournamentType,
    #[serde(default = "default_max_players")]
    pub max_players: i32,
    #[serde(default)]
    pub entry_fee: i64,
}

impl TournamentConfig {
    /// Create a single-elimination configuration with default fee and description
    pub fn single_elimination(name: impl Into<String>, max_players: i32) -> Self {
        Self {
            name: name.into(),
            description: None,
            tournament_type: TournamentType::SingleElimination,
            max_players,
            entry_fee: 0,
        }
    }

    /// Validate user-supplied fields
    pub fn validate(&self) -> TournamentResult<()> {
        validate_fields(&self.name, self.max_players, self.entry_fee)
    }
}

/// Replacement values for an existing tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentUpdate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub max_players: i32,
    #[serde(default)]
    pub entry_fee: i64,
}

impl TournamentUpdate {
    pub fn validate(&self) -> TournamentResult<()> {
        validate_fields(&self.name, self.max_players, self.entry_fee)
    }
}

fn validate_fields(name: &str, max_players: i32, entry_fee: i64) -> TournamentResult<()> {
    if name.trim().is_empty() {
        return Err(TournamentError::validation("Tournament name is required"));
    }
    if max_players < 2 {
        return Err(TournamentError::validation(
            "max_players must be at least 2",
        ));
    }
    if entry_fee < 0 {
        return Err(TournamentError::validation("entry_fee cannot be negative"));
    }
    Ok(())
}

/// A registered player in one tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub tournament_id: TournamentId,
    pub player_name: String,
    pub seed_number: i32,
}

/// Tournament with its active entries
#[derive(Debug, Clone, Serialize)]
pub struct TournamentDetails {
    #[serde(flatten)]
    pub tournament: Tournament,
    pub entries: Vec<Entry>,
    pub entries_count: usize,
}

/// One of the two opponent positions in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPosition {
    Player1,
    Player2,
}

/// Occupant of a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Slot {
    /// A registered entry
    Entry { id: EntryId, name: String },
    /// No opponent; the other side advances automatically
    Bye,
    /// Not decided yet
    Open,
}

impl Slot {
    /// Rebuild a slot from its persisted `(player_id, player_name)` pair
    pub fn from_columns(id: Option<EntryId>, name: Option<String>) -> Self {
        match (id, name) {
            (Some(id), name) => Slot::Entry {
                id,
                name: name.unwrap_or_default(),
            },
            (None, Some(name)) if name == BYE_NAME => Slot::Bye,
            _ => Slot::Open,
        }
    }

    /// Persisted `(player_id, player_name)` pair
    pub fn columns(&self) -> (Option<EntryId>, &str) {
        match self {
            Slot::Entry { id, name } => (Some(*id), name.as_str()),
            Slot::Bye => (None, BYE_NAME),
            Slot::Open => (None, TBD_NAME),
        }
    }

    pub fn is_bye(&self) -> bool {
        matches!(self, Slot::Bye)
    }
}

/// A match in the bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    /// One-based round
    pub round_number: i32,
    /// One-based position within the round
    pub match_number: i32,
    pub player1: Slot,
    pub player2: Slot,
    pub status: MatchStatus,
}

impl Match {
    pub fn slot(&self, position: SlotPosition) -> &Slot {
        match position {
            SlotPosition::Player1 => &self.player1,
            SlotPosition::Player2 => &self.player2,
        }
    }

    /// Either side is a BYE
    pub fn has_bye(&self) -> bool {
        self.player1.is_bye() || self.player2.is_bye()
    }
}

/// Values for inserting (or reviving) a match row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub tournament_id: TournamentId,
    pub round_number: i32,
    pub match_number: i32,
    pub player1: Slot,
    pub player2: Slot,
    pub status: MatchStatus,
}

impl NewMatch {
    /// TBD-vs-TBD match used when a result arrives for a slot that was never built
    pub fn placeholder(tournament_id: TournamentId, round_number: i32, match_number: i32) -> Self {
        Self {
            tournament_id,
            round_number,
            match_number,
            player1: Slot::Open,
            player2: Slot::Open,
            status: MatchStatus::Pending,
        }
    }
}

/// The single active score row of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: ResultId,
    pub match_id: MatchId,
    pub tournament_id: TournamentId,
    pub player1_score: i32,
    pub player2_score: i32,
}

/// Match row joined with its active result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    #[serde(flatten)]
    pub match_row: Match,
    pub result: Option<MatchResult>,
}

/// Denormalized copy of the submitted bracket, kept for audit only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BracketSnapshot {
    pub tournament_id: TournamentId,
    pub bracket_data: serde_json::Value,
    pub last_updated_by: UserId,
    pub modified_on: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_column_text() {
        for status in [
            TournamentStatus::Draft,
            TournamentStatus::Registration,
            TournamentStatus::Active,
            TournamentStatus::Completed,
            TournamentStatus::Cancelled,
        ] {
            assert_eq!(TournamentStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(TournamentStatus::parse("in_progress").is_err());
    }

    #[test]
    fn test_slot_columns() {
        let entry = Slot::Entry {
            id: 7,
            name: "Alice".to_string(),
        };
        assert_eq!(entry.columns(), (Some(7), "Alice"));
        assert_eq!(Slot::Bye.columns(), (None, BYE_NAME));
        assert_eq!(Slot::Open.columns(), (None, TBD_NAME));

        assert_eq!(Slot::from_columns(None, Some("BYE".to_string())), Slot::Bye);
        assert_eq!(Slot::from_columns(None, Some("TBD".to_string())), Slot::Open);
        assert_eq!(Slot::from_columns(None, None), Slot::Open);
        assert_eq!(
            Slot::from_columns(Some(7), Some("Alice".to_string())),
            entry
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(TournamentConfig::single_elimination("Cup", 8).validate().is_ok());
        assert!(TournamentConfig::single_elimination("  ", 8).validate().is_err());
        assert!(TournamentConfig::single_elimination("Cup", 1).validate().is_err());

        let mut config = TournamentConfig::single_elimination("Cup", 8);
        config.entry_fee = -5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: TournamentConfig =
            serde_json::from_str(r#"{"name": "Friday Darts"}"#).unwrap();
        assert_eq!(config.tournament_type, TournamentType::SingleElimination);
        assert_eq!(config.max_players, DEFAULT_MAX_PLAYERS);
        assert_eq!(config.entry_fee, 0);
    }

    #[test]
    fn test_match_has_bye() {
        let m = Match {
            id: 1,
            tournament_id: 1,
            round_number: 1,
            match_number: 1,
            player1: Slot::Entry {
                id: 3,
                name: "A".to_string(),
            },
            player2: Slot::Bye,
            status: MatchStatus::Completed,
        };
        assert!(m.has_bye());
        assert_eq!(m.slot(SlotPosition::Player2), &Slot::Bye);
    }
}
