//! Tournament records, entries and the shared data model.
//!
//! This module provides:
//! - Tournament creation, update, status transitions and soft deletion
//! - Entry registration with seed defaults
//! - The match, slot and result types the bracket engine operates on
//!
//! ## Example
//!
//! ```no_run
//! use tourney::db::MemoryStore;
//! use tourney::tournament::{TournamentConfig, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(Arc::new(MemoryStore::new()));
//!
//!     let config = TournamentConfig::single_elimination("Friday Darts", 8);
//!     let tournament = manager.create_tournament(1, config).await?;
//!     manager.register_entry(tournament.id, 1, "Alice", None).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{TournamentError, TournamentResult};
pub use manager::{DEFAULT_SHARE_BASE_URL, TournamentManager};
pub use models::{
    BYE_NAME, BracketSnapshot, DEFAULT_MAX_PLAYERS, Entry, EntryId, Match, MatchId, MatchRecord,
    MatchResult, MatchStatus, NewMatch, ResultId, Slot, SlotPosition, TBD_NAME, Tournament,
    TournamentConfig, TournamentDetails, TournamentId, TournamentStatus, TournamentType,
    TournamentUpdate, UserId,
};
