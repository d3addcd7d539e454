//! # Tourney
//!
//! A single-elimination tournament bracket engine backed by PostgreSQL.
//!
//! Given the registered players of a tournament the engine builds the full
//! match tree, records per-match scores and moves each decided winner into
//! the correct slot of the next round. Every write runs inside one store
//! transaction and each transaction first locks its tournament row, so
//! writers on the same tournament are serialized.
//!
//! ## Core Modules
//!
//! - [`bracket`]: bracket builder, match ledger, advancement rule and reader
//! - [`tournament`]: tournament records, entries and the shared data model
//! - [`db`]: store traits with PostgreSQL and in-memory backends
//!
//! ## Example
//!
//! ```
//! use tourney::bracket::{Placement, Scoreline};
//! use tourney::tournament::SlotPosition;
//!
//! // Winner of the second first-round match lands in the final's second slot
//! let placement = Placement::for_match(0, 1).unwrap();
//! assert_eq!((placement.round_number, placement.match_number), (2, 1));
//! assert_eq!(placement.position, SlotPosition::Player2);
//!
//! assert_eq!(Scoreline::new(3, 11).unwrap().winner(), Some(SlotPosition::Player2));
//! ```

/// Bracket construction, result recording, winner advancement and read model.
pub mod bracket;
pub use bracket::{BracketManager, LedgerPolicy};

/// Persistence layer.
pub mod db;
pub use db::{BracketStore, MemoryStore, PgStore, StoreTx};

/// Tournament records and data model.
pub mod tournament;
pub use tournament::{TournamentError, TournamentManager, TournamentResult};
