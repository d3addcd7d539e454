//! Single-elimination bracket engine.
//!
//! - [`BracketManager::build_bracket`] rebuilds the whole match tree of a
//!   tournament in one transaction
//! - [`BracketManager::submit_result`] records one match score and moves a
//!   decisive winner one round forward
//! - [`BracketManager::get_bracket`] assembles the persisted state into rounds
//!
//! ## Example
//!
//! ```no_run
//! use tourney::bracket::{BracketManager, BuildRequest, PlayerSeed, ResultSubmission};
//! use tourney::db::MemoryStore;
//! use tourney::tournament::{TournamentConfig, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let tournaments = TournamentManager::new(store.clone());
//!     let brackets = BracketManager::new(store);
//!
//!     let cup = tournaments
//!         .create_tournament(1, TournamentConfig::single_elimination("Cup", 4))
//!         .await?;
//!
//!     let players = ["A", "B", "C", "D"]
//!         .iter()
//!         .enumerate()
//!         .map(|(i, name)| PlayerSeed::new(*name, i as i32 + 1))
//!         .collect();
//!     brackets
//!         .build_bracket(cup.id, 1, BuildRequest { players, bracket: Default::default() })
//!         .await?;
//!
//!     let submission = ResultSubmission { round: 0, match_index: 0, score1: 11, score2: 3 };
//!     brackets.submit_result(cup.id, 1, submission).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod advancement;
pub mod builder;
pub mod ledger;
pub mod models;
pub mod reader;
pub mod seeding;

pub use advancement::{Advancement, Placement, Scoreline};
pub use ledger::LedgerPolicy;
pub use models::{
    BracketShape, BracketView, BuildOutcome, BuildRequest, EntryView, MatchView, PlayerSeed,
    RecordedResult, ResultSubmission, ShapeMatch, SlotView,
};
pub use seeding::{bracket_rounds, round_size, seed_order, seeded_shape};

use std::sync::Arc;

/// Bracket manager
pub struct BracketManager<S> {
    store: Arc<S>,
    policy: LedgerPolicy,
}

impl<S> Clone for BracketManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: self.policy,
        }
    }
}

impl<S> BracketManager<S> {
    /// Create a bracket manager with the default ledger policy
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            policy: LedgerPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: LedgerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }
}
