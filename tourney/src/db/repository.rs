//! Repository trait definitions for testability and dependency injection.
//!
//! Reads that need no isolation go through [`BracketStore`]. Every write runs
//! inside a [`StoreTx`] obtained from [`BracketStore::begin`] and is finished
//! with [`complete_transaction`], so each exit path either commits or rolls back.

use async_trait::async_trait;

use crate::tournament::{
    BracketSnapshot, Entry, Match, MatchId, MatchRecord, MatchResult, MatchStatus,
    NewMatch, ResultId, Slot, SlotPosition, Tournament, TournamentConfig, TournamentId,
    TournamentResult, TournamentStatus, TournamentUpdate, UserId,
};

/// Persistent store for tournaments and their brackets
#[async_trait]
pub trait BracketStore: Send + Sync + 'static {
    /// Transaction handle produced by [`BracketStore::begin`]
    type Tx: StoreTx;

    /// Open a write transaction
    async fn begin(&self) -> TournamentResult<Self::Tx>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> TournamentResult<()>;

    /// Find an active tournament
    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>>;

    /// Active tournaments created by `owner`, newest first
    async fn list_tournaments(&self, owner: UserId) -> TournamentResult<Vec<Tournament>>;

    /// Active entries ordered by seed, then id
    async fn list_entries(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Entry>>;

    /// Active matches joined with their active result, ordered by round then match number
    async fn list_matches(&self, tournament_id: TournamentId)
    -> TournamentResult<Vec<MatchRecord>>;

    /// Active bracket snapshot
    async fn find_snapshot(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Option<BracketSnapshot>>;
}

/// Operations available inside one write transaction.
///
/// Every method filters soft-deleted rows unless it says otherwise.
#[async_trait]
pub trait StoreTx: Send {
    /// Lock the tournament row for the rest of the transaction and return it.
    ///
    /// Writers on the same tournament are serialized behind this lock.
    async fn lock_tournament(&mut self, id: TournamentId) -> TournamentResult<Option<Tournament>>;

    async fn find_tournament_by_name(
        &mut self,
        owner: UserId,
        name: &str,
    ) -> TournamentResult<Option<Tournament>>;

    async fn insert_tournament(
        &mut self,
        owner: UserId,
        config: &TournamentConfig,
    ) -> TournamentResult<Tournament>;

    async fn update_tournament(
        &mut self,
        id: TournamentId,
        update: &TournamentUpdate,
    ) -> TournamentResult<Tournament>;

    /// Change status. Moving to `active` stamps `start_date`, moving to
    /// `completed` or `cancelled` stamps `end_date`.
    async fn set_tournament_status(
        &mut self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> TournamentResult<Tournament>;

    /// Soft-delete the tournament together with its entries, matches, results and snapshot
    async fn soft_delete_tournament(&mut self, id: TournamentId) -> TournamentResult<()>;

    /// Soft-delete entries, matches, results and snapshot, keeping the tournament
    async fn soft_delete_bracket(&mut self, id: TournamentId) -> TournamentResult<()>;

    async fn find_entry(
        &mut self,
        tournament_id: TournamentId,
        player_name: &str,
    ) -> TournamentResult<Option<Entry>>;

    async fn count_entries(&mut self, tournament_id: TournamentId) -> TournamentResult<i64>;

    /// Find-or-create by `(tournament_id, player_name)`, reactivating a
    /// soft-deleted row and overwriting its seed
    async fn upsert_entry(
        &mut self,
        tournament_id: TournamentId,
        player_name: &str,
        seed_number: i32,
    ) -> TournamentResult<Entry>;

    /// Insert or revive the match at `(tournament_id, round_number, match_number)`,
    /// overwriting both slots and the status
    async fn upsert_match(&mut self, new_match: &NewMatch) -> TournamentResult<Match>;

    async fn find_match(
        &mut self,
        tournament_id: TournamentId,
        round_number: i32,
        match_number: i32,
    ) -> TournamentResult<Option<Match>>;

    /// Overwrite one slot, leaving the other untouched
    async fn assign_slot(
        &mut self,
        match_id: MatchId,
        position: SlotPosition,
        slot: &Slot,
    ) -> TournamentResult<()>;

    async fn set_match_status(
        &mut self,
        match_id: MatchId,
        status: MatchStatus,
    ) -> TournamentResult<()>;

    async fn find_active_result(&mut self, match_id: MatchId)
    -> TournamentResult<Option<MatchResult>>;

    async fn insert_result(
        &mut self,
        match_id: MatchId,
        tournament_id: TournamentId,
        player1_score: i32,
        player2_score: i32,
    ) -> TournamentResult<MatchResult>;

    async fn update_result(
        &mut self,
        result_id: ResultId,
        player1_score: i32,
        player2_score: i32,
    ) -> TournamentResult<MatchResult>;

    /// Insert or revive the tournament's single snapshot row
    async fn upsert_snapshot(
        &mut self,
        tournament_id: TournamentId,
        bracket_data: &serde_json::Value,
        updated_by: UserId,
    ) -> TournamentResult<()>;

    async fn commit(self) -> TournamentResult<()>;

    async fn rollback(self) -> TournamentResult<()>;
}

/// Commit on success, roll back on failure.
///
/// The original error is returned even when the rollback itself fails; the
/// rollback failure is only logged.
pub async fn complete_transaction<T, X>(tx: X, outcome: TournamentResult<T>) -> TournamentResult<T>
where
    X: StoreTx,
{
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                log::error!("Rollback failed after '{}': {}", err, rollback_err);
            }
            Err(err)
        }
    }
}

