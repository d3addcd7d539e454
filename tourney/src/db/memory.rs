//! In-memory bracket store for tests and local runs.
//!
//! A transaction holds the store-wide lock from `begin` until it is committed
//! or rolled back and works on a private copy of the state, so writers are
//! serialized and a rolled-back transaction leaves no trace. Reading through
//! the store from the task that holds an open transaction would wait forever.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::repository::{BracketStore, StoreTx};
use crate::tournament::{
    BracketSnapshot, Entry, EntryId, Match, MatchId, MatchRecord, MatchResult, MatchStatus,
    NewMatch, ResultId, Slot, SlotPosition, Tournament, TournamentConfig, TournamentError,
    TournamentId, TournamentResult, TournamentStatus, TournamentUpdate, UserId,
};

/// Write operation that can be made to fail on purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    UpsertEntry,
    UpsertMatch,
    AssignSlot,
    InsertResult,
    UpdateResult,
    UpsertSnapshot,
    Commit,
}

#[derive(Debug, Clone)]
struct Stored<T> {
    row: T,
    is_deleted: bool,
}

impl<T> Stored<T> {
    fn active(row: T) -> Self {
        Self {
            row,
            is_deleted: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    tournaments: BTreeMap<TournamentId, Stored<Tournament>>,
    entries: BTreeMap<EntryId, Stored<Entry>>,
    matches: BTreeMap<MatchId, Stored<Match>>,
    results: BTreeMap<ResultId, Stored<MatchResult>>,
    snapshots: BTreeMap<TournamentId, Stored<BracketSnapshot>>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn active_tournament(&self, id: TournamentId) -> Option<&Tournament> {
        self.tournaments
            .get(&id)
            .filter(|stored| !stored.is_deleted)
            .map(|stored| &stored.row)
    }

    fn tournament_mut(&mut self, id: TournamentId) -> TournamentResult<&mut Tournament> {
        self.tournaments
            .get_mut(&id)
            .filter(|stored| !stored.is_deleted)
            .map(|stored| &mut stored.row)
            .ok_or(TournamentError::NotFound(id))
    }

    fn match_mut(&mut self, id: MatchId) -> TournamentResult<&mut Match> {
        self.matches
            .get_mut(&id)
            .map(|stored| &mut stored.row)
            .ok_or_else(|| TournamentError::Storage(format!("match {id} does not exist")))
    }

    fn active_result_for(&self, match_id: MatchId) -> Option<&MatchResult> {
        self.results
            .values()
            .find(|stored| !stored.is_deleted && stored.row.match_id == match_id)
            .map(|stored| &stored.row)
    }

    fn soft_delete_bracket(&mut self, tournament_id: TournamentId) {
        for stored in self.entries.values_mut() {
            if stored.row.tournament_id == tournament_id {
                stored.is_deleted = true;
            }
        }
        for stored in self.matches.values_mut() {
            if stored.row.tournament_id == tournament_id {
                stored.is_deleted = true;
            }
        }
        for stored in self.results.values_mut() {
            if stored.row.tournament_id == tournament_id {
                stored.is_deleted = true;
            }
        }
        if let Some(stored) = self.snapshots.get_mut(&tournament_id) {
            stored.is_deleted = true;
        }
    }
}

/// In-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_points: Arc<Mutex<HashSet<FailPoint>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call of `point` fail with a storage error
    pub async fn fail_on(&self, point: FailPoint) {
        self.fail_points.lock().await.insert(point);
    }

    pub async fn clear_failures(&self) {
        self.fail_points.lock().await.clear();
    }

    /// Number of active result rows for a match
    pub async fn active_result_count(&self, match_id: MatchId) -> usize {
        self.state
            .lock()
            .await
            .results
            .values()
            .filter(|stored| !stored.is_deleted && stored.row.match_id == match_id)
            .count()
    }
}

#[async_trait]
impl BracketStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> TournamentResult<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx {
            guard,
            working,
            fail_points: self.fail_points.clone(),
        })
    }

    async fn health_check(&self) -> TournamentResult<()> {
        Ok(())
    }

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        Ok(self.state.lock().await.active_tournament(id).cloned())
    }

    async fn list_tournaments(&self, owner: UserId) -> TournamentResult<Vec<Tournament>> {
        let state = self.state.lock().await;
        let mut tournaments: Vec<Tournament> = state
            .tournaments
            .values()
            .filter(|stored| !stored.is_deleted && stored.row.created_by == owner)
            .map(|stored| stored.row.clone())
            .collect();
        tournaments.sort_by(|a, b| b.created_on.cmp(&a.created_on).then(b.id.cmp(&a.id)));
        Ok(tournaments)
    }

    async fn list_entries(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Entry>> {
        let state = self.state.lock().await;
        let mut entries: Vec<Entry> = state
            .entries
            .values()
            .filter(|stored| !stored.is_deleted && stored.row.tournament_id == tournament_id)
            .map(|stored| stored.row.clone())
            .collect();
        entries.sort_by_key(|entry| (entry.seed_number, entry.id));
        Ok(entries)
    }

    async fn list_matches(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<MatchRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<MatchRecord> = state
            .matches
            .values()
            .filter(|stored| !stored.is_deleted && stored.row.tournament_id == tournament_id)
            .map(|stored| MatchRecord {
                match_row: stored.row.clone(),
                result: state.active_result_for(stored.row.id).cloned(),
            })
            .collect();
        records.sort_by_key(|record| (record.match_row.round_number, record.match_row.match_number));
        Ok(records)
    }

    async fn find_snapshot(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Option<BracketSnapshot>> {
        Ok(self
            .state
            .lock()
            .await
            .snapshots
            .get(&tournament_id)
            .filter(|stored| !stored.is_deleted)
            .map(|stored| stored.row.clone()))
    }
}

/// Open in-memory transaction
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_points: Arc<Mutex<HashSet<FailPoint>>>,
}

impl MemoryTx {
    async fn check(&self, point: FailPoint) -> TournamentResult<()> {
        if self.fail_points.lock().await.contains(&point) {
            return Err(TournamentError::Storage(format!(
                "injected failure at {point:?}"
            )));
        }
        Ok(())
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_tournament(&mut self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        Ok(self.working.active_tournament(id).cloned())
    }

    async fn find_tournament_by_name(
        &mut self,
        owner: UserId,
        name: &str,
    ) -> TournamentResult<Option<Tournament>> {
        Ok(self
            .working
            .tournaments
            .values()
            .find(|stored| {
                !stored.is_deleted && stored.row.created_by == owner && stored.row.name == name
            })
            .map(|stored| stored.row.clone()))
    }

    async fn insert_tournament(
        &mut self,
        owner: UserId,
        config: &TournamentConfig,
    ) -> TournamentResult<Tournament> {
        let id = self.working.allocate_id();
        let stamp = now();
        let tournament = Tournament {
            id,
            name: config.name.trim().to_string(),
            description: config.description.clone(),
            tournament_type: config.tournament_type,
            max_players: config.max_players,
            entry_fee: config.entry_fee,
            status: TournamentStatus::Draft,
            created_by: owner,
            start_date: None,
            end_date: None,
            created_on: stamp,
            modified_on: stamp,
        };
        self.working
            .tournaments
            .insert(id, Stored::active(tournament.clone()));
        Ok(tournament)
    }

    async fn update_tournament(
        &mut self,
        id: TournamentId,
        update: &TournamentUpdate,
    ) -> TournamentResult<Tournament> {
        let tournament = self.working.tournament_mut(id)?;
        tournament.name = update.name.trim().to_string();
        tournament.description = update.description.clone();
        tournament.max_players = update.max_players;
        tournament.entry_fee = update.entry_fee;
        tournament.modified_on = now();
        Ok(tournament.clone())
    }

    async fn set_tournament_status(
        &mut self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> TournamentResult<Tournament> {
        let tournament = self.working.tournament_mut(id)?;
        let stamp = now();
        tournament.status = status;
        match status {
            TournamentStatus::Active => tournament.start_date = Some(stamp),
            TournamentStatus::Completed | TournamentStatus::Cancelled => {
                tournament.end_date = Some(stamp)
            }
            _ => {}
        }
        tournament.modified_on = stamp;
        Ok(tournament.clone())
    }

    async fn soft_delete_tournament(&mut self, id: TournamentId) -> TournamentResult<()> {
        self.working.soft_delete_bracket(id);
        if let Some(stored) = self.working.tournaments.get_mut(&id) {
            stored.is_deleted = true;
        }
        Ok(())
    }

    async fn soft_delete_bracket(&mut self, id: TournamentId) -> TournamentResult<()> {
        self.working.soft_delete_bracket(id);
        Ok(())
    }

    async fn find_entry(
        &mut self,
        tournament_id: TournamentId,
        player_name: &str,
    ) -> TournamentResult<Option<Entry>> {
        Ok(self
            .working
            .entries
            .values()
            .find(|stored| {
                !stored.is_deleted
                    && stored.row.tournament_id == tournament_id
                    && stored.row.player_name == player_name
            })
            .map(|stored| stored.row.clone()))
    }

    async fn count_entries(&mut self, tournament_id: TournamentId) -> TournamentResult<i64> {
        let count = self
            .working
            .entries
            .values()
            .filter(|stored| !stored.is_deleted && stored.row.tournament_id == tournament_id)
            .count();
        Ok(count as i64)
    }

    async fn upsert_entry(
        &mut self,
        tournament_id: TournamentId,
        player_name: &str,
        seed_number: i32,
    ) -> TournamentResult<Entry> {
        self.check(FailPoint::UpsertEntry).await?;

        let existing = self.working.entries.values_mut().find(|stored| {
            stored.row.tournament_id == tournament_id && stored.row.player_name == player_name
        });
        if let Some(stored) = existing {
            stored.is_deleted = false;
            stored.row.seed_number = seed_number;
            return Ok(stored.row.clone());
        }

        let entry = Entry {
            id: self.working.allocate_id(),
            tournament_id,
            player_name: player_name.to_string(),
            seed_number,
        };
        self.working
            .entries
            .insert(entry.id, Stored::active(entry.clone()));
        Ok(entry)
    }

    async fn upsert_match(&mut self, new_match: &NewMatch) -> TournamentResult<Match> {
        self.check(FailPoint::UpsertMatch).await?;

        let existing = self.working.matches.values_mut().find(|stored| {
            stored.row.tournament_id == new_match.tournament_id
                && stored.row.round_number == new_match.round_number
                && stored.row.match_number == new_match.match_number
        });
        if let Some(stored) = existing {
            stored.is_deleted = false;
            stored.row.player1 = new_match.player1.clone();
            stored.row.player2 = new_match.player2.clone();
            stored.row.status = new_match.status;
            return Ok(stored.row.clone());
        }

        let row = Match {
            id: self.working.allocate_id(),
            tournament_id: new_match.tournament_id,
            round_number: new_match.round_number,
            match_number: new_match.match_number,
            player1: new_match.player1.clone(),
            player2: new_match.player2.clone(),
            status: new_match.status,
        };
        self.working
            .matches
            .insert(row.id, Stored::active(row.clone()));
        Ok(row)
    }

    async fn find_match(
        &mut self,
        tournament_id: TournamentId,
        round_number: i32,
        match_number: i32,
    ) -> TournamentResult<Option<Match>> {
        Ok(self
            .working
            .matches
            .values()
            .find(|stored| {
                !stored.is_deleted
                    && stored.row.tournament_id == tournament_id
                    && stored.row.round_number == round_number
                    && stored.row.match_number == match_number
            })
            .map(|stored| stored.row.clone()))
    }

    async fn assign_slot(
        &mut self,
        match_id: MatchId,
        position: SlotPosition,
        slot: &Slot,
    ) -> TournamentResult<()> {
        self.check(FailPoint::AssignSlot).await?;

        let row = self.working.match_mut(match_id)?;
        match position {
            SlotPosition::Player1 => row.player1 = slot.clone(),
            SlotPosition::Player2 => row.player2 = slot.clone(),
        }
        Ok(())
    }

    async fn set_match_status(
        &mut self,
        match_id: MatchId,
        status: MatchStatus,
    ) -> TournamentResult<()> {
        self.working.match_mut(match_id)?.status = status;
        Ok(())
    }

    async fn find_active_result(
        &mut self,
        match_id: MatchId,
    ) -> TournamentResult<Option<MatchResult>> {
        Ok(self.working.active_result_for(match_id).cloned())
    }

    async fn insert_result(
        &mut self,
        match_id: MatchId,
        tournament_id: TournamentId,
        player1_score: i32,
        player2_score: i32,
    ) -> TournamentResult<MatchResult> {
        self.check(FailPoint::InsertResult).await?;

        if self.working.active_result_for(match_id).is_some() {
            return Err(TournamentError::Storage(format!(
                "match {match_id} already has an active result"
            )));
        }

        let result = MatchResult {
            id: self.working.allocate_id(),
            match_id,
            tournament_id,
            player1_score,
            player2_score,
        };
        self.working
            .results
            .insert(result.id, Stored::active(result.clone()));
        Ok(result)
    }

    async fn update_result(
        &mut self,
        result_id: ResultId,
        player1_score: i32,
        player2_score: i32,
    ) -> TournamentResult<MatchResult> {
        self.check(FailPoint::UpdateResult).await?;

        let stored = self.working.results.get_mut(&result_id).ok_or_else(|| {
            TournamentError::Storage(format!("result {result_id} does not exist"))
        })?;
        stored.row.player1_score = player1_score;
        stored.row.player2_score = player2_score;
        Ok(stored.row.clone())
    }

    async fn upsert_snapshot(
        &mut self,
        tournament_id: TournamentId,
        bracket_data: &serde_json::Value,
        updated_by: UserId,
    ) -> TournamentResult<()> {
        self.check(FailPoint::UpsertSnapshot).await?;

        let snapshot = BracketSnapshot {
            tournament_id,
            bracket_data: bracket_data.clone(),
            last_updated_by: updated_by,
            modified_on: now(),
        };
        self.working
            .snapshots
            .insert(tournament_id, Stored::active(snapshot));
        Ok(())
    }

    async fn commit(self) -> TournamentResult<()> {
        self.check(FailPoint::Commit).await?;

        let MemoryTx {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> TournamentResult<()> {
        Ok(())
    }
}
