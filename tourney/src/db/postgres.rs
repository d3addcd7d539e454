//! PostgreSQL implementation of the bracket store.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;

use super::repository::{BracketStore, StoreTx};
use crate::tournament::{
    BracketSnapshot, Entry, Match, MatchId, MatchRecord, MatchResult, MatchStatus, NewMatch,
    ResultId, Slot, SlotPosition, Tournament, TournamentConfig, TournamentError, TournamentId,
    TournamentResult, TournamentStatus, TournamentType, TournamentUpdate, UserId,
};

const TOURNAMENT_COLUMNS: &str = "id, name, description, tournament_type, max_players, entry_fee, \
     status, created_by, start_date, end_date, created_on, modified_on";

const MATCH_COLUMNS: &str =
    "id, tournament_id, round_number, match_number, player1_id, player2_id, \
     player1_name, player2_name, status";

const RESULT_COLUMNS: &str = "id, match_id, tournament_id, player1_score, player2_score";

/// A concurrent create or rename can slip past the name lookup; the unique
/// index reports it instead
fn name_clash(err: sqlx::Error) -> TournamentError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return TournamentError::validation("Tournament with this name already exists");
        }
    }
    TournamentError::from(err)
}

fn tournament_from_row(row: &PgRow) -> TournamentResult<Tournament> {
    Ok(Tournament {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        tournament_type: TournamentType::parse(row.get::<&str, _>("tournament_type"))?,
        max_players: row.get("max_players"),
        entry_fee: row.get("entry_fee"),
        status: TournamentStatus::parse(row.get::<&str, _>("status"))?,
        created_by: row.get("created_by"),
        start_date: row
            .get::<Option<chrono::NaiveDateTime>, _>("start_date")
            .map(|dt| dt.and_utc()),
        end_date: row
            .get::<Option<chrono::NaiveDateTime>, _>("end_date")
            .map(|dt| dt.and_utc()),
        created_on: row.get::<chrono::NaiveDateTime, _>("created_on").and_utc(),
        modified_on: row.get::<chrono::NaiveDateTime, _>("modified_on").and_utc(),
    })
}

fn entry_from_row(row: &PgRow) -> Entry {
    Entry {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        player_name: row.get("player_name"),
        seed_number: row.get("seed_number"),
    }
}

fn match_from_row(row: &PgRow) -> TournamentResult<Match> {
    Ok(Match {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        round_number: row.get("round_number"),
        match_number: row.get("match_number"),
        player1: Slot::from_columns(row.get("player1_id"), row.get("player1_name")),
        player2: Slot::from_columns(row.get("player2_id"), row.get("player2_name")),
        status: MatchStatus::parse(row.get::<&str, _>("status"))?,
    })
}

fn result_from_row(row: &PgRow) -> MatchResult {
    MatchResult {
        id: row.get("id"),
        match_id: row.get("match_id"),
        tournament_id: row.get("tournament_id"),
        player1_score: row.get("player1_score"),
        player2_score: row.get("player2_score"),
    }
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    /// Create a new store
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> TournamentResult<()> {
        sqlx::raw_sql(include_str!("../../migrations/001_initial_schema.sql"))
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BracketStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> TournamentResult<PgTx> {
        let tx = self.pool.begin().await?;
        Ok(PgTx { tx })
    }

    async fn health_check(&self) -> TournamentResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1 AND is_deleted = FALSE"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn list_tournaments(&self, owner: UserId) -> TournamentResult<Vec<Tournament>> {
        let rows = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments
             WHERE created_by = $1 AND is_deleted = FALSE
             ORDER BY created_on DESC, id DESC"
        ))
        .bind(owner)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(tournament_from_row).collect()
    }

    async fn list_entries(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Entry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tournament_id, player_name, seed_number
            FROM tournament_entries
            WHERE tournament_id = $1 AND is_deleted = FALSE
            ORDER BY seed_number ASC, id ASC
            "#,
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(entry_from_row).collect())
    }

    async fn list_matches(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<MatchRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.tournament_id, m.round_number, m.match_number,
                   m.player1_id, m.player2_id, m.player1_name, m.player2_name, m.status,
                   r.id AS result_id, r.player1_score, r.player2_score
            FROM matches m
            LEFT JOIN match_results r ON r.match_id = m.id AND r.is_deleted = FALSE
            WHERE m.tournament_id = $1 AND m.is_deleted = FALSE
            ORDER BY m.round_number ASC, m.match_number ASC
            "#,
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter()
            .map(|row| {
                let match_row = match_from_row(row)?;
                let result = row
                    .get::<Option<ResultId>, _>("result_id")
                    .map(|id| MatchResult {
                        id,
                        match_id: match_row.id,
                        tournament_id: match_row.tournament_id,
                        player1_score: row.get("player1_score"),
                        player2_score: row.get("player2_score"),
                    });
                Ok(MatchRecord { match_row, result })
            })
            .collect()
    }

    async fn find_snapshot(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Option<BracketSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT tournament_id, bracket_data, last_updated_by, modified_on
            FROM tournament_brackets
            WHERE tournament_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(tournament_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| BracketSnapshot {
            tournament_id: r.get("tournament_id"),
            bracket_data: r.get("bracket_data"),
            last_updated_by: r.get("last_updated_by"),
            modified_on: r.get::<chrono::NaiveDateTime, _>("modified_on").and_utc(),
        }))
    }
}

/// An open PostgreSQL transaction
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_tournament(&mut self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments
             WHERE id = $1 AND is_deleted = FALSE
             FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn find_tournament_by_name(
        &mut self,
        owner: UserId,
        name: &str,
    ) -> TournamentResult<Option<Tournament>> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments
             WHERE created_by = $1 AND name = $2 AND is_deleted = FALSE"
        ))
        .bind(owner)
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn insert_tournament(
        &mut self,
        owner: UserId,
        config: &TournamentConfig,
    ) -> TournamentResult<Tournament> {
        let row = sqlx::query(&format!(
            "INSERT INTO tournaments
                 (name, description, tournament_type, max_players, entry_fee, status, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {TOURNAMENT_COLUMNS}"
        ))
        .bind(config.name.trim())
        .bind(&config.description)
        .bind(config.tournament_type.as_str())
        .bind(config.max_players)
        .bind(config.entry_fee)
        .bind(TournamentStatus::Draft.as_str())
        .bind(owner)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(name_clash)?;

        tournament_from_row(&row)
    }

    async fn update_tournament(
        &mut self,
        id: TournamentId,
        update: &TournamentUpdate,
    ) -> TournamentResult<Tournament> {
        let row = sqlx::query(&format!(
            "UPDATE tournaments
             SET name = $2, description = $3, max_players = $4, entry_fee = $5,
                 modified_on = NOW()
             WHERE id = $1 AND is_deleted = FALSE
             RETURNING {TOURNAMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name.trim())
        .bind(&update.description)
        .bind(update.max_players)
        .bind(update.entry_fee)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(name_clash)?;

        tournament_from_row(&row)
    }

    async fn set_tournament_status(
        &mut self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> TournamentResult<Tournament> {
        let row = sqlx::query(&format!(
            "UPDATE tournaments
             SET status = $2,
                 start_date = CASE WHEN $3 THEN NOW() ELSE start_date END,
                 end_date = CASE WHEN $4 THEN NOW() ELSE end_date END,
                 modified_on = NOW()
             WHERE id = $1 AND is_deleted = FALSE
             RETURNING {TOURNAMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(status == TournamentStatus::Active)
        .bind(matches!(
            status,
            TournamentStatus::Completed | TournamentStatus::Cancelled
        ))
        .fetch_one(&mut *self.tx)
        .await?;

        tournament_from_row(&row)
    }

    async fn soft_delete_tournament(&mut self, id: TournamentId) -> TournamentResult<()> {
        self.soft_delete_bracket(id).await?;

        sqlx::query(
            "UPDATE tournaments SET is_deleted = TRUE, modified_on = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn soft_delete_bracket(&mut self, id: TournamentId) -> TournamentResult<()> {
        for table in [
            "match_results",
            "matches",
            "tournament_entries",
            "tournament_brackets",
        ] {
            sqlx::query(&format!(
                "UPDATE {table} SET is_deleted = TRUE, modified_on = NOW()
                 WHERE tournament_id = $1 AND is_deleted = FALSE"
            ))
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn find_entry(
        &mut self,
        tournament_id: TournamentId,
        player_name: &str,
    ) -> TournamentResult<Option<Entry>> {
        let row = sqlx::query(
            r#"
            SELECT id, tournament_id, player_name, seed_number
            FROM tournament_entries
            WHERE tournament_id = $1 AND player_name = $2 AND is_deleted = FALSE
            "#,
        )
        .bind(tournament_id)
        .bind(player_name)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(entry_from_row))
    }

    async fn count_entries(&mut self, tournament_id: TournamentId) -> TournamentResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM tournament_entries
             WHERE tournament_id = $1 AND is_deleted = FALSE",
        )
        .bind(tournament_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.get("count"))
    }

    async fn upsert_entry(
        &mut self,
        tournament_id: TournamentId,
        player_name: &str,
        seed_number: i32,
    ) -> TournamentResult<Entry> {
        let row = sqlx::query(
            r#"
            INSERT INTO tournament_entries (tournament_id, player_name, seed_number)
            VALUES ($1, $2, $3)
            ON CONFLICT (tournament_id, player_name)
            DO UPDATE SET seed_number = EXCLUDED.seed_number,
                          is_deleted = FALSE,
                          modified_on = NOW()
            RETURNING id, tournament_id, player_name, seed_number
            "#,
        )
        .bind(tournament_id)
        .bind(player_name)
        .bind(seed_number)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(entry_from_row(&row))
    }

    async fn upsert_match(&mut self, new_match: &NewMatch) -> TournamentResult<Match> {
        let (player1_id, player1_name) = new_match.player1.columns();
        let (player2_id, player2_name) = new_match.player2.columns();

        let row = sqlx::query(&format!(
            "INSERT INTO matches
                 (tournament_id, round_number, match_number,
                  player1_id, player2_id, player1_name, player2_name, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (tournament_id, round_number, match_number)
             DO UPDATE SET player1_id = EXCLUDED.player1_id,
                           player2_id = EXCLUDED.player2_id,
                           player1_name = EXCLUDED.player1_name,
                           player2_name = EXCLUDED.player2_name,
                           status = EXCLUDED.status,
                           is_deleted = FALSE,
                           modified_on = NOW()
             RETURNING {MATCH_COLUMNS}"
        ))
        .bind(new_match.tournament_id)
        .bind(new_match.round_number)
        .bind(new_match.match_number)
        .bind(player1_id)
        .bind(player2_id)
        .bind(player1_name)
        .bind(player2_name)
        .bind(new_match.status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        match_from_row(&row)
    }

    async fn find_match(
        &mut self,
        tournament_id: TournamentId,
        round_number: i32,
        match_number: i32,
    ) -> TournamentResult<Option<Match>> {
        let row = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE tournament_id = $1 AND round_number = $2 AND match_number = $3
               AND is_deleted = FALSE"
        ))
        .bind(tournament_id)
        .bind(round_number)
        .bind(match_number)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn assign_slot(
        &mut self,
        match_id: MatchId,
        position: SlotPosition,
        slot: &Slot,
    ) -> TournamentResult<()> {
        let (id, name) = slot.columns();
        let query = match position {
            SlotPosition::Player1 => {
                "UPDATE matches SET player1_id = $2, player1_name = $3, modified_on = NOW()
                 WHERE id = $1"
            }
            SlotPosition::Player2 => {
                "UPDATE matches SET player2_id = $2, player2_name = $3, modified_on = NOW()
                 WHERE id = $1"
            }
        };

        sqlx::query(query)
            .bind(match_id)
            .bind(id)
            .bind(name)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn set_match_status(
        &mut self,
        match_id: MatchId,
        status: MatchStatus,
    ) -> TournamentResult<()> {
        sqlx::query("UPDATE matches SET status = $2, modified_on = NOW() WHERE id = $1")
            .bind(match_id)
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_active_result(
        &mut self,
        match_id: MatchId,
    ) -> TournamentResult<Option<MatchResult>> {
        let row = sqlx::query(&format!(
            "SELECT {RESULT_COLUMNS} FROM match_results
             WHERE match_id = $1 AND is_deleted = FALSE"
        ))
        .bind(match_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(result_from_row))
    }

    async fn insert_result(
        &mut self,
        match_id: MatchId,
        tournament_id: TournamentId,
        player1_score: i32,
        player2_score: i32,
    ) -> TournamentResult<MatchResult> {
        let row = sqlx::query(&format!(
            "INSERT INTO match_results (match_id, tournament_id, player1_score, player2_score)
             VALUES ($1, $2, $3, $4)
             RETURNING {RESULT_COLUMNS}"
        ))
        .bind(match_id)
        .bind(tournament_id)
        .bind(player1_score)
        .bind(player2_score)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(result_from_row(&row))
    }

    async fn update_result(
        &mut self,
        result_id: ResultId,
        player1_score: i32,
        player2_score: i32,
    ) -> TournamentResult<MatchResult> {
        let row = sqlx::query(&format!(
            "UPDATE match_results
             SET player1_score = $2, player2_score = $3, modified_on = NOW()
             WHERE id = $1
             RETURNING {RESULT_COLUMNS}"
        ))
        .bind(result_id)
        .bind(player1_score)
        .bind(player2_score)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(result_from_row(&row))
    }

    async fn upsert_snapshot(
        &mut self,
        tournament_id: TournamentId,
        bracket_data: &serde_json::Value,
        updated_by: UserId,
    ) -> TournamentResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tournament_brackets (tournament_id, bracket_data, last_updated_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (tournament_id)
            DO UPDATE SET bracket_data = EXCLUDED.bracket_data,
                          last_updated_by = EXCLUDED.last_updated_by,
                          is_deleted = FALSE,
                          modified_on = NOW()
            "#,
        )
        .bind(tournament_id)
        .bind(bracket_data)
        .bind(updated_by)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> TournamentResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> TournamentResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
