//! Tournament manager for creating and managing tournament records and entries.

use super::errors::{TournamentError, TournamentResult};
use super::models::{
    BYE_NAME, Entry, TBD_NAME, Tournament, TournamentConfig, TournamentDetails, TournamentId,
    TournamentStatus, TournamentUpdate, UserId,
};
use crate::db::{BracketStore, StoreTx, complete_transaction};
use std::sync::Arc;

/// Default base URL for share links
pub const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:3000";

/// Lock a tournament inside `tx` and check that `caller` created it.
pub(crate) async fn lock_owned<X: StoreTx>(
    tx: &mut X,
    tournament_id: TournamentId,
    caller: UserId,
) -> TournamentResult<Tournament> {
    let tournament = tx
        .lock_tournament(tournament_id)
        .await?
        .ok_or(TournamentError::NotFound(tournament_id))?;

    if tournament.created_by != caller {
        return Err(TournamentError::Unauthorized {
            tournament_id,
            user_id: caller,
        });
    }

    Ok(tournament)
}

/// Trimmed player name, rejecting empty input
pub(crate) fn normalize_name(name: &str) -> TournamentResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TournamentError::validation("Player name is required"));
    }
    Ok(trimmed.to_string())
}

/// Tournament manager
pub struct TournamentManager<S> {
    store: Arc<S>,
    share_base_url: String,
}

impl<S> Clone for TournamentManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            share_base_url: self.share_base_url.clone(),
        }
    }
}

impl<S: BracketStore> TournamentManager<S> {
    /// Create a new tournament manager
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
        }
    }

    /// Base URL prepended to share links
    pub fn with_share_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.share_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create a new tournament in `draft` status
    pub async fn create_tournament(
        &self,
        owner: UserId,
        config: TournamentConfig,
    ) -> TournamentResult<Tournament> {
        config.validate()?;

        let mut tx = self.store.begin().await?;
        let outcome = async {
            // Names are unique per owner
            if tx
                .find_tournament_by_name(owner, config.name.trim())
                .await?
                .is_some()
            {
                return Err(TournamentError::validation(
                    "Tournament with this name already exists",
                ));
            }
            tx.insert_tournament(owner, &config).await
        }
        .await;
        let tournament = complete_transaction(tx, outcome).await?;

        log::info!(
            "Tournament {} '{}' created by user {}",
            tournament.id,
            tournament.name,
            owner
        );
        Ok(tournament)
    }

    /// Active tournaments created by `owner`, newest first
    pub async fn list_tournaments(&self, owner: UserId) -> TournamentResult<Vec<Tournament>> {
        self.store.list_tournaments(owner).await
    }

    /// Get an active tournament
    pub async fn get_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.store
            .find_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::NotFound(tournament_id))
    }

    /// Tournament with its active entries
    pub async fn get_details(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<TournamentDetails> {
        let tournament = self.get_tournament(tournament_id).await?;
        let entries = self.store.list_entries(tournament_id).await?;

        Ok(TournamentDetails {
            tournament,
            entries_count: entries.len(),
            entries,
        })
    }

    /// Replace name, description, player cap and fee
    pub async fn update_tournament(
        &self,
        tournament_id: TournamentId,
        caller: UserId,
        update: TournamentUpdate,
    ) -> TournamentResult<Tournament> {
        update.validate()?;

        let mut tx = self.store.begin().await?;
        let outcome = async {
            lock_owned(&mut tx, tournament_id, caller).await?;

            let clash = tx
                .find_tournament_by_name(caller, update.name.trim())
                .await?
                .is_some_and(|other| other.id != tournament_id);
            if clash {
                return Err(TournamentError::validation(
                    "Tournament with this name already exists",
                ));
            }

            // Cap cannot drop below the entries already registered
            let registered = tx.count_entries(tournament_id).await?;
            if i64::from(update.max_players) < registered {
                return Err(TournamentError::validation(format!(
                    "max_players cannot be lower than the {registered} registered entries"
                )));
            }

            tx.update_tournament(tournament_id, &update).await
        }
        .await;
        let tournament = complete_transaction(tx, outcome).await?;

        log::info!("Tournament {} updated by user {}", tournament_id, caller);
        Ok(tournament)
    }

    /// Move a `draft` or `registration` tournament to `active`
    pub async fn start_tournament(
        &self,
        tournament_id: TournamentId,
        caller: UserId,
    ) -> TournamentResult<Tournament> {
        self.transition(tournament_id, caller, TournamentStatus::Active, |status| {
            matches!(
                status,
                TournamentStatus::Draft | TournamentStatus::Registration
            )
        })
        .await
    }

    /// Move an `active` tournament to `completed`
    pub async fn end_tournament(
        &self,
        tournament_id: TournamentId,
        caller: UserId,
    ) -> TournamentResult<Tournament> {
        self.transition(tournament_id, caller, TournamentStatus::Completed, |status| {
            status == TournamentStatus::Active
        })
        .await
    }

    /// Cancel a tournament that has not finished
    pub async fn cancel_tournament(
        &self,
        tournament_id: TournamentId,
        caller: UserId,
    ) -> TournamentResult<Tournament> {
        self.transition(tournament_id, caller, TournamentStatus::Cancelled, |status| {
            !matches!(
                status,
                TournamentStatus::Completed | TournamentStatus::Cancelled
            )
        })
        .await
    }

    async fn transition(
        &self,
        tournament_id: TournamentId,
        caller: UserId,
        target: TournamentStatus,
        allowed_from: fn(TournamentStatus) -> bool,
    ) -> TournamentResult<Tournament> {
        let mut tx = self.store.begin().await?;
        let outcome = async {
            let tournament = lock_owned(&mut tx, tournament_id, caller).await?;
            if !allowed_from(tournament.status) {
                return Err(TournamentError::validation(format!(
                    "Cannot move tournament from {} to {}",
                    tournament.status, target
                )));
            }
            tx.set_tournament_status(tournament_id, target).await
        }
        .await;
        let tournament = complete_transaction(tx, outcome).await?;

        log::info!(
            "Tournament {} moved to {} by user {}",
            tournament_id,
            target,
            caller
        );
        Ok(tournament)
    }

    /// Soft-delete the tournament and everything it owns
    pub async fn delete_tournament(
        &self,
        tournament_id: TournamentId,
        caller: UserId,
    ) -> TournamentResult<()> {
        let mut tx = self.store.begin().await?;
        let outcome = async {
            lock_owned(&mut tx, tournament_id, caller).await?;
            tx.soft_delete_tournament(tournament_id).await
        }
        .await;
        complete_transaction(tx, outcome).await?;

        log::info!("Tournament {} deleted by user {}", tournament_id, caller);
        Ok(())
    }

    /// Public link to the bracket page
    pub async fn share_url(
        &self,
        tournament_id: TournamentId,
        caller: UserId,
    ) -> TournamentResult<String> {
        let tournament = self.get_tournament(tournament_id).await?;
        if tournament.created_by != caller {
            return Err(TournamentError::Unauthorized {
                tournament_id,
                user_id: caller,
            });
        }

        let url = format!("{}/bracket/{}", self.share_base_url, tournament_id);
        log::info!(
            "Share URL generated for tournament {} by user {}",
            tournament_id,
            caller
        );
        Ok(url)
    }

    /// Add a player to a tournament.
    ///
    /// The seed defaults to the active entry count plus one. A soft-deleted
    /// entry with the same name is reactivated.
    pub async fn register_entry(
        &self,
        tournament_id: TournamentId,
        caller: UserId,
        player_name: &str,
        seed: Option<i32>,
    ) -> TournamentResult<Entry> {
        let name = normalize_name(player_name)?;
        if name == BYE_NAME || name == TBD_NAME {
            return Err(TournamentError::validation(format!(
                "'{name}' is reserved and cannot be used as a player name"
            )));
        }
        if seed.is_some_and(|seed| seed < 0) {
            return Err(TournamentError::validation("Seed cannot be negative"));
        }

        let mut tx = self.store.begin().await?;
        let outcome = async {
            let tournament = lock_owned(&mut tx, tournament_id, caller).await?;

            if tx.find_entry(tournament_id, &name).await?.is_some() {
                return Err(TournamentError::validation("Player already added"));
            }

            let count = tx.count_entries(tournament_id).await?;
            if count >= i64::from(tournament.max_players) {
                return Err(TournamentError::validation("Tournament is full"));
            }

            let seed = match seed {
                Some(seed) if seed > 0 => seed,
                _ => i32::try_from(count + 1).unwrap_or(i32::MAX),
            };
            tx.upsert_entry(tournament_id, &name, seed).await
        }
        .await;
        let entry = complete_transaction(tx, outcome).await?;

        log::info!(
            "Player {} added to tournament {} by user {}",
            entry.player_name,
            tournament_id,
            caller
        );
        Ok(entry)
    }
}
