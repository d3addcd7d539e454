//! Match result recording.

use super::BracketManager;
use super::advancement::{Scoreline, advance};
use super::models::{RecordedResult, ResultSubmission};
use super::seeding::{bracket_rounds, round_size};
use crate::db::{BracketStore, StoreTx, complete_transaction};
use crate::tournament::manager::lock_owned;
use crate::tournament::{NewMatch, TournamentError, TournamentId, TournamentResult, UserId};

/// How the ledger treats results addressed to a match that does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Create a pending TBD-vs-TBD match instead of rejecting the result.
    ///
    /// Lets a bracket be filled in sparsely or late.
    pub create_missing_matches: bool,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            create_missing_matches: true,
        }
    }
}

fn one_based(value: u32, what: &str) -> TournamentResult<i32> {
    i32::try_from(value)
        .ok()
        .and_then(|value| value.checked_add(1))
        .ok_or_else(|| TournamentError::validation(format!("{what} is out of range")))
}

/// Zero-based coordinates must address a match of the largest bracket the
/// tournament can hold
fn check_in_bracket(max_players: i32, round: u32, match_index: u32) -> TournamentResult<()> {
    let rounds = bracket_rounds(max_players);
    match round_size(rounds, round) {
        Some(size) if match_index < size => Ok(()),
        Some(size) => Err(TournamentError::validation(format!(
            "Match index {match_index} is out of range, round {round} has {size} matches"
        ))),
        None => Err(TournamentError::validation(format!(
            "Round {round} is out of range, the bracket has {rounds} rounds"
        ))),
    }
}

impl<S: BracketStore> BracketManager<S> {
    /// Record the score of one match.
    ///
    /// An existing result is updated in place. A decisive score completes the
    /// match and moves the winner one round forward; a tie leaves the match
    /// pending and moves nobody.
    pub async fn submit_result(
        &self,
        tournament_id: TournamentId,
        caller: UserId,
        submission: ResultSubmission,
    ) -> TournamentResult<RecordedResult> {
        let scoreline = Scoreline::new(submission.score1, submission.score2)?;
        let round_number = one_based(submission.round, "Round")?;
        let match_number = one_based(submission.match_index, "Match index")?;
        let policy = self.policy;

        let mut tx = self.store.begin().await?;
        let outcome = async {
            let tournament = lock_owned(&mut tx, tournament_id, caller).await?;

            let existing = tx
                .find_match(tournament_id, round_number, match_number)
                .await?;
            if existing.is_none() {
                check_in_bracket(
                    tournament.max_players,
                    submission.round,
                    submission.match_index,
                )?;
            }

            let row = match existing {
                Some(row) => row,
                None if policy.create_missing_matches => {
                    log::warn!(
                        "Match R{}M{} of tournament {} not found, creating placeholder",
                        round_number,
                        match_number,
                        tournament_id
                    );
                    tx.upsert_match(&NewMatch::placeholder(
                        tournament_id,
                        round_number,
                        match_number,
                    ))
                    .await?
                }
                None => {
                    return Err(TournamentError::validation(format!(
                        "Match {} of round {} does not exist",
                        match_number, round_number
                    )));
                }
            };

            if row.has_bye() {
                return Err(TournamentError::validation(
                    "Cannot update scores for a BYE match",
                ));
            }

            let result = match tx.find_active_result(row.id).await? {
                Some(existing) => {
                    tx.update_result(existing.id, scoreline.player1, scoreline.player2)
                        .await?
                }
                None => {
                    tx.insert_result(
                        row.id,
                        tournament_id,
                        scoreline.player1,
                        scoreline.player2,
                    )
                    .await?
                }
            };

            let status = scoreline.status();
            tx.set_match_status(row.id, status).await?;

            let advancement = match scoreline.winner() {
                Some(winner) => Some(advance(&mut tx, &row, winner).await?),
                None => None,
            };

            Ok(RecordedResult {
                result,
                status,
                advancement,
            })
        }
        .await;
        let recorded = complete_transaction(tx, outcome).await?;

        log::info!(
            "Match result updated for match {} in tournament {} by user {} ({}-{}, {})",
            recorded.result.match_id,
            tournament_id,
            caller,
            scoreline.player1,
            scoreline.player2,
            recorded.status
        );
        Ok(recorded)
    }
}
