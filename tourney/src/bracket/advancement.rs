//! Winner placement.
//!
//! The placement rule is a pure function of the source match coordinates:
//! the winner of round `r`, match `m` (one-based) moves to round `r + 1`,
//! match `ceil(m / 2)`, taking slot 1 when `m` is odd and slot 2 when it is
//! even. [`advance`] performs that single write and nothing else; it never
//! creates the successor match and does not look at the rest of the round.

use std::fmt::Display;

use serde::Serialize;

use crate::db::StoreTx;
use crate::tournament::{
    Match, MatchId, MatchStatus, Slot, SlotPosition, TournamentError, TournamentResult,
};

/// Scores of one match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Scoreline {
    pub player1: i32,
    pub player2: i32,
}

impl Scoreline {
    /// Validated scoreline; scores are non-negative
    pub fn new(player1: i32, player2: i32) -> TournamentResult<Self> {
        if player1 < 0 || player2 < 0 {
            return Err(TournamentError::validation("Scores cannot be negative"));
        }
        Ok(Self { player1, player2 })
    }

    pub fn is_decisive(&self) -> bool {
        self.player1 != self.player2
    }

    /// Higher-scoring side, `None` on a tie
    pub fn winner(&self) -> Option<SlotPosition> {
        match self.player1.cmp(&self.player2) {
            std::cmp::Ordering::Greater => Some(SlotPosition::Player1),
            std::cmp::Ordering::Less => Some(SlotPosition::Player2),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Ties never complete a match
    pub fn status(&self) -> MatchStatus {
        if self.is_decisive() {
            MatchStatus::Completed
        } else {
            MatchStatus::Pending
        }
    }
}

/// Successor slot of a match, in one-based coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub round_number: i32,
    pub match_number: i32,
    pub position: SlotPosition,
}

fn out_of_range(round_number: impl Display, match_number: impl Display) -> TournamentError {
    TournamentError::validation(format!(
        "Match {match_number} of round {round_number} is outside the bracket"
    ))
}

fn slot_for(odd: bool) -> SlotPosition {
    if odd {
        SlotPosition::Player1
    } else {
        SlotPosition::Player2
    }
}

impl Placement {
    /// Successor of the match at zero-based `(round, match_index)`
    pub fn for_match(round: u32, match_index: u32) -> TournamentResult<Self> {
        let round_number = i32::try_from(round).ok().and_then(|r| r.checked_add(2));
        let match_number = i32::try_from(match_index / 2)
            .ok()
            .and_then(|m| m.checked_add(1));

        match (round_number, match_number) {
            (Some(round_number), Some(match_number)) => Ok(Self {
                round_number,
                match_number,
                position: slot_for(match_index % 2 == 0),
            }),
            _ => Err(out_of_range(u64::from(round) + 1, u64::from(match_index) + 1)),
        }
    }

    /// Successor of the match at one-based `(round_number, match_number)`
    pub fn after(round_number: i32, match_number: i32) -> TournamentResult<Self> {
        let next_round = round_number.checked_add(1);
        let next_match = match_number.checked_add(1).map(|m| m / 2);

        match (next_round, next_match) {
            (Some(next_round), Some(next_match)) => Ok(Self {
                round_number: next_round,
                match_number: next_match,
                position: slot_for(match_number % 2 == 1),
            }),
            _ => Err(out_of_range(round_number, match_number)),
        }
    }
}

/// Outcome of one advancement hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advancement {
    /// Winner written into the successor match
    Placed {
        match_id: MatchId,
        placement: Placement,
        winner: Slot,
    },
    /// No successor match exists
    Terminal,
}

/// Write the winner of `source` into its successor slot.
pub async fn advance<X: StoreTx>(
    tx: &mut X,
    source: &Match,
    winner: SlotPosition,
) -> TournamentResult<Advancement> {
    let placement = Placement::after(source.round_number, source.match_number)?;
    let Some(next) = tx
        .find_match(
            source.tournament_id,
            placement.round_number,
            placement.match_number,
        )
        .await?
    else {
        log::debug!(
            "Match R{}M{} of tournament {} has no successor",
            source.round_number,
            source.match_number,
            source.tournament_id
        );
        return Ok(Advancement::Terminal);
    };

    let slot = source.slot(winner).clone();
    tx.assign_slot(next.id, placement.position, &slot).await?;

    log::info!(
        "Advanced winner of R{}M{} into R{}M{} {:?} (tournament {})",
        source.round_number,
        source.match_number,
        placement.round_number,
        placement.match_number,
        placement.position,
        source.tournament_id
    );

    Ok(Advancement::Placed {
        match_id: next.id,
        placement,
        winner: slot,
    })
}

/// Like [`advance`], but leaves a successor slot that is already occupied alone.
///
/// Returns `None` when the slot was kept.
pub async fn advance_if_open<X: StoreTx>(
    tx: &mut X,
    source: &Match,
    winner: SlotPosition,
) -> TournamentResult<Option<Advancement>> {
    let placement = Placement::after(source.round_number, source.match_number)?;
    match tx
        .find_match(
            source.tournament_id,
            placement.round_number,
            placement.match_number,
        )
        .await?
    {
        Some(next) if *next.slot(placement.position) != Slot::Open => Ok(None),
        _ => advance(tx, source, winner).await.map(Some),
    }
}
