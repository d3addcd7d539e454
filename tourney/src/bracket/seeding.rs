//! Standard seeded first-round layout.
//!
//! Seeds are placed so that the top two can only meet in the final, the top
//! four only in the semifinals, and so on: 1v2 grows into 1v4, 2v3, which
//! grows into 1v8, 4v5, 2v7, 3v6.

use super::models::{BracketShape, PlayerSeed, ShapeMatch};
use crate::tournament::BYE_NAME;

/// Rounds of the largest bracket a tournament of `max_players` can hold.
///
/// The player limit is rounded up to a power of two, so 5 to 8 players give
/// three rounds. Never more than 31.
pub fn bracket_rounds(max_players: i32) -> u32 {
    let size = u32::try_from(max_players.max(2)).unwrap_or(2);
    size.next_power_of_two().trailing_zeros()
}

/// Matches in zero-based `round` of a bracket with `rounds` rounds, `None`
/// past the final
pub fn round_size(rounds: u32, round: u32) -> Option<u32> {
    let remaining = rounds.checked_sub(round)?.checked_sub(1)?;
    1u32.checked_shl(remaining)
}

/// Seed numbers in slot order for a bracket of `size` players.
///
/// `size` must be a power of two; anything else yields an empty order.
pub fn seed_order(size: usize) -> Vec<usize> {
    if size < 2 || !size.is_power_of_two() {
        return Vec::new();
    }

    let mut order = vec![1, 2];
    while order.len() < size {
        let width = order.len() * 2;
        order = order
            .iter()
            .flat_map(|&seed| [seed, width + 1 - seed])
            .collect();
    }
    order
}

/// Players ranked for placement: seeded players by seed, then unseeded
/// players in submission order, then BYE placeholders.
fn ranked(players: &[PlayerSeed]) -> Vec<&PlayerSeed> {
    let mut ranked: Vec<&PlayerSeed> = players.iter().collect();
    ranked.sort_by_key(|player| {
        let is_bye = player.name == BYE_NAME;
        let unseeded = player.seed <= 0;
        (is_bye, unseeded, player.seed)
    });
    ranked
}

/// Full shape for `players`: a seeded first round followed by undecided rounds.
///
/// Returns an empty shape when the player count is not a power of two.
pub fn seeded_shape(players: &[PlayerSeed]) -> BracketShape {
    let order = seed_order(players.len());
    if order.is_empty() {
        return BracketShape::default();
    }

    let ranked = ranked(players);
    let first_round = order
        .chunks(2)
        .map(|pair| {
            ShapeMatch::new(
                ranked[pair[0] - 1].clone(),
                ranked[pair[1] - 1].clone(),
            )
        })
        .collect::<Vec<_>>();

    let mut rounds = vec![first_round];
    let mut width = players.len() / 4;
    while width >= 1 {
        rounds.push(
            (0..width)
                .map(|_| ShapeMatch::new(PlayerSeed::undecided(), PlayerSeed::undecided()))
                .collect(),
        );
        width /= 2;
    }

    BracketShape(rounds)
}
