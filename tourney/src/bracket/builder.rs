//! Bracket construction.

use std::collections::{HashMap, HashSet};

use super::BracketManager;
use super::advancement::{Scoreline, advance_if_open};
use super::models::{BracketShape, BuildOutcome, BuildRequest, PlayerSeed, ShapeMatch};
use super::seeding::seeded_shape;
use crate::db::{BracketStore, StoreTx, complete_transaction};
use crate::tournament::manager::{lock_owned, normalize_name};
use crate::tournament::{
    BYE_NAME, Entry, EntryId, Match, MatchStatus, NewMatch, Slot, SlotPosition, TBD_NAME,
    TournamentError, TournamentId, TournamentResult, TournamentType, UserId,
};

/// Trim names, reject blanks, negative seeds and collisions.
///
/// `BYE` players are kept so they count toward the bracket size.
fn normalize_players(players: &[PlayerSeed]) -> TournamentResult<Vec<PlayerSeed>> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(players.len());

    for player in players {
        let name = normalize_name(&player.name)?;
        if name == TBD_NAME {
            return Err(TournamentError::validation(format!(
                "'{TBD_NAME}' is reserved and cannot be used as a player name"
            )));
        }
        if player.seed < 0 {
            return Err(TournamentError::validation(format!(
                "Seed of '{name}' cannot be negative"
            )));
        }
        if name != BYE_NAME && !seen.insert(name.clone()) {
            return Err(TournamentError::validation(format!(
                "Duplicate player name '{name}'"
            )));
        }
        normalized.push(PlayerSeed::new(name, player.seed));
    }

    Ok(normalized)
}

fn validate_player_count(count: usize, max_players: i32) -> TournamentResult<()> {
    if count < 2 {
        return Err(TournamentError::validation(
            "A bracket needs at least 2 players",
        ));
    }
    if !count.is_power_of_two() {
        return Err(TournamentError::validation(format!(
            "Player count must be a power of two, got {count}"
        )));
    }
    if count > usize::try_from(max_players).unwrap_or(0) {
        return Err(TournamentError::validation(format!(
            "Player count {count} exceeds the tournament limit of {max_players}"
        )));
    }
    Ok(())
}

/// log2(n) rounds, round `r` (zero-based) holding n / 2^(r+1) matches
fn validate_shape(shape: &BracketShape, player_count: usize) -> TournamentResult<()> {
    let expected_rounds = player_count.trailing_zeros() as usize;
    if shape.rounds().len() != expected_rounds {
        return Err(TournamentError::validation(format!(
            "Bracket for {player_count} players needs {expected_rounds} rounds, got {}",
            shape.rounds().len()
        )));
    }

    for (round, matches) in shape.rounds().iter().enumerate() {
        let expected = player_count >> (round + 1);
        if matches.len() != expected {
            return Err(TournamentError::validation(format!(
                "Round {} needs {expected} matches, got {}",
                round + 1,
                matches.len()
            )));
        }
    }

    Ok(())
}

fn resolve_slot(
    player: &PlayerSeed,
    entries: &HashMap<String, Entry>,
    round: usize,
    index: usize,
) -> TournamentResult<Slot> {
    let name = player.name.trim();

    if name == BYE_NAME {
        return Ok(Slot::Bye);
    }
    if name.is_empty() || name == TBD_NAME {
        if round == 0 {
            return Err(TournamentError::validation(format!(
                "Round 1 match {} has an undecided player",
                index + 1
            )));
        }
        return Ok(Slot::Open);
    }

    entries
        .get(name)
        .map(|entry| Slot::Entry {
            id: entry.id,
            name: entry.player_name.clone(),
        })
        .ok_or_else(|| {
            TournamentError::validation(format!(
                "Invalid player data for {name} in match {} of round {}",
                index + 1,
                round + 1
            ))
        })
}

/// A BYE must face exactly one registered player
fn check_pairing(
    player1: &Slot,
    player2: &Slot,
    round: usize,
    index: usize,
) -> TournamentResult<()> {
    let valid = match (player1, player2) {
        (Slot::Bye, Slot::Bye) => false,
        (Slot::Bye, other) | (other, Slot::Bye) => matches!(other, Slot::Entry { .. }),
        _ => true,
    };

    if !valid {
        return Err(TournamentError::validation(format!(
            "A BYE in match {} of round {} must face a registered player",
            index + 1,
            round + 1
        )));
    }
    Ok(())
}

/// Every registered player takes a first-round slot
fn check_all_placed(
    players: &[PlayerSeed],
    entries: &HashMap<String, Entry>,
    placed: &HashSet<EntryId>,
) -> TournamentResult<()> {
    let unplaced = players
        .iter()
        .filter_map(|player| entries.get(&player.name))
        .find(|entry| !placed.contains(&entry.id));

    match unplaced {
        Some(entry) => Err(TournamentError::validation(format!(
            "Player '{}' has no match in round 1",
            entry.player_name
        ))),
        None => Ok(()),
    }
}

/// Result written at build time, if any.
///
/// A BYE credits the present player with the supplied score, or 1 when none
/// was supplied; otherwise nonzero supplied scores are imported as-is.
fn initial_scores(
    player1: &Slot,
    player2: &Slot,
    shape_match: &ShapeMatch,
) -> TournamentResult<Option<Scoreline>> {
    let winner_score = |supplied: i32| if supplied > 0 { supplied } else { 1 };

    let scores = if player1.is_bye() {
        Some(Scoreline::new(0, winner_score(shape_match.score2))?)
    } else if player2.is_bye() {
        Some(Scoreline::new(winner_score(shape_match.score1), 0)?)
    } else if shape_match.score1 != 0 || shape_match.score2 != 0 {
        Some(Scoreline::new(shape_match.score1, shape_match.score2)?)
    } else {
        None
    };

    Ok(scores)
}

impl<S: BracketStore> BracketManager<S> {
    /// Replace the tournament's bracket with the one described by `request`.
    ///
    /// Everything happens in one transaction: the previous entries, matches,
    /// results and snapshot are retired, players are upserted by name, every
    /// match of the shape is written, BYE and imported results are recorded
    /// and decided winners move into successor slots that are still open.
    pub async fn build_bracket(
        &self,
        tournament_id: TournamentId,
        caller: UserId,
        request: BuildRequest,
    ) -> TournamentResult<BuildOutcome> {
        let players = normalize_players(&request.players)?;
        let shape = if request.bracket.is_empty() {
            seeded_shape(&players)
        } else {
            request.bracket
        };

        let mut tx = self.store.begin().await?;
        let outcome = async {
            let tournament = lock_owned(&mut tx, tournament_id, caller).await?;
            if tournament.tournament_type != TournamentType::SingleElimination {
                return Err(TournamentError::validation(format!(
                    "Brackets can only be built for single_elimination tournaments, not {}",
                    tournament.tournament_type
                )));
            }
            validate_player_count(players.len(), tournament.max_players)?;
            validate_shape(&shape, players.len())?;

            // Retire the previous bracket
            tx.soft_delete_bracket(tournament_id).await?;

            let mut entries = HashMap::new();
            for player in players.iter().filter(|player| player.name != BYE_NAME) {
                let entry = tx
                    .upsert_entry(tournament_id, &player.name, player.seed)
                    .await?;
                entries.insert(entry.player_name.clone(), entry);
            }

            let mut decided: Vec<(Match, SlotPosition)> = Vec::new();
            let mut matches_created = 0;

            for (round, shape_matches) in shape.rounds().iter().enumerate() {
                let mut placed: HashSet<EntryId> = HashSet::new();

                for (index, shape_match) in shape_matches.iter().enumerate() {
                    let player1 = resolve_slot(&shape_match.player1, &entries, round, index)?;
                    let player2 = resolve_slot(&shape_match.player2, &entries, round, index)?;
                    check_pairing(&player1, &player2, round, index)?;

                    for slot in [&player1, &player2] {
                        if let Slot::Entry { id, name } = slot {
                            if !placed.insert(*id) {
                                return Err(TournamentError::validation(format!(
                                    "Player '{name}' appears more than once in round {}",
                                    round + 1
                                )));
                            }
                        }
                    }

                    let scores = initial_scores(&player1, &player2, shape_match)?;
                    let status = scores.map_or(MatchStatus::Pending, |s| s.status());

                    let row = tx
                        .upsert_match(&NewMatch {
                            tournament_id,
                            round_number: round as i32 + 1,
                            match_number: index as i32 + 1,
                            player1,
                            player2,
                            status,
                        })
                        .await?;
                    matches_created += 1;

                    if let Some(scores) = scores {
                        tx.insert_result(row.id, tournament_id, scores.player1, scores.player2)
                            .await?;
                        if let Some(winner) = scores.winner() {
                            decided.push((row, winner));
                        }
                    }
                }

                if round == 0 {
                    check_all_placed(&players, &entries, &placed)?;
                }
            }

            // Successors exist only once every match is written. Rounds are
            // walked in order, so a source re-read here already carries any
            // winner placed into it by an earlier round.
            for (row, winner) in &decided {
                let current = tx
                    .find_match(tournament_id, row.round_number, row.match_number)
                    .await?
                    .unwrap_or_else(|| row.clone());
                advance_if_open(&mut tx, &current, *winner).await?;
            }

            let snapshot = serde_json::to_value(&shape)?;
            tx.upsert_snapshot(tournament_id, &snapshot, caller).await?;

            Ok(matches_created)
        }
        .await;
        let matches_created = complete_transaction(tx, outcome).await?;

        log::info!(
            "Bracket saved for tournament {} by user {}: {} players, {} matches",
            tournament_id,
            caller,
            players.len(),
            matches_created
        );
        Ok(BuildOutcome {
            bracket: shape,
            matches_created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_count_rules() {
        for count in [0, 1, 3, 5, 6, 7] {
            assert!(validate_player_count(count, 64).is_err(), "count {count}");
        }
        for count in [2, 4, 8, 16, 32] {
            assert!(validate_player_count(count, 32).is_ok(), "count {count}");
        }
        assert!(validate_player_count(16, 8).is_err());
    }

    #[test]
    fn test_normalize_players() {
        let players = vec![
            PlayerSeed::new(" Alice ", 1),
            PlayerSeed::new("BYE", 0),
            PlayerSeed::new("BYE", 0),
            PlayerSeed::new("Bob", 2),
        ];
        let normalized = normalize_players(&players).unwrap();
        assert_eq!(normalized[0].name, "Alice");
        assert_eq!(normalized.len(), 4);

        let clash = vec![PlayerSeed::new("Alice", 1), PlayerSeed::new("Alice ", 2)];
        assert!(normalize_players(&clash).is_err());

        let blank = vec![PlayerSeed::new("  ", 1), PlayerSeed::new("Bob", 2)];
        assert!(normalize_players(&blank).is_err());
    }

    #[test]
    fn test_pairing_rules() {
        let entry = Slot::Entry {
            id: 1,
            name: "A".to_string(),
        };
        assert!(check_pairing(&entry, &Slot::Bye, 0, 0).is_ok());
        assert!(check_pairing(&Slot::Bye, &entry, 0, 0).is_ok());
        assert!(check_pairing(&Slot::Bye, &Slot::Bye, 0, 0).is_err());
        assert!(check_pairing(&Slot::Bye, &Slot::Open, 1, 0).is_err());
        assert!(check_pairing(&Slot::Open, &Slot::Open, 1, 0).is_ok());
    }

    #[test]
    fn test_bye_scores() {
        let entry = Slot::Entry {
            id: 1,
            name: "A".to_string(),
        };
        let plain = ShapeMatch::new(PlayerSeed::new("A", 1), PlayerSeed::new("BYE", 0));
        let scores = initial_scores(&entry, &Slot::Bye, &plain).unwrap().unwrap();
        assert_eq!((scores.player1, scores.player2), (1, 0));

        let supplied = plain.clone().with_scores(3, 0);
        let scores = initial_scores(&entry, &Slot::Bye, &supplied)
            .unwrap()
            .unwrap();
        assert_eq!((scores.player1, scores.player2), (3, 0));

        let scores = initial_scores(&Slot::Bye, &entry, &plain).unwrap().unwrap();
        assert_eq!((scores.player1, scores.player2), (0, 1));
    }

    #[test]
    fn test_shape_validation() {
        let players: Vec<PlayerSeed> = (1..=4)
            .map(|seed| PlayerSeed::new(format!("P{seed}"), seed))
            .collect();
        let mut shape = seeded_shape(&players);
        assert!(validate_shape(&shape, 4).is_ok());

        shape.0.pop();
        assert!(validate_shape(&shape, 4).is_err());
    }
}
