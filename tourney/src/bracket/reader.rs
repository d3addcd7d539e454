//! Read model of a bracket.

use std::collections::HashMap;

use super::BracketManager;
use super::advancement::Scoreline;
use super::models::{BracketView, EntryView, MatchView, SlotView};
use super::seeding::bracket_rounds;
use crate::db::BracketStore;
use crate::tournament::{
    BYE_NAME, BracketSnapshot, Entry, EntryId, MatchRecord, MatchStatus, Slot, Tournament,
    TournamentError, TournamentId, TournamentResult,
};

fn slot_view(slot: &Slot, seeds: &HashMap<EntryId, &Entry>) -> SlotView {
    match slot {
        Slot::Entry { id, name } => {
            let entry = seeds.get(id);
            SlotView {
                name: entry.map_or_else(|| name.clone(), |entry| entry.player_name.clone()),
                seed: entry.map_or(0, |entry| entry.seed_number),
                id: Some(*id),
            }
        }
        // Anything without an entry renders as a BYE
        Slot::Bye | Slot::Open => SlotView {
            name: BYE_NAME.to_string(),
            seed: 0,
            id: None,
        },
    }
}

/// Zero-based round of a stored match, `None` beyond the deepest possible bracket
fn round_index(round_number: i32) -> Option<usize> {
    let limit = bracket_rounds(i32::MAX) as usize;
    let index = usize::try_from(round_number.max(1)).ok()? - 1;
    (index < limit).then_some(index)
}

/// Group persisted matches into zero-based rounds.
///
/// Rounds missing between existing ones come out empty; no matches at all
/// gives no rounds. Rows past the deepest possible bracket are left out of
/// the rounds but still listed in `matches`.
pub fn assemble(tournament: Tournament, entries: Vec<Entry>, matches: Vec<MatchRecord>) -> BracketView {
    let seeds: HashMap<EntryId, &Entry> = entries.iter().map(|entry| (entry.id, entry)).collect();

    let mut ordered: Vec<(usize, &MatchRecord)> = matches
        .iter()
        .filter_map(|record| {
            let index = round_index(record.match_row.round_number);
            if index.is_none() {
                log::warn!(
                    "Skipping match {} of tournament {} at round {}",
                    record.match_row.id,
                    record.match_row.tournament_id,
                    record.match_row.round_number
                );
            }
            index.map(|index| (index, record))
        })
        .collect();
    ordered.sort_by_key(|(index, record)| (*index, record.match_row.match_number));

    let round_count = ordered.last().map_or(0, |(index, _)| index + 1);
    let mut bracket: Vec<Vec<MatchView>> = vec![Vec::new(); round_count];

    for (index, record) in &ordered {
        let row = &record.match_row;
        let (score1, score2) = record
            .result
            .as_ref()
            .map_or((0, 0), |result| (result.player1_score, result.player2_score));

        bracket[*index].push(MatchView {
            player1: slot_view(&row.player1, &seeds),
            player2: slot_view(&row.player2, &seeds),
            score1,
            score2,
            status: row.status,
        });
    }

    let finals: Vec<&MatchRecord> = ordered
        .iter()
        .filter(|(index, _)| index + 1 == round_count)
        .map(|(_, record)| *record)
        .collect();
    let champion = champion(&finals, &seeds);
    let entries = entries.iter().map(EntryView::from).collect();

    BracketView {
        tournament,
        entries,
        bracket,
        matches,
        champion,
    }
}

/// Winner of the single match of the last round once it is completed
fn champion(finals: &[&MatchRecord], seeds: &HashMap<EntryId, &Entry>) -> Option<SlotView> {
    let [final_match] = finals else {
        return None;
    };
    if final_match.match_row.status != MatchStatus::Completed {
        return None;
    }

    let result = final_match.result.as_ref()?;
    let winner = Scoreline {
        player1: result.player1_score,
        player2: result.player2_score,
    }
    .winner()?;

    match final_match.match_row.slot(winner) {
        slot @ Slot::Entry { .. } => Some(slot_view(slot, seeds)),
        _ => None,
    }
}

impl<S: BracketStore> BracketManager<S> {
    /// Public view of a tournament's bracket; no ownership required
    pub async fn get_bracket(&self, tournament_id: TournamentId) -> TournamentResult<BracketView> {
        let tournament = self
            .store
            .find_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::NotFound(tournament_id))?;
        let entries = self.store.list_entries(tournament_id).await?;
        let matches = self.store.list_matches(tournament_id).await?;

        log::debug!(
            "Assembling bracket of tournament {} from {} matches",
            tournament_id,
            matches.len()
        );
        Ok(assemble(tournament, entries, matches))
    }

    /// Shape submitted with the last successful build, kept for audit.
    ///
    /// Not authoritative: matches and results may have moved on since.
    pub async fn get_snapshot(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Option<BracketSnapshot>> {
        self.store
            .find_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::NotFound(tournament_id))?;
        self.store.find_snapshot(tournament_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::{Match, MatchResult, TournamentStatus, TournamentType};
    use chrono::Utc;

    fn tournament() -> Tournament {
        Tournament {
            id: 1,
            name: "Cup".to_string(),
            description: None,
            tournament_type: TournamentType::SingleElimination,
            max_players: 4,
            entry_fee: 0,
            status: TournamentStatus::Active,
            created_by: 1,
            start_date: None,
            end_date: None,
            created_on: Utc::now(),
            modified_on: Utc::now(),
        }
    }

    fn entry(id: EntryId, name: &str, seed: i32) -> Entry {
        Entry {
            id,
            tournament_id: 1,
            player_name: name.to_string(),
            seed_number: seed,
        }
    }

    fn record(round: i32, number: i32, p1: Slot, p2: Slot, scores: Option<(i32, i32)>) -> MatchRecord {
        let status = match scores {
            Some((a, b)) if a != b => MatchStatus::Completed,
            _ => MatchStatus::Pending,
        };
        let id = i64::from(round) * 100 + i64::from(number);
        MatchRecord {
            match_row: Match {
                id,
                tournament_id: 1,
                round_number: round,
                match_number: number,
                player1: p1,
                player2: p2,
                status,
            },
            result: scores.map(|(player1_score, player2_score)| MatchResult {
                id: id + 1000,
                match_id: id,
                tournament_id: 1,
                player1_score,
                player2_score,
            }),
        }
    }

    fn slot(id: EntryId, name: &str) -> Slot {
        Slot::Entry {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_empty_bracket_has_no_rounds() {
        let view = assemble(tournament(), Vec::new(), Vec::new());
        assert!(view.bracket.is_empty());
        assert!(view.champion.is_none());
    }

    #[test]
    fn test_gaps_become_empty_rounds() {
        let view = assemble(
            tournament(),
            vec![entry(10, "A", 1)],
            vec![record(3, 1, slot(10, "A"), Slot::Open, None)],
        );

        assert_eq!(view.bracket.len(), 3);
        assert!(view.bracket[0].is_empty());
        assert!(view.bracket[1].is_empty());
        assert_eq!(view.bracket[2][0].player1.name, "A");
        assert_eq!(view.bracket[2][0].player1.seed, 1);
        assert_eq!(view.bracket[2][0].player2.name, BYE_NAME);
        assert_eq!(view.bracket[2][0].player2.seed, 0);
        assert_eq!(view.bracket[2][0].player2.id, None);
    }

    #[test]
    fn test_champion_is_final_winner() {
        let entries = vec![entry(10, "A", 1), entry(11, "C", 3)];
        let matches = vec![record(2, 1, slot(10, "A"), slot(11, "C"), Some((9, 11)))];
        let view = assemble(tournament(), entries, matches);

        let champion = view.champion.unwrap();
        assert_eq!(champion.name, "C");
        assert_eq!(champion.id, Some(11));
    }

    #[test]
    fn test_no_champion_on_tie() {
        let matches = vec![record(1, 1, slot(10, "A"), slot(11, "B"), Some((4, 4)))];
        let view = assemble(tournament(), vec![entry(10, "A", 1), entry(11, "B", 2)], matches);
        assert!(view.champion.is_none());
        assert_eq!(view.bracket[0][0].score1, 4);
    }

    #[test]
    fn test_far_rounds_do_not_size_the_view() {
        let matches = vec![
            record(1, 1, slot(10, "A"), slot(11, "B"), None),
            record(i32::MAX, 1, Slot::Open, Slot::Open, Some((1, 1))),
            record(5_000_000, 1, Slot::Open, Slot::Open, None),
        ];
        let view = assemble(tournament(), Vec::new(), matches);

        assert_eq!(view.bracket.len(), 1);
        assert_eq!(view.bracket[0][0].player1.name, "A");
        assert_eq!(view.matches.len(), 3);
    }

    #[test]
    fn test_deepest_round_is_kept() {
        let view = assemble(
            tournament(),
            Vec::new(),
            vec![record(31, 1, Slot::Open, Slot::Open, None)],
        );
        assert_eq!(view.bracket.len(), 31);
        assert!(view.champion.is_none());
    }

    #[test]
    fn test_matches_are_ordered_within_round() {
        let matches = vec![
            record(1, 2, slot(12, "B"), slot(13, "C"), None),
            record(1, 1, slot(10, "A"), slot(11, "D"), None),
        ];
        let view = assemble(tournament(), Vec::new(), matches);
        assert_eq!(view.bracket[0][0].player1.name, "A");
        assert_eq!(view.bracket[0][1].player1.name, "B");
    }
}
