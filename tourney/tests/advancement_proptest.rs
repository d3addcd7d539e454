//! Property-based tests for winner advancement.
//!
//! Any decisive first-round result must land its winner in exactly one slot
//! of the next round and leave every other match untouched.

use std::sync::Arc;

use proptest::prelude::*;
use tourney::bracket::{BracketManager, BuildRequest, PlayerSeed, ResultSubmission};
use tourney::db::MemoryStore;
use tourney::tournament::{MatchRecord, Slot, TournamentConfig, TournamentManager};

const OWNER: i64 = 7;

fn bracket_size() -> impl Strategy<Value = usize> {
    prop_oneof![Just(2usize), Just(4), Just(8), Just(16)]
}

fn decisive_scores() -> impl Strategy<Value = (i32, i32)> {
    (0i32..50, 0i32..50).prop_filter("scores must differ", |(a, b)| a != b)
}

/// Build a seeded bracket, submit one result and return the matches before and after
fn run_submission(size: usize, index: u32, scores: (i32, i32)) -> (Vec<MatchRecord>, Vec<MatchRecord>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    runtime.block_on(async {
        let store = Arc::new(MemoryStore::new());
        let tournaments = TournamentManager::new(store.clone());
        let brackets = BracketManager::new(store);

        let tournament = tournaments
            .create_tournament(OWNER, TournamentConfig::single_elimination("Open", 16))
            .await
            .expect("Failed to create tournament");

        let players = (1..=size)
            .map(|seed| PlayerSeed::new(format!("Player {seed}"), seed as i32))
            .collect();
        brackets
            .build_bracket(
                tournament.id,
                OWNER,
                BuildRequest {
                    players,
                    bracket: Default::default(),
                },
            )
            .await
            .expect("Failed to build bracket");

        let before = brackets.get_bracket(tournament.id).await.unwrap().matches;
        brackets
            .submit_result(
                tournament.id,
                OWNER,
                ResultSubmission {
                    round: 0,
                    match_index: index,
                    score1: scores.0,
                    score2: scores.1,
                },
            )
            .await
            .expect("Failed to submit result");
        let after = brackets.get_bracket(tournament.id).await.unwrap().matches;

        (before, after)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_winner_lands_in_single_successor_slot(
        (size, index) in bracket_size().prop_flat_map(|size| (Just(size), 0..(size as u32 / 2))),
        scores in decisive_scores(),
    ) {
        let (before, after) = run_submission(size, index, scores);
        prop_assert_eq!(before.len(), after.len());

        let source = before
            .iter()
            .find(|r| r.match_row.round_number == 1 && r.match_row.match_number == index as i32 + 1)
            .unwrap();
        let winner = if scores.0 > scores.1 {
            source.match_row.player1.clone()
        } else {
            source.match_row.player2.clone()
        };

        let target_number = (index / 2) as i32 + 1;
        let mut changed_slots = 0;

        for (old, new) in before.iter().zip(&after) {
            let row = &new.match_row;
            prop_assert_eq!(old.match_row.id, row.id);

            if row.round_number == 2 && row.match_number == target_number {
                let (kept, placed) = if index % 2 == 0 {
                    (&row.player2, &row.player1)
                } else {
                    (&row.player1, &row.player2)
                };
                prop_assert_eq!(placed, &winner);
                prop_assert_eq!(kept, &Slot::Open);
                changed_slots += 1;
            } else {
                prop_assert_eq!(&old.match_row.player1, &row.player1);
                prop_assert_eq!(&old.match_row.player2, &row.player2);
            }
        }

        // The final of a two-player bracket has no successor
        if size == 2 {
            prop_assert_eq!(changed_slots, 0);
        } else {
            prop_assert_eq!(changed_slots, 1);
        }
    }
}
