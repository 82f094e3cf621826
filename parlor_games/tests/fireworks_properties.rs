//! Property tests for the cooperative game engine: whatever a client
//! throws at it, the deck accounting and token bounds must hold and a
//! rejected call must leave the state untouched.

use proptest::prelude::*;

use parlor_games::fireworks::{Action, FireworksGame, HintScope, Status};
use parlor_games::session::PlayerId;
use rand::{SeedableRng, rngs::StdRng};

const TOTAL_CARDS: usize = 50;

#[derive(Clone, Debug)]
enum Step {
    Play(usize),
    Discard(usize),
    Hint(usize, bool, u8),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0usize..6).prop_map(Step::Play),
        (0usize..6).prop_map(Step::Discard),
        ((0usize..5), any::<bool>(), (0u8..7)).prop_map(|(t, c, v)| Step::Hint(t, c, v)),
    ]
}

fn to_action(step: &Step, players: &[PlayerId]) -> Action {
    match *step {
        Step::Play(position) => Action::Play { position },
        Step::Discard(position) => Action::Discard { position },
        Step::Hint(target, colour, value) => Action::Hint {
            target: players[target % players.len()],
            scope: if colour {
                HintScope::Colour(value)
            } else {
                HintScope::Value(value)
            },
        },
    }
}

fn check_invariants(game: &FireworksGame) {
    assert_eq!(game.card_count(), TOTAL_CARDS);
    assert!(game.hints <= 8);
    assert!(game.fuses <= 3);
    assert!(game.piles.iter().all(|&p| p <= 5));
    if game.status == Status::GameOver {
        assert!(game.score.is_some());
    } else {
        assert!(game.score.is_none());
    }
}

proptest! {
    #[test]
    fn random_sequences_preserve_accounting(
        seed in any::<u64>(),
        n_players in 2usize..=5,
        steps in prop::collection::vec(step_strategy(), 1..150),
    ) {
        let players: Vec<PlayerId> = (1..=n_players as i64).collect();
        let mut game = FireworksGame::new();
        game.start(&players, &mut StdRng::seed_from_u64(seed)).unwrap();
        check_invariants(&game);

        for step in &steps {
            let actor = game.active;
            let before = game.clone();
            match game.submit_action(actor, &players, to_action(step, &players)) {
                Ok(_) => {
                    prop_assert_eq!(game.status, Status::TurnEnd);
                    game.advance(actor).unwrap();
                }
                Err(_) => {
                    // Rejected calls must not mutate anything.
                    prop_assert_eq!(&game, &before);
                    if game.status == Status::GameOver {
                        break;
                    }
                }
            }
            check_invariants(&game);
        }
    }

    #[test]
    fn wrong_actor_never_mutates(
        seed in any::<u64>(),
        position in 0usize..5,
    ) {
        let players: Vec<PlayerId> = vec![1, 2, 3];
        let mut game = FireworksGame::new();
        game.start(&players, &mut StdRng::seed_from_u64(seed)).unwrap();
        let before = game.clone();

        let wrong_actor_result = game.submit_action(1, &players, Action::Play { position });
        prop_assert!(wrong_actor_result.is_err());
        prop_assert!(game.advance(2).is_err());
        prop_assert_eq!(&game, &before);
    }
}
