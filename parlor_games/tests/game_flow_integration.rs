//! Integration tests for the cooperative game driven end-to-end through
//! `GameService` over the in-memory store, the way the HTTP layer drives
//! it in production.

use std::sync::Arc;

use parlor_games::{
    GameError, GameService, GameView, MgmtAccess, PlayerAccess, ServiceError,
    fireworks::{Action, Status},
    session::{GameConfig, SessionError},
    store::MemoryStore,
};

const KEY: [u8; 32] = [42; 32];
const TOTAL_CARDS: usize = 50;

fn service() -> GameService {
    GameService::new(
        Arc::new(MemoryStore::new()),
        KEY,
        chrono::Duration::hours(2),
        chrono::Duration::seconds(15),
    )
}

async fn fireworks_session(
    service: &GameService,
    names: &[&str],
) -> (MgmtAccess, Vec<PlayerAccess>) {
    let handles = service
        .create_session(GameConfig::Fireworks)
        .await
        .expect("create");
    let invite = format!(
        "{}:{}:{}",
        handles.session_id, handles.salt, handles.invite_token
    )
    .parse()
    .expect("invite grammar");

    let mut players = Vec::new();
    for name in names {
        let joined = service.join_session(&invite, name).await.expect("join");
        players.push(PlayerAccess {
            session_id: handles.session_id,
            salt: handles.salt.clone(),
            player_id: joined.player_id,
            token: joined.player_token,
        });
    }
    let mgmt = MgmtAccess {
        session_id: handles.session_id,
        salt: handles.salt,
        token: handles.mgmt_token,
    };
    (mgmt, players)
}

fn fireworks_view(snapshot: &parlor_games::Snapshot) -> &parlor_games::view::FireworksView {
    match &snapshot.view {
        GameView::Fireworks(view) => view,
        GameView::Words(_) => panic!("expected fireworks view"),
    }
}

/// Conservation as a client can observe it: slot occupancy stands in for
/// hidden hand contents.
fn observed_cards(view: &parlor_games::view::FireworksView) -> usize {
    let in_hands: usize = view
        .hands
        .iter()
        .map(|h| h.slots.iter().filter(|&&s| s).count())
        .sum();
    view.piles.iter().map(|&p| p as usize).sum::<usize>()
        + view.discard_count
        + view.deck_remaining
        + in_hands
}

#[tokio::test]
async fn forged_player_token_is_rejected() {
    let service = service();
    let (_, players) = fireworks_session(&service, &["alice", "bob"]).await;
    let mut access = players[0].clone();
    access.token = "00000000000000000000".to_string();
    let err = service.poll(&access).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Session(SessionError::InvalidToken)
    ));
}

#[tokio::test]
async fn start_needs_two_players() {
    let service = service();
    let (mgmt, _) = fireworks_session(&service, &["alice"]).await;
    let err = service.start_game(&mgmt, None).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Game(GameError::NotEnoughPlayers)
    ));
}

#[tokio::test]
async fn duplicate_name_conflicts() {
    let service = service();
    let handles = service
        .create_session(GameConfig::Fireworks)
        .await
        .unwrap();
    let invite = format!(
        "{}:{}:{}",
        handles.session_id, handles.salt, handles.invite_token
    )
    .parse()
    .unwrap();
    service.join_session(&invite, "alice").await.unwrap();
    let err = service.join_session(&invite, "alice").await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Session(SessionError::NameConflict)
    ));
}

#[tokio::test]
async fn sixth_player_is_turned_away() {
    let service = service();
    let handles = service
        .create_session(GameConfig::Fireworks)
        .await
        .unwrap();
    let invite: parlor_games::InviteCode = format!(
        "{}:{}:{}",
        handles.session_id, handles.salt, handles.invite_token
    )
    .parse()
    .unwrap();

    let mut joined = Vec::new();
    for name in ["alice", "bob", "carol", "dave", "erin"] {
        joined.push(service.join_session(&invite, name).await.unwrap());
    }
    let err = service.join_session(&invite, "frank").await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Session(SessionError::SessionFull)
    ));

    // A full table still deals a complete hand to every seat.
    let mgmt = MgmtAccess {
        session_id: handles.session_id,
        salt: handles.salt.clone(),
        token: handles.mgmt_token,
    };
    service.start_game(&mgmt, None).await.unwrap();

    let access = PlayerAccess {
        session_id: handles.session_id,
        salt: handles.salt,
        player_id: joined[0].player_id,
        token: joined[0].player_token.clone(),
    };
    let snapshot = service.poll(&access).await.unwrap();
    let view = fireworks_view(&snapshot);
    assert_eq!(view.hands.len(), 5);
    for hand in &view.hands {
        assert_eq!(hand.slots.iter().filter(|&&s| s).count(), 4);
    }
    assert_eq!(observed_cards(view), TOTAL_CARDS);
}

#[tokio::test]
async fn full_game_runs_to_completion_with_invariants() {
    let service = service();
    let (mgmt, players) = fireworks_session(&service, &["alice", "bob"]).await;
    service.start_game(&mgmt, None).await.unwrap();

    let snapshot = service.poll(&players[0]).await.unwrap();
    let view = fireworks_view(&snapshot);
    assert_eq!(view.status, Status::PlayerThinking);
    assert_eq!(view.active_player, Some(players[0].player_id));
    assert_eq!(observed_cards(view), TOTAL_CARDS);

    // Advance before any action is refused.
    let err = service.advance_turn(&players[0]).await.unwrap_err();
    assert!(matches!(err, ServiceError::Game(GameError::TooEarly)));

    // Everyone always plays slot 0: the game must terminate (by fuses or
    // deck exhaustion) well within a bounded number of turns.
    let mut last_hints = 8u8;
    let mut last_fuses = 3u8;
    for _ in 0..200 {
        let who = {
            let snapshot = service.poll(&players[0]).await.unwrap();
            let view = fireworks_view(&snapshot);
            if view.status == Status::GameOver {
                break;
            }
            let active = view.active_player.expect("active player while running");
            players
                .iter()
                .find(|p| p.player_id == active)
                .expect("active is a joined player")
                .clone()
        };

        let snapshot = service
            .submit_action(&who, Action::Play { position: 0 })
            .await
            .unwrap();
        let view = fireworks_view(&snapshot);
        assert_eq!(observed_cards(view), TOTAL_CARDS);
        assert!(view.hints <= 8);
        assert!(view.fuses <= last_fuses, "fuses may only burn down");
        assert!(view.hints <= last_hints.saturating_add(1));
        last_hints = view.hints;
        last_fuses = view.fuses;
        assert!(view.last_action.is_some());

        service.advance_turn(&who).await.unwrap();
    }

    let snapshot = service.poll(&players[1]).await.unwrap();
    let view = fireworks_view(&snapshot);
    assert_eq!(view.status, Status::GameOver);
    let score = view.score.expect("final score set at game over");
    if view.fuses == 0 {
        assert_eq!(score, 0, "failed show scores zero");
    } else {
        assert_eq!(score, view.piles.iter().map(|&p| u32::from(p)).sum::<u32>());
    }

    // Terminal: no further mutation.
    let err = service
        .submit_action(&players[0], Action::Play { position: 0 })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Game(GameError::GameOver | GameError::NotYourTurn)
    ));
}

#[tokio::test]
async fn hints_are_informational_and_bounded() {
    let service = service();
    let (mgmt, players) = fireworks_session(&service, &["alice", "bob", "carol"]).await;
    service.start_game(&mgmt, None).await.unwrap();

    let snapshot = service
        .submit_action(
            &players[0],
            Action::Hint {
                target: players[1].player_id,
                scope: parlor_games::fireworks::HintScope::Value(1),
            },
        )
        .await
        .unwrap();
    let view = fireworks_view(&snapshot);
    assert_eq!(view.hints, 7);
    assert_eq!(observed_cards(view), TOTAL_CARDS);
    let record = view.last_action.as_ref().unwrap();
    assert!(record.card.is_none(), "hints reveal no card");
}

#[tokio::test]
async fn discarded_lists_revealed_cards() {
    let service = service();
    let (mgmt, players) = fireworks_session(&service, &["alice", "bob"]).await;
    service.start_game(&mgmt, None).await.unwrap();

    assert!(service.discarded(&players[0]).await.unwrap().is_empty());

    // Burn a hint first so the discard is legal.
    service
        .submit_action(
            &players[0],
            Action::Hint {
                target: players[1].player_id,
                scope: parlor_games::fireworks::HintScope::Value(3),
            },
        )
        .await
        .unwrap();
    service.advance_turn(&players[0]).await.unwrap();
    service
        .submit_action(&players[1], Action::Discard { position: 2 })
        .await
        .unwrap();

    let discarded = service.discarded(&players[0]).await.unwrap();
    assert_eq!(discarded.len(), 1);
}

#[tokio::test]
async fn abandoned_session_is_gone() {
    let service = service();
    let (mgmt, players) = fireworks_session(&service, &["alice", "bob"]).await;
    service.abandon_session(&mgmt).await.unwrap();

    let err = service.poll(&players[0]).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Session(SessionError::SessionExpired)
    ));
}

#[tokio::test]
async fn non_active_player_cannot_act() {
    let service = service();
    let (mgmt, players) = fireworks_session(&service, &["alice", "bob"]).await;
    service.start_game(&mgmt, None).await.unwrap();

    let err = service
        .submit_action(&players[1], Action::Play { position: 0 })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Game(GameError::NotYourTurn)));
}
