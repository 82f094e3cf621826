//! Snapshot projector: the view served on every poll.
//!
//! The projector is the only code that decides what a given viewer may
//! see. In the fireworks game a player's own hand is reduced to slot
//! occupancy; in the word game everyone else's submissions and scores
//! stay hidden until the round is scored. The `sync` stamp is a derived
//! convenience so thin clients can skip redraws, never authoritative
//! state.

use serde::{Deserialize, Serialize};

use crate::fireworks::{self, ActionRecord, Card, FireworksGame};
use crate::session::{Game, PlayerId, SessionId, SessionState};
use crate::words::{self, Board, PlayerScore, WordsGame};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Snapshot {
    pub session_id: SessionId,
    pub players: Vec<PlayerInfo>,
    pub sync: SyncStamp,
    #[serde(flatten)]
    pub view: GameView,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub position: usize,
}

/// Minimal change signal: if none of these moved, nothing a client
/// renders has changed.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SyncStamp {
    /// Store version; bumps on every persisted write, including lazy
    /// clock transitions.
    pub version: i64,
    pub player_count: usize,
    /// Turn counter (fireworks) or round counter (words).
    pub counter: u32,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameView {
    Fireworks(FireworksView),
    Words(WordsView),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FireworksView {
    pub status: fireworks::Status,
    pub piles: Vec<u8>,
    pub hints: u8,
    pub fuses: u8,
    pub deck_remaining: usize,
    pub discard_count: usize,
    pub turn: u32,
    pub active_player: Option<PlayerId>,
    pub last_action: Option<ActionRecord>,
    pub hands: Vec<HandView>,
    pub score: Option<u32>,
}

/// One player's hand as seen by the viewer. `cards` is absent for the
/// viewer's own hand; `slots` is always present so clients can render
/// card backs.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HandView {
    pub player: PlayerId,
    pub slots: Vec<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<Option<Card>>>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct WordsView {
    pub status: words::Status,
    pub round: u32,
    /// Hidden until the round is actually playing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<Board>,
    pub round_start: Option<chrono::DateTime<chrono::Utc>>,
    pub round_end: Option<chrono::DateTime<chrono::Utc>>,
    /// Players who have handed in their list (contents withheld).
    pub submitted: Vec<PlayerId>,
    /// The viewer's own submission, echoed back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_words: Option<Vec<String>>,
    /// All score records, present only once the round is scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<PlayerScore>>,
}

/// Project the authoritative state for one viewer. `viewer` is `None`
/// for the manager/spectator view, which sees every hand but no secret
/// deck contents either.
#[must_use]
pub fn project(state: &SessionState, viewer: Option<PlayerId>, version: i64) -> Snapshot {
    let players = state
        .players
        .iter()
        .map(|p| PlayerInfo {
            id: p.id,
            name: p.name.clone(),
            position: p.position,
        })
        .collect();

    let (counter, view) = match &state.game {
        Game::Fireworks(game) => (game.turn, project_fireworks(state, game, viewer)),
        Game::Words(game) => (game.round, project_words(game, viewer)),
    };

    Snapshot {
        session_id: state.id,
        players,
        sync: SyncStamp {
            version,
            player_count: state.players.len(),
            counter,
        },
        view,
    }
}

fn project_fireworks(
    state: &SessionState,
    game: &FireworksGame,
    viewer: Option<PlayerId>,
) -> GameView {
    let hands = state
        .players
        .iter()
        .filter_map(|p| {
            let hand = game.hands.get(p.position)?;
            let slots = hand.iter().map(Option::is_some).collect();
            // A player's own hand is visible to everyone except them.
            let cards = if viewer == Some(p.id) {
                None
            } else {
                Some(hand.clone())
            };
            Some(HandView {
                player: p.id,
                slots,
                cards,
            })
        })
        .collect();

    let active_player = if game.status == fireworks::Status::Initial {
        None
    } else {
        state.players.get(game.active).map(|p| p.id)
    };

    GameView::Fireworks(FireworksView {
        status: game.status,
        piles: game.piles.clone(),
        hints: game.hints,
        fuses: game.fuses,
        deck_remaining: game.deck_remaining(),
        discard_count: game.discard.len(),
        turn: game.turn,
        active_player,
        last_action: game.last_action.clone(),
        hands,
        score: game.score,
    })
}

fn project_words(game: &WordsGame, viewer: Option<PlayerId>) -> GameView {
    let scored = game.status == words::Status::Scored;
    let board = match game.status {
        words::Status::Playing | words::Status::Scoring | words::Status::Scored => {
            game.board.clone()
        }
        words::Status::Initial | words::Status::PreStart => None,
    };
    let submitted = game
        .submitted_players()
        .into_iter()
        .collect();
    let your_words = viewer
        .and_then(|id| game.submission_of(id))
        .map(<[String]>::to_vec);

    GameView::Words(WordsView {
        status: game.status,
        round: game.round,
        board,
        round_start: game.round_start,
        round_end: game.round_end,
        submitted,
        your_words,
        scores: if scored { game.scores.clone() } else { None },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Game;
    use crate::words::{WordsConfig, WordsGame};
    use chrono::{Duration, Utc};
    use rand::{SeedableRng, rngs::StdRng};

    fn fireworks_session() -> SessionState {
        let mut state = SessionState::new(
            "0123456789abcdef".into(),
            Game::Fireworks(FireworksGame::new()),
            Utc::now(),
            Duration::hours(2),
        );
        state.join("alice").unwrap();
        state.join("bob").unwrap();
        let ids = state.player_ids();
        if let Game::Fireworks(game) = &mut state.game {
            game.start(&ids, &mut StdRng::seed_from_u64(11)).unwrap();
        }
        state
    }

    #[test]
    fn own_hand_is_occupancy_only() {
        let state = fireworks_session();
        let alice = state.players[0].id;
        let snapshot = project(&state, Some(alice), 4);

        let GameView::Fireworks(view) = &snapshot.view else {
            panic!("wrong view");
        };
        let own = view.hands.iter().find(|h| h.player == alice).unwrap();
        assert!(own.cards.is_none());
        assert_eq!(own.slots, vec![true; 5]);

        let other = view.hands.iter().find(|h| h.player != alice).unwrap();
        let cards = other.cards.as_ref().unwrap();
        assert!(cards.iter().all(Option::is_some));
        assert_eq!(view.deck_remaining, 40);
        assert_eq!(snapshot.sync.version, 4);
        assert_eq!(snapshot.sync.player_count, 2);
    }

    #[test]
    fn spectator_sees_every_hand() {
        let state = fireworks_session();
        let snapshot = project(&state, None, 1);
        let GameView::Fireworks(view) = &snapshot.view else {
            panic!("wrong view");
        };
        assert!(view.hands.iter().all(|h| h.cards.is_some()));
    }

    #[test]
    fn word_scores_withheld_until_scored() {
        let mut state = SessionState::new(
            "0123456789abcdef".into(),
            Game::Words(WordsGame::new(WordsConfig::default())),
            Utc::now(),
            Duration::hours(2),
        );
        state.join("alice").unwrap();
        state.join("bob").unwrap();
        let alice = state.players[0].id;
        let now = Utc::now();

        let mut rng = StdRng::seed_from_u64(5);
        let Game::Words(game) = &mut state.game else {
            panic!("wrong game");
        };
        game.start_round(Duration::zero(), now, &mut rng).unwrap();
        game.refresh(now + Duration::seconds(1), 2);
        game.submit_words(alice, vec!["HI".into()], now + Duration::seconds(2), 2)
            .unwrap();

        let snapshot = project(&state, Some(alice), 2);
        let GameView::Words(view) = &snapshot.view else {
            panic!("wrong view");
        };
        assert_eq!(view.status, words::Status::Playing);
        assert!(view.board.is_some());
        assert!(view.scores.is_none());
        assert_eq!(view.submitted, vec![alice]);
        assert_eq!(view.your_words.as_deref(), Some(&["HI".to_string()][..]));

        // Bob sees that alice submitted, but not what.
        let bob = state.players[1].id;
        let snapshot = project(&state, Some(bob), 2);
        let GameView::Words(view) = &snapshot.view else {
            panic!("wrong view");
        };
        assert!(view.your_words.is_none());
        assert_eq!(view.submitted, vec![alice]);
    }

    #[test]
    fn board_hidden_before_playing() {
        let mut state = SessionState::new(
            "0123456789abcdef".into(),
            Game::Words(WordsGame::new(WordsConfig::default())),
            Utc::now(),
            Duration::hours(2),
        );
        state.join("alice").unwrap();
        let now = Utc::now();
        let Game::Words(game) = &mut state.game else {
            panic!("wrong game");
        };
        game.start_round(Duration::seconds(30), now, &mut StdRng::seed_from_u64(6))
            .unwrap();

        let snapshot = project(&state, None, 1);
        let GameView::Words(view) = &snapshot.view else {
            panic!("wrong view");
        };
        assert_eq!(view.status, words::Status::PreStart);
        assert!(view.board.is_none());
        assert!(view.round_start.is_some());
    }
}
