//! Turn engine for the cooperative fireworks card game.
//!
//! A pure state machine: transitions are driven only by explicit client
//! calls, never by a clock. The active player performs exactly one action
//! per turn (play, discard, or hint), the result is recorded so every
//! client can display it, and the turn is then advanced explicitly. The
//! engine never exposes deck contents, only the remaining count.

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    COLOUR_COUNT, MAX_FUSES, MAX_HINT_TOKENS, MIN_PLAYERS, PILE_COMPLETE, VALUES_PER_COLOUR,
    hand_size,
};
use crate::error::GameError;
use crate::session::PlayerId;

/// Colour index, `0..COLOUR_COUNT`.
pub type Colour = u8;

/// A single card: colour plus value 1..=5.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Card {
    pub colour: Colour,
    pub value: u8,
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.colour, self.value)
    }
}

/// What a hint points at: one colour or one value.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HintScope {
    Colour(Colour),
    Value(u8),
}

impl HintScope {
    fn matches(self, card: Card) -> bool {
        match self {
            Self::Colour(colour) => card.colour == colour,
            Self::Value(value) => card.value == value,
        }
    }
}

/// Action payload submitted by the active player. Tagged so that illegal
/// field combinations are unrepresentable.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Play { position: usize },
    Discard { position: usize },
    Hint { target: PlayerId, scope: HintScope },
}

/// Record of the most recent applied action, kept so clients can display
/// the result of a turn before the next one starts.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ActionRecord {
    pub turn: u32,
    pub player: PlayerId,
    pub action: Action,
    /// The card revealed by a play or discard.
    pub card: Option<Card>,
    /// True when a play misfired and consumed a fuse.
    pub was_error: bool,
    /// Hand positions of the hint target that match the hint scope.
    pub hint_positions: Vec<usize>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Initial,
    PlayerThinking,
    TurnEnd,
    /// Terminal. Score is 0 when the fuses ran out ("failed show"),
    /// otherwise the sum of pile heights.
    GameOver,
}

/// Full authoritative state of one cooperative game.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FireworksGame {
    pub status: Status,
    /// Remaining deck, top of the deck at the back. Contents never leave
    /// the server; only `deck.len()` is projected.
    deck: Vec<Card>,
    /// Pile height per colour, each 0..=5.
    pub piles: Vec<u8>,
    /// Revealed cards, in discard order (misplays included).
    pub discard: Vec<Card>,
    pub hints: u8,
    pub fuses: u8,
    /// Hands indexed by player position; fixed-size slots.
    pub hands: Vec<Vec<Option<Card>>>,
    /// Position of the active player.
    pub active: usize,
    pub turn: u32,
    pub last_action: Option<ActionRecord>,
    /// Set when the deck ran dry: position of the player who drew the
    /// last card. The game ends when the turn would come back to them.
    stop_before: Option<usize>,
    pub score: Option<u32>,
}

impl FireworksGame {
    /// Build the unstarted game.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: Status::Initial,
            deck: Vec::new(),
            piles: vec![0; COLOUR_COUNT],
            discard: Vec::new(),
            hints: MAX_HINT_TOKENS,
            fuses: MAX_FUSES,
            hands: Vec::new(),
            active: 0,
            turn: 0,
            last_action: None,
            stop_before: None,
            score: None,
        }
    }

    /// Shuffle, deal, and hand the first turn to the first joined player.
    pub fn start(
        &mut self,
        players: &[PlayerId],
        rng: &mut impl Rng,
    ) -> Result<(), GameError> {
        if self.status != Status::Initial {
            return Err(GameError::IllegalAction("game already started".into()));
        }
        if players.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }

        let mut deck = Vec::with_capacity(COLOUR_COUNT * VALUES_PER_COLOUR.len());
        for colour in 0..COLOUR_COUNT {
            for value in VALUES_PER_COLOUR {
                deck.push(Card {
                    colour: colour as Colour,
                    value,
                });
            }
        }
        deck.shuffle(rng);

        let per_hand = hand_size(players.len());
        let mut hands = Vec::with_capacity(players.len());
        for _ in players {
            let hand: Vec<Option<Card>> = (0..per_hand).map(|_| deck.pop()).collect();
            hands.push(hand);
        }

        self.deck = deck;
        self.hands = hands;
        self.piles = vec![0; COLOUR_COUNT];
        self.hints = MAX_HINT_TOKENS;
        self.fuses = MAX_FUSES;
        self.active = 0;
        self.turn = 1;
        self.status = Status::PlayerThinking;
        Ok(())
    }

    /// Apply the active player's action and move to `TurnEnd`.
    ///
    /// `actor` is the acting player's position; `players` maps positions to
    /// ids (join order).
    pub fn submit_action(
        &mut self,
        actor: usize,
        players: &[PlayerId],
        action: Action,
    ) -> Result<&ActionRecord, GameError> {
        match self.status {
            Status::PlayerThinking => {}
            Status::GameOver => return Err(GameError::GameOver),
            Status::Initial => {
                return Err(GameError::IllegalAction("game not started".into()));
            }
            Status::TurnEnd => {
                return Err(GameError::IllegalAction(
                    "turn already played; advance first".into(),
                ));
            }
        }
        if actor != self.active {
            return Err(GameError::NotYourTurn);
        }

        let record = match action {
            Action::Discard { position } => self.apply_discard(actor, players, position)?,
            Action::Play { position } => self.apply_play(actor, players, position)?,
            Action::Hint { target, scope } => self.apply_hint(actor, players, target, scope)?,
        };

        self.status = Status::TurnEnd;
        Ok(self.last_action.insert(record))
    }

    /// End the recorded turn: pass the pointer to the next player, or
    /// terminate the game.
    pub fn advance(&mut self, actor: usize) -> Result<Status, GameError> {
        match self.status {
            Status::TurnEnd => {}
            Status::GameOver => return Err(GameError::GameOver),
            Status::Initial | Status::PlayerThinking => return Err(GameError::TooEarly),
        }
        if actor != self.active {
            return Err(GameError::NotYourTurn);
        }

        if self.fuses == 0 {
            return Ok(self.finish(0));
        }
        if self.piles.iter().all(|&height| height == PILE_COMPLETE) {
            let total = self.pile_sum();
            return Ok(self.finish(total));
        }

        let next = (self.active + 1) % self.hands.len();
        if self.stop_before == Some(next) {
            let total = self.pile_sum();
            return Ok(self.finish(total));
        }

        self.active = next;
        self.turn += 1;
        self.status = Status::PlayerThinking;
        Ok(self.status)
    }

    fn finish(&mut self, score: u32) -> Status {
        self.status = Status::GameOver;
        self.score = Some(score);
        Status::GameOver
    }

    fn apply_discard(
        &mut self,
        actor: usize,
        players: &[PlayerId],
        position: usize,
    ) -> Result<ActionRecord, GameError> {
        if self.hints >= MAX_HINT_TOKENS {
            return Err(GameError::IllegalAction(
                "can't discard at max hint tokens".into(),
            ));
        }
        let card = self.take_card(actor, position)?;
        self.discard.push(card);
        self.hints = (self.hints + 1).min(MAX_HINT_TOKENS);
        self.draw_replacement(actor, position);
        Ok(ActionRecord {
            turn: self.turn,
            player: players[actor],
            action: Action::Discard { position },
            card: Some(card),
            was_error: false,
            hint_positions: Vec::new(),
        })
    }

    fn apply_play(
        &mut self,
        actor: usize,
        players: &[PlayerId],
        position: usize,
    ) -> Result<ActionRecord, GameError> {
        let card = self.take_card(actor, position)?;
        let colour = card.colour as usize;
        let was_error = if card.value == self.piles[colour] + 1 {
            self.piles[colour] += 1;
            if self.piles[colour] == PILE_COMPLETE {
                // Completing a pile refunds a hint token.
                self.hints = (self.hints + 1).min(MAX_HINT_TOKENS);
            }
            false
        } else {
            self.discard.push(card);
            self.fuses = self.fuses.saturating_sub(1);
            true
        };
        self.draw_replacement(actor, position);
        Ok(ActionRecord {
            turn: self.turn,
            player: players[actor],
            action: Action::Play { position },
            card: Some(card),
            was_error,
            hint_positions: Vec::new(),
        })
    }

    fn apply_hint(
        &mut self,
        actor: usize,
        players: &[PlayerId],
        target: PlayerId,
        scope: HintScope,
    ) -> Result<ActionRecord, GameError> {
        if self.hints == 0 {
            return Err(GameError::IllegalAction("no hint tokens left".into()));
        }
        let Some(target_pos) = players.iter().position(|&id| id == target) else {
            return Err(GameError::IllegalAction("unknown hint target".into()));
        };
        if target_pos == actor {
            return Err(GameError::IllegalAction("can't hint yourself".into()));
        }
        if let HintScope::Colour(colour) = scope
            && colour as usize >= COLOUR_COUNT
        {
            return Err(GameError::IllegalAction("unknown colour".into()));
        }

        let hint_positions: Vec<usize> = self.hands[target_pos]
            .iter()
            .enumerate()
            .filter_map(|(pos, slot)| (*slot).filter(|&card| scope.matches(card)).map(|_| pos))
            .collect();
        self.hints -= 1;
        Ok(ActionRecord {
            turn: self.turn,
            player: players[actor],
            action: Action::Hint { target, scope },
            card: None,
            was_error: false,
            hint_positions,
        })
    }

    fn take_card(&mut self, actor: usize, position: usize) -> Result<Card, GameError> {
        self.hands[actor]
            .get_mut(position)
            .and_then(Option::take)
            .ok_or(GameError::InvalidPosition)
    }

    fn draw_replacement(&mut self, actor: usize, position: usize) {
        if let Some(card) = self.deck.pop() {
            self.hands[actor][position] = Some(card);
            if self.deck.is_empty() {
                // Final round: everyone else gets one more turn.
                self.stop_before = Some(actor);
            }
        }
    }

    #[must_use]
    pub fn deck_remaining(&self) -> usize {
        self.deck.len()
    }

    #[must_use]
    pub fn pile_sum(&self) -> u32 {
        self.piles.iter().map(|&height| u32::from(height)).sum()
    }

    /// Total cards accounted for across piles, discard, deck and hands.
    /// Constant for the whole game; checked by tests.
    #[must_use]
    pub fn card_count(&self) -> usize {
        let in_hands: usize = self
            .hands
            .iter()
            .map(|hand| hand.iter().filter(|slot| slot.is_some()).count())
            .sum();
        self.pile_sum() as usize + self.discard.len() + self.deck.len() + in_hands
    }
}

impl Default for FireworksGame {
    fn default() -> Self {
        Self::new()
    }
}
