//! Round engine for the word-finding board game.
//!
//! Rounds are clock-driven but lazily evaluated: a round stores its start
//! and end timestamps and every read or write first calls [`WordsGame::
//! refresh`] with "now" to perform any pending transitions. There are no
//! background timers anywhere.

pub mod scoring;

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::{DEFAULT_DICE, DEFAULT_ROUND_SECS};
use crate::error::GameError;
use crate::session::PlayerId;

pub use scoring::{Cell, PlayerScore, ScoredWord, find_path, score_round};

/// The letter grid rolled for one round. Tiles may carry more than one
/// letter ("QU").
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Board {
    pub rows: usize,
    pub cols: usize,
    tiles: Vec<String>,
}

impl Board {
    #[must_use]
    pub fn from_tiles(rows: usize, cols: usize, tiles: Vec<String>) -> Self {
        debug_assert_eq!(tiles.len(), rows * cols);
        Self { rows, cols, tiles }
    }

    /// Roll one board from the dice set: shuffle the dice over the grid,
    /// then pick one face per die.
    #[must_use]
    pub fn roll(dice: &[Vec<String>], rows: usize, cols: usize, rng: &mut impl Rng) -> Self {
        let mut order: Vec<usize> = (0..dice.len()).collect();
        order.shuffle(rng);
        let tiles = order
            .into_iter()
            .take(rows * cols)
            .map(|die| {
                let faces = &dice[die];
                faces[rng.random_range(0..faces.len())].to_uppercase()
            })
            .collect();
        Self { rows, cols, tiles }
    }

    #[must_use]
    pub fn tile(&self, row: usize, col: usize) -> &str {
        &self.tiles[row * self.cols + col]
    }
}

/// Word-game configuration fixed at session creation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WordsConfig {
    /// One die per grid cell; each die lists its faces.
    #[serde(default = "default_dice")]
    pub dice: Vec<Vec<String>>,
    #[serde(default = "default_dim")]
    pub rows: usize,
    #[serde(default = "default_dim")]
    pub cols: usize,
    #[serde(default = "default_round_secs")]
    pub round_seconds: i64,
    /// Accepted words, uppercased on load. Empty means "no word list":
    /// every in-grid word counts without manager adjudication.
    #[serde(default)]
    pub dictionary: HashSet<String>,
}

fn default_dice() -> Vec<Vec<String>> {
    DEFAULT_DICE
        .iter()
        .map(|die| die.iter().map(|face| (*face).to_string()).collect())
        .collect()
}

const fn default_dim() -> usize {
    4
}

const fn default_round_secs() -> i64 {
    DEFAULT_ROUND_SECS
}

impl Default for WordsConfig {
    fn default() -> Self {
        Self {
            dice: default_dice(),
            rows: 4,
            cols: 4,
            round_seconds: DEFAULT_ROUND_SECS,
            dictionary: HashSet::new(),
        }
    }
}

impl WordsConfig {
    /// Normalize and sanity-check a client-supplied configuration.
    pub fn normalize(mut self) -> Result<Self, GameError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(GameError::IllegalAction("board must be non-empty".into()));
        }
        if self.dice.len() < self.rows * self.cols {
            return Err(GameError::IllegalAction(format!(
                "need {} dice for a {}x{} board",
                self.rows * self.cols,
                self.rows,
                self.cols
            )));
        }
        if self.dice.iter().any(|die| die.is_empty()) {
            return Err(GameError::IllegalAction("die with no faces".into()));
        }
        if self.round_seconds <= 0 {
            return Err(GameError::IllegalAction("round length must be positive".into()));
        }
        self.dictionary = self
            .dictionary
            .into_iter()
            .map(|word| word.to_uppercase())
            .collect();
        Ok(self)
    }
}

/// Round status. Monotonic within a round; a new round resets to
/// `PreStart`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Initial,
    PreStart,
    Playing,
    Scoring,
    Scored,
}

/// Authoritative word-game state for one session.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct WordsGame {
    pub config: WordsConfig,
    pub status: Status,
    pub round: u32,
    pub board: Option<Board>,
    pub round_start: Option<DateTime<Utc>>,
    pub round_end: Option<DateTime<Utc>>,
    /// Word lists submitted this round, in submission order.
    submissions: Vec<(PlayerId, Vec<String>)>,
    pub scores: Option<Vec<PlayerScore>>,
}

impl WordsGame {
    #[must_use]
    pub fn new(config: WordsConfig) -> Self {
        Self {
            config,
            status: Status::Initial,
            round: 0,
            board: None,
            round_start: None,
            round_end: None,
            submissions: Vec::new(),
            scores: None,
        }
    }

    /// Perform any transitions that became due at `now`. Called before
    /// every read and every action; `player_count` decides whether all
    /// submissions are in.
    pub fn refresh(&mut self, now: DateTime<Utc>, player_count: usize) -> bool {
        let before = self.status;
        if self.status == Status::PreStart
            && let Some(start) = self.round_start
            && now >= start
        {
            self.status = Status::Playing;
        }
        if self.status == Status::Playing {
            let timed_out = self.round_end.is_some_and(|end| now >= end);
            let all_in = player_count > 0 && self.submissions.len() >= player_count;
            if timed_out || all_in {
                self.status = Status::Scoring;
            }
        }
        if self.status == Status::Scoring {
            self.run_scoring();
        }
        before != self.status
    }

    fn run_scoring(&mut self) {
        if let Some(board) = &self.board {
            self.scores = Some(score_round(board, &self.submissions, &self.config.dictionary));
        } else {
            self.scores = Some(Vec::new());
        }
        self.status = Status::Scored;
    }

    /// Manager call: roll a fresh board and schedule the next round,
    /// cutting the current one short if it is still running. Refused
    /// while `PreStart` or `Scoring` so in-flight scoring is never
    /// clipped.
    pub fn start_round(
        &mut self,
        countdown: Duration,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Result<DateTime<Utc>, GameError> {
        match self.status {
            Status::Scoring | Status::PreStart => Err(GameError::IllegalAction(
                "round transition already in flight".into(),
            )),
            Status::Initial | Status::Playing | Status::Scored => {
                self.begin(countdown, now, rng);
                Ok(self.round_start.unwrap_or(now))
            }
        }
    }

    fn begin(&mut self, countdown: Duration, now: DateTime<Utc>, rng: &mut impl Rng) {
        let start = now + countdown;
        self.board = Some(Board::roll(
            &self.config.dice,
            self.config.rows,
            self.config.cols,
            rng,
        ));
        self.round += 1;
        self.round_start = Some(start);
        self.round_end = Some(start + Duration::seconds(self.config.round_seconds));
        self.submissions.clear();
        self.scores = None;
        self.status = Status::PreStart;
    }

    /// Player call: hand in the word list for this round, exactly once.
    pub fn submit_words(
        &mut self,
        player: PlayerId,
        words: Vec<String>,
        now: DateTime<Utc>,
        player_count: usize,
    ) -> Result<(), GameError> {
        self.refresh(now, player_count);
        if self.status != Status::Playing {
            return Err(GameError::IllegalAction("no round in progress".into()));
        }
        if self.submissions.iter().any(|(id, _)| *id == player) {
            return Err(GameError::AlreadySubmitted);
        }
        self.submissions.push((player, words));
        // An early submission only ends the round once everyone is in.
        self.refresh(now, player_count);
        Ok(())
    }

    /// Manager call: promote a dictionary-invalid word to valid for every
    /// player who submitted it, and re-derive the longest-word flags.
    pub fn approve_word(&mut self, word: &str) -> Result<(), GameError> {
        if self.status != Status::Scored {
            return Err(GameError::IllegalAction("round not scored yet".into()));
        }
        let word = word.to_uppercase();
        let Some(scores) = &mut self.scores else {
            return Err(GameError::IllegalAction("round not scored yet".into()));
        };
        let mut found = false;
        for player in scores.iter_mut() {
            for scored in player.words.iter_mut() {
                if scored.word == word {
                    scored.dictionary_valid = true;
                    found = true;
                }
            }
        }
        if !found {
            return Err(GameError::IllegalAction("word was not submitted".into()));
        }
        for player in scores.iter_mut() {
            scoring::flag_longest(&mut player.words);
        }
        Ok(())
    }

    /// The viewer's own submission, if any.
    #[must_use]
    pub fn submission_of(&self, player: PlayerId) -> Option<&[String]> {
        self.submissions
            .iter()
            .find(|(id, _)| *id == player)
            .map(|(_, words)| words.as_slice())
    }

    #[must_use]
    pub fn has_submitted(&self, player: PlayerId) -> bool {
        self.submission_of(player).is_some()
    }

    /// Players who have handed in a list this round, in submission order.
    #[must_use]
    pub fn submitted_players(&self) -> Vec<PlayerId> {
        self.submissions.iter().map(|(id, _)| *id).collect()
    }
}
