//! Session records: the unit of persistence and the registry rules.
//!
//! A session owns its players and exactly one game. All of it is one
//! serialized record in the store; engines mutate it inside a single
//! atomic read-modify-write (see [`crate::store`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{MAX_NAME_LENGTH, MAX_PLAYERS};
use crate::fireworks::FireworksGame;
use crate::words::{WordsConfig, WordsGame};

pub use crate::token::{PlayerId, SessionId};

#[derive(Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum SessionError {
    #[error("bad session token")]
    InvalidToken,
    #[error("session has ended")]
    SessionExpired,
    #[error("name already taken")]
    NameConflict,
    #[error("this session is not accepting players")]
    NotJoinable,
    #[error("session is full")]
    SessionFull,
    #[error("no such player in this session")]
    UnknownPlayer,
    #[error("missing or empty name")]
    NameRequired,
}

/// A joined participant. `position` is the join order and, for the
/// cooperative game, the turn order.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: usize,
}

/// Which game this session runs, chosen at creation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum Game {
    Fireworks(FireworksGame),
    Words(WordsGame),
}

/// Game-specific creation payload (the POST /session body).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameConfig {
    Fireworks,
    Words(WordsConfig),
}

/// The full authoritative state of one session.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SessionState {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    /// Namespacing secret embedded in every URL for this session.
    pub salt: String,
    /// Pruning deadline; refreshed on every successful operation.
    pub expires_at: DateTime<Utc>,
    pub players: Vec<Player>,
    pub game: Game,
}

impl SessionState {
    #[must_use]
    pub fn new(salt: String, game: Game, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            id: 0,
            created_at: now,
            salt,
            expires_at: now + ttl,
            players: Vec::new(),
            game,
        }
    }

    /// Append a player, enforcing unique display names. The cooperative
    /// game stops accepting players once it has started and seats at
    /// most [`MAX_PLAYERS`]; the deck cannot deal a full hand beyond
    /// that.
    pub fn join(&mut self, name: &str) -> Result<&Player, SessionError> {
        let mut name = name.trim().to_string();
        name.truncate(MAX_NAME_LENGTH);
        if name.is_empty() {
            return Err(SessionError::NameRequired);
        }
        if self.players.iter().any(|p| p.name == name) {
            return Err(SessionError::NameConflict);
        }
        if let Game::Fireworks(game) = &self.game {
            if game.status != crate::fireworks::Status::Initial {
                return Err(SessionError::NotJoinable);
            }
            if self.players.len() >= MAX_PLAYERS {
                return Err(SessionError::SessionFull);
            }
        }
        let position = self.players.len();
        let id = self.players.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        self.players.push(Player {
            id,
            name,
            position,
        });
        Ok(&self.players[position])
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, SessionError> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or(SessionError::UnknownPlayer)
    }

    /// Player ids in turn order.
    #[must_use]
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
