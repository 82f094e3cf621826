//! Error taxonomy shared by both engines and the service layer.
//!
//! Every expected rule violation is an enumerable value returned from the
//! engine, never a panic: clients render these verbatim.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionError;
use crate::store::StoreError;
use crate::token::TokenError;

/// Rule violations raised by the game engines.
#[derive(Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("not your turn")]
    NotYourTurn,
    #[error("{0}")]
    IllegalAction(String),
    #[error("no card at that position")]
    InvalidPosition,
    #[error("previous turn not finished yet")]
    TooEarly,
    #[error("word list already submitted this round")]
    AlreadySubmitted,
    #[error("need 2+ players")]
    NotEnoughPlayers,
    #[error("game is over")]
    GameOver,
    #[error("action does not apply to this game")]
    WrongGame,
}

/// Umbrella error for every service operation; the HTTP layer maps these
/// to status codes.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// True for the optimistic-concurrency collision that clients are
    /// expected to retry transparently after a re-poll.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(StoreError::Conflict))
    }
}
