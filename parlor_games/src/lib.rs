//! # Parlor Games
//!
//! An authoritative game-state engine for small-group party games played
//! through thin polling browser clients: a cooperative fireworks card
//! game and a timed word-finding board game.
//!
//! The server owns every rule; clients are untrusted renderers that may
//! not even see their own secret information (a player never sees their
//! own hand). There is no push channel and no background timer: clients
//! poll, and any clock-driven transition is evaluated lazily on the next
//! read or write.
//!
//! ## Core modules
//!
//! - [`token`]: opaque salted credentials (invitation, management,
//!   player, restore) with fixed-format grammars.
//! - [`session`]: session/player records and the registry rules.
//! - [`fireworks`]: the cooperative card game's turn state machine.
//! - [`words`]: the word game's clock-driven round state machine and its
//!   grid-path scoring engine.
//! - [`view`]: the snapshot projector enforcing information hiding.
//! - [`store`]: versioned session persistence with optimistic
//!   concurrency (`Conflict` on a lost race).
//! - [`service`]: the atomic read-validate-mutate-persist unit of work
//!   behind every HTTP endpoint.
//!
//! ## Example
//!
//! ```
//! use parlor_games::{GameService, MemoryStore, session::GameConfig};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), parlor_games::ServiceError> {
//! let service = GameService::new(
//!     Arc::new(MemoryStore::new()),
//!     [0; 32],
//!     chrono::Duration::hours(2),
//!     chrono::Duration::seconds(15),
//! );
//! let handles = service.create_session(GameConfig::Fireworks).await?;
//! assert_eq!(handles.invite_token.len(), 20);
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod fireworks;
pub mod session;
pub mod store;
pub mod token;
pub mod view;
pub mod words;

mod service;

pub use error::{GameError, ServiceError};
pub use service::{GameService, JoinedPlayer, MgmtAccess, PlayerAccess, SessionHandles, StartedGame};
pub use session::{Game, GameConfig, Player, SessionState};
pub use store::{MemoryStore, PgSessionStore, SessionStore, StoreError};
pub use token::{InviteCode, RestoreCode, TokenError};
pub use view::{GameView, Snapshot};
