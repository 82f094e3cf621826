//! `GameService`: the atomic unit of work behind every endpoint.
//!
//! Each operation follows the same shape: validate token shape, load the
//! session fresh from the store, re-verify credentials against that
//! state, perform any lazily due clock transitions, run the engine, and
//! write back conditioned on the version that was read. A lost race
//! surfaces as `Conflict`; the client re-polls and retries. Nothing is
//! ever trusted from a client's cached view.

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{GameError, ServiceError};
use crate::fireworks::{Action, Card};
use crate::session::{Game, GameConfig, PlayerId, SessionError, SessionId, SessionState};
use crate::store::{SessionStore, StoreError, VersionedState};
use crate::token::{
    InviteCode, SERVER_KEY_LEN, derive_invite_token, derive_mgmt_token, derive_player_token,
    generate_salt, verify_token,
};
use crate::view::{Snapshot, project};

/// Everything a session creator needs: the player-facing invitation and
/// the creator-only management token.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SessionHandles {
    pub session_id: SessionId,
    pub salt: String,
    pub invite_token: String,
    pub mgmt_token: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct JoinedPlayer {
    pub player_id: PlayerId,
    pub player_token: String,
    pub name: String,
    /// Composite credential the client caches to survive page reloads.
    /// The management segment is appended client-side by the creator.
    pub restore_token: String,
}

/// Credentials presented on every play-path request.
#[derive(Clone, Debug)]
pub struct PlayerAccess {
    pub session_id: SessionId,
    pub salt: String,
    pub player_id: PlayerId,
    pub token: String,
}

/// Credentials presented on every management request.
#[derive(Clone, Debug)]
pub struct MgmtAccess {
    pub session_id: SessionId,
    pub salt: String,
    pub token: String,
}

/// Response to a management start/advance call.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StartedGame {
    /// Set for word-game rounds: when play actually begins.
    pub round_start: Option<DateTime<Utc>>,
}

pub struct GameService {
    store: Arc<dyn SessionStore>,
    server_key: [u8; SERVER_KEY_LEN],
    ttl: Duration,
    default_countdown: Duration,
}

impl GameService {
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        server_key: [u8; SERVER_KEY_LEN],
        ttl: Duration,
        default_countdown: Duration,
    ) -> Self {
        Self {
            store,
            server_key,
            ttl,
            default_countdown,
        }
    }

    /// Spawn a fresh session. Fails only on storage failure.
    pub async fn create_session(
        &self,
        config: GameConfig,
    ) -> Result<SessionHandles, ServiceError> {
        let game = match config {
            GameConfig::Fireworks => Game::Fireworks(crate::fireworks::FireworksGame::new()),
            GameConfig::Words(config) => {
                Game::Words(crate::words::WordsGame::new(config.normalize()?))
            }
        };
        let salt = {
            let mut rng = rand::rng();
            generate_salt(&mut rng)
        };
        let state = SessionState::new(salt.clone(), game, Utc::now(), self.ttl);
        let created = self.store.create(state).await?;
        let session_id = created.state.id;
        info!("session {session_id} created");
        Ok(SessionHandles {
            session_id,
            salt: salt.clone(),
            invite_token: derive_invite_token(&self.server_key, session_id, &salt),
            mgmt_token: derive_mgmt_token(&self.server_key, session_id, &salt),
        })
    }

    /// Liveness probe for the restore flow: token must check out and the
    /// session must still be present and unexpired.
    pub async fn check_session(&self, invite: &InviteCode) -> Result<(), ServiceError> {
        self.verify_invite(invite)?;
        let loaded = self.load_live(invite.session_id).await?;
        if loaded.state.salt != invite.salt {
            return Err(SessionError::InvalidToken.into());
        }
        Ok(())
    }

    /// Join via invitation. Join order defines turn order.
    pub async fn join_session(
        &self,
        invite: &InviteCode,
        name: &str,
    ) -> Result<JoinedPlayer, ServiceError> {
        self.verify_invite(invite)?;
        let mut loaded = self.load_live(invite.session_id).await?;
        if loaded.state.salt != invite.salt {
            return Err(SessionError::InvalidToken.into());
        }
        let joined = loaded.state.join(name)?.clone();
        self.persist(&mut loaded).await?;

        let player_token = derive_player_token(
            &self.server_key,
            invite.session_id,
            joined.id,
            &invite.salt,
        );
        let restore = crate::token::RestoreCode {
            session_id: invite.session_id,
            player_id: joined.id,
            salt: invite.salt.clone(),
            player_token: player_token.clone(),
            invite_token: invite.token.clone(),
            mgmt_token: None,
        };
        info!(
            "player {} joined session {} as {:?}",
            joined.id, invite.session_id, joined.name
        );
        Ok(JoinedPlayer {
            player_id: joined.id,
            player_token,
            name: joined.name,
            restore_token: restore.to_string(),
        })
    }

    /// Poll: answer from freshly loaded state, applying any clock
    /// transitions that became due.
    pub async fn poll(&self, access: &PlayerAccess) -> Result<Snapshot, ServiceError> {
        let mut loaded = self.authorize_player(access).await?;
        if self.refresh_clock(&mut loaded.state) {
            // Persist the lazy transition; losing this race is fine, the
            // winner wrote the same transition.
            match self.persist(&mut loaded).await {
                Ok(()) => {}
                Err(ServiceError::Store(StoreError::Conflict)) => {
                    loaded = self.authorize_player(access).await?;
                    self.refresh_clock(&mut loaded.state);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(project(&loaded.state, Some(access.player_id), loaded.version))
    }

    /// Submit a cooperative-game action for the active player.
    pub async fn submit_action(
        &self,
        access: &PlayerAccess,
        action: Action,
    ) -> Result<Snapshot, ServiceError> {
        let mut loaded = self.authorize_player(access).await?;
        let position = loaded.state.player(access.player_id)?.position;
        let ids = loaded.state.player_ids();
        let Game::Fireworks(game) = &mut loaded.state.game else {
            return Err(GameError::WrongGame.into());
        };
        game.submit_action(position, &ids, action)?;
        self.persist(&mut loaded).await?;
        Ok(project(&loaded.state, Some(access.player_id), loaded.version))
    }

    /// End the recorded turn. `TooEarly` until the action has been
    /// durably recorded.
    pub async fn advance_turn(&self, access: &PlayerAccess) -> Result<Snapshot, ServiceError> {
        let mut loaded = self.authorize_player(access).await?;
        let position = loaded.state.player(access.player_id)?.position;
        let Game::Fireworks(game) = &mut loaded.state.game else {
            return Err(GameError::WrongGame.into());
        };
        game.advance(position)?;
        self.persist(&mut loaded).await?;
        Ok(project(&loaded.state, Some(access.player_id), loaded.version))
    }

    /// The revealed discard pile (cooperative game only).
    pub async fn discarded(&self, access: &PlayerAccess) -> Result<Vec<Card>, ServiceError> {
        let loaded = self.authorize_player(access).await?;
        let Game::Fireworks(game) = &loaded.state.game else {
            return Err(GameError::WrongGame.into());
        };
        Ok(game.discard.clone())
    }

    /// Submit a word list for the current round, exactly once.
    pub async fn submit_words(
        &self,
        access: &PlayerAccess,
        words: Vec<String>,
    ) -> Result<Snapshot, ServiceError> {
        let mut loaded = self.authorize_player(access).await?;
        let player_count = loaded.state.players.len();
        let Game::Words(game) = &mut loaded.state.game else {
            return Err(GameError::WrongGame.into());
        };
        game.submit_words(access.player_id, words, Utc::now(), player_count)?;
        self.persist(&mut loaded).await?;
        Ok(project(&loaded.state, Some(access.player_id), loaded.version))
    }

    /// Manager's spectator snapshot.
    pub async fn manager_snapshot(&self, access: &MgmtAccess) -> Result<Snapshot, ServiceError> {
        let mut loaded = self.authorize_manager(access).await?;
        if self.refresh_clock(&mut loaded.state) {
            match self.persist(&mut loaded).await {
                Ok(()) | Err(ServiceError::Store(StoreError::Conflict)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(project(&loaded.state, None, loaded.version))
    }

    /// Manager call: start the cooperative game, or start/advance a word
    /// round with the given countdown.
    pub async fn start_game(
        &self,
        access: &MgmtAccess,
        until_start: Option<i64>,
    ) -> Result<StartedGame, ServiceError> {
        let mut loaded = self.authorize_manager(access).await?;
        let ids = loaded.state.player_ids();
        if ids.is_empty() {
            return Err(GameError::NotEnoughPlayers.into());
        }
        let countdown = until_start
            .map_or(self.default_countdown, Duration::seconds)
            .max(Duration::zero());

        let round_start = {
            let mut rng = rand::rng();
            match &mut loaded.state.game {
                Game::Fireworks(game) => {
                    game.start(&ids, &mut rng)?;
                    None
                }
                Game::Words(game) => {
                    Some(game.start_round(countdown, Utc::now(), &mut rng)?)
                }
            }
        };
        self.persist(&mut loaded).await?;
        info!("session {} game started", access.session_id);
        Ok(StartedGame { round_start })
    }

    /// Manager call: abandon the session entirely.
    pub async fn abandon_session(&self, access: &MgmtAccess) -> Result<(), ServiceError> {
        self.authorize_manager(access).await?;
        self.store.delete(access.session_id).await?;
        info!("session {} abandoned", access.session_id);
        Ok(())
    }

    /// Manager call: promote a dictionary-invalid word.
    pub async fn approve_word(
        &self,
        access: &MgmtAccess,
        word: &str,
    ) -> Result<Snapshot, ServiceError> {
        let mut loaded = self.authorize_manager(access).await?;
        self.refresh_clock(&mut loaded.state);
        let Game::Words(game) = &mut loaded.state.game else {
            return Err(GameError::WrongGame.into());
        };
        game.approve_word(word)?;
        self.persist(&mut loaded).await?;
        Ok(project(&loaded.state, None, loaded.version))
    }

    /// Sweep expired sessions. Called opportunistically by the serving
    /// layer, never from a timer.
    pub async fn prune_expired(&self) -> Result<u64, ServiceError> {
        let pruned = self.store.prune_expired(Utc::now()).await?;
        if pruned > 0 {
            info!("pruned {pruned} expired sessions");
        }
        Ok(pruned)
    }

    fn verify_invite(&self, invite: &InviteCode) -> Result<(), ServiceError> {
        let expected = derive_invite_token(&self.server_key, invite.session_id, &invite.salt);
        verify_token(&invite.token, &expected).map_err(|_| SessionError::InvalidToken)?;
        Ok(())
    }

    async fn authorize_player(
        &self,
        access: &PlayerAccess,
    ) -> Result<VersionedState, ServiceError> {
        let expected = derive_player_token(
            &self.server_key,
            access.session_id,
            access.player_id,
            &access.salt,
        );
        verify_token(&access.token, &expected).map_err(|_| SessionError::InvalidToken)?;
        let loaded = self.load_live(access.session_id).await?;
        if loaded.state.salt != access.salt {
            return Err(SessionError::InvalidToken.into());
        }
        loaded.state.player(access.player_id)?;
        Ok(loaded)
    }

    async fn authorize_manager(
        &self,
        access: &MgmtAccess,
    ) -> Result<VersionedState, ServiceError> {
        let expected = derive_mgmt_token(&self.server_key, access.session_id, &access.salt);
        verify_token(&access.token, &expected).map_err(|_| SessionError::InvalidToken)?;
        let loaded = self.load_live(access.session_id).await?;
        if loaded.state.salt != access.salt {
            return Err(SessionError::InvalidToken.into());
        }
        Ok(loaded)
    }

    async fn load_live(&self, id: SessionId) -> Result<VersionedState, ServiceError> {
        let Some(loaded) = self.store.load(id).await? else {
            return Err(SessionError::SessionExpired.into());
        };
        if loaded.state.is_expired(Utc::now()) {
            warn!("session {id} hit its pruning deadline");
            self.store.delete(id).await?;
            return Err(SessionError::SessionExpired.into());
        }
        Ok(loaded)
    }

    /// Apply any lazily due word-round transitions. Returns true when the
    /// state changed and should be written back.
    fn refresh_clock(&self, state: &mut SessionState) -> bool {
        let player_count = state.players.len();
        match &mut state.game {
            Game::Words(game) => game.refresh(Utc::now(), player_count),
            Game::Fireworks(_) => false,
        }
    }

    /// Write back under the version that was read, refreshing the pruning
    /// deadline as activity.
    async fn persist(&self, loaded: &mut VersionedState) -> Result<(), ServiceError> {
        loaded.state.expires_at = Utc::now() + self.ttl;
        loaded.version = self
            .store
            .save(loaded.state.id, loaded.version, &loaded.state)
            .await?;
        Ok(())
    }
}
