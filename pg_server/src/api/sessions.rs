//! Session API handlers.
//!
//! Every route after `POST /session` carries its credentials in the URL:
//! `/session/{id}/{salt}/play/{player_id}/{token}` for players and
//! `/session/{id}/{salt}/manage/{token}` for the creator. Segment shapes
//! are checked before anything touches storage, so a malformed URL is a
//! `400` and a well-formed forgery is a `403`.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use parlor_games::{
    InviteCode, MgmtAccess, PlayerAccess, SessionHandles, Snapshot, StartedGame,
    fireworks::{Action, Card},
    session::{GameConfig, PlayerId, SessionId},
    token::{validate_salt, validate_token_shape},
};

use super::{AppState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
    pub salt: String,
    pub invite_token: String,
    pub mgmt_token: String,
    /// The shareable invitation, ready to paste.
    pub invite: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    /// Countdown in seconds before a word round begins. Omitted means the
    /// server default; ignored by the cooperative game.
    pub until_start: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitWordsRequest {
    pub words: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveWordRequest {
    pub word: String,
}

fn invite_from_path(
    session_id: SessionId,
    salt: String,
    token: String,
) -> Result<InviteCode, ApiError> {
    validate_salt(&salt)?;
    validate_token_shape(&token)?;
    Ok(InviteCode {
        session_id,
        salt,
        token,
    })
}

fn player_access(
    session_id: SessionId,
    salt: String,
    player_id: PlayerId,
    token: String,
) -> Result<PlayerAccess, ApiError> {
    validate_salt(&salt)?;
    validate_token_shape(&token)?;
    Ok(PlayerAccess {
        session_id,
        salt,
        player_id,
        token,
    })
}

fn mgmt_access(session_id: SessionId, salt: String, token: String) -> Result<MgmtAccess, ApiError> {
    validate_salt(&salt)?;
    validate_token_shape(&token)?;
    Ok(MgmtAccess {
        session_id,
        salt,
        token,
    })
}

/// `POST /session`: create a session for the requested game.
///
/// The response carries both tokens; only the invitation is meant to be
/// shared. Expired sessions are swept opportunistically here, since
/// creation is the one request with no session to answer for.
pub async fn create_session(
    State(state): State<AppState>,
    Json(config): Json<GameConfig>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    if let Err(e) = state.service.prune_expired().await {
        warn!("session sweep failed: {e}");
    }
    let SessionHandles {
        session_id,
        salt,
        invite_token,
        mgmt_token,
    } = state.service.create_session(config).await?;
    let invite = InviteCode {
        session_id,
        salt: salt.clone(),
        token: invite_token.clone(),
    }
    .to_string();
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            salt,
            invite_token,
            mgmt_token,
            invite,
        }),
    ))
}

/// `GET /session/{id}/{salt}/join/{token}`: liveness probe for the
/// restore flow. Succeeds iff the invitation is genuine and the session
/// is still alive.
pub async fn check_session(
    State(state): State<AppState>,
    Path((session_id, salt, token)): Path<(SessionId, String, String)>,
) -> Result<StatusCode, ApiError> {
    let invite = invite_from_path(session_id, salt, token)?;
    state.service.check_session(&invite).await?;
    Ok(StatusCode::OK)
}

/// `POST /session/{id}/{salt}/join/{token}`: join with a display name.
pub async fn join_session(
    State(state): State<AppState>,
    Path((session_id, salt, token)): Path<(SessionId, String, String)>,
    Json(request): Json<JoinRequest>,
) -> Result<(StatusCode, Json<parlor_games::JoinedPlayer>), ApiError> {
    let invite = invite_from_path(session_id, salt, token)?;
    let joined = state.service.join_session(&invite, &request.name).await?;
    Ok((StatusCode::CREATED, Json(joined)))
}

/// `GET /session/{id}/{salt}/play/{player_id}/{token}`: the poll.
pub async fn poll(
    State(state): State<AppState>,
    Path((session_id, salt, player_id, token)): Path<(SessionId, String, PlayerId, String)>,
) -> Result<Json<Snapshot>, ApiError> {
    let access = player_access(session_id, salt, player_id, token)?;
    Ok(Json(state.service.poll(&access).await?))
}

/// `POST /session/{id}/{salt}/play/{player_id}/{token}`: submit the
/// active player's cooperative-game action.
pub async fn submit_action(
    State(state): State<AppState>,
    Path((session_id, salt, player_id, token)): Path<(SessionId, String, PlayerId, String)>,
    Json(action): Json<Action>,
) -> Result<Json<Snapshot>, ApiError> {
    let access = player_access(session_id, salt, player_id, token)?;
    Ok(Json(state.service.submit_action(&access, action).await?))
}

/// `PUT /session/{id}/{salt}/play/{player_id}/{token}`: hand in this
/// round's word list, exactly once.
pub async fn submit_words(
    State(state): State<AppState>,
    Path((session_id, salt, player_id, token)): Path<(SessionId, String, PlayerId, String)>,
    Json(request): Json<SubmitWordsRequest>,
) -> Result<Json<Snapshot>, ApiError> {
    let access = player_access(session_id, salt, player_id, token)?;
    Ok(Json(state.service.submit_words(&access, request.words).await?))
}

/// `POST /session/{id}/{salt}/play/{player_id}/{token}/advance`: end the
/// recorded turn.
pub async fn advance_turn(
    State(state): State<AppState>,
    Path((session_id, salt, player_id, token)): Path<(SessionId, String, PlayerId, String)>,
) -> Result<Json<Snapshot>, ApiError> {
    let access = player_access(session_id, salt, player_id, token)?;
    Ok(Json(state.service.advance_turn(&access).await?))
}

/// `GET /session/{id}/{salt}/play/{player_id}/{token}/discarded`: the
/// revealed discard pile.
pub async fn discarded(
    State(state): State<AppState>,
    Path((session_id, salt, player_id, token)): Path<(SessionId, String, PlayerId, String)>,
) -> Result<Json<Vec<Card>>, ApiError> {
    let access = player_access(session_id, salt, player_id, token)?;
    Ok(Json(state.service.discarded(&access).await?))
}

/// `GET /session/{id}/{salt}/manage/{token}`: the manager's spectator
/// snapshot (all hands visible).
pub async fn manager_snapshot(
    State(state): State<AppState>,
    Path((session_id, salt, token)): Path<(SessionId, String, String)>,
) -> Result<Json<Snapshot>, ApiError> {
    let access = mgmt_access(session_id, salt, token)?;
    Ok(Json(state.service.manager_snapshot(&access).await?))
}

/// `POST /session/{id}/{salt}/manage/{token}`: start the game, or start
/// the next word round.
pub async fn start_game(
    State(state): State<AppState>,
    Path((session_id, salt, token)): Path<(SessionId, String, String)>,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartedGame>, ApiError> {
    let access = mgmt_access(session_id, salt, token)?;
    let started = state
        .service
        .start_game(&access, request.until_start)
        .await?;
    Ok(Json(started))
}

/// `DELETE /session/{id}/{salt}/manage/{token}`: abandon the session.
pub async fn abandon_session(
    State(state): State<AppState>,
    Path((session_id, salt, token)): Path<(SessionId, String, String)>,
) -> Result<StatusCode, ApiError> {
    let access = mgmt_access(session_id, salt, token)?;
    state.service.abandon_session(&access).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /session/{id}/{salt}/manage/{token}/approve_word`: promote a
/// word the dictionary rejected.
pub async fn approve_word(
    State(state): State<AppState>,
    Path((session_id, salt, token)): Path<(SessionId, String, String)>,
    Json(request): Json<ApproveWordRequest>,
) -> Result<Json<Snapshot>, ApiError> {
    let access = mgmt_access(session_id, salt, token)?;
    Ok(Json(state.service.approve_word(&access, &request.word).await?))
}
