//! Mapping from service errors to HTTP responses.
//!
//! Every failure becomes a JSON body of the form `{"error": "..."}` with
//! a status code that tells thin clients how to react: 403 means the
//! credential is bad, 410 means the session is gone and local state
//! should be dropped, 425 means "you advanced before acting", and 409
//! means "re-poll and look again".

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parlor_games::{GameError, ServiceError, StoreError, TokenError, session::SessionError};
use serde_json::json;

pub struct ApiError(pub ServiceError);

impl<E> From<E> for ApiError
where
    E: Into<ServiceError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Token(TokenError::Malformed) => StatusCode::BAD_REQUEST,
        ServiceError::Token(TokenError::Forged) => StatusCode::FORBIDDEN,
        ServiceError::Session(err) => match err {
            SessionError::InvalidToken | SessionError::UnknownPlayer => StatusCode::FORBIDDEN,
            SessionError::SessionExpired => StatusCode::GONE,
            SessionError::NameConflict
            | SessionError::NotJoinable
            | SessionError::SessionFull => StatusCode::CONFLICT,
            SessionError::NameRequired => StatusCode::BAD_REQUEST,
        },
        ServiceError::Game(err) => match err {
            GameError::InvalidPosition | GameError::WrongGame => StatusCode::BAD_REQUEST,
            GameError::TooEarly => StatusCode::TOO_EARLY,
            GameError::NotYourTurn
            | GameError::IllegalAction(_)
            | GameError::AlreadySubmitted
            | GameError::NotEnoughPlayers
            | GameError::GameOver => StatusCode::CONFLICT,
        },
        ServiceError::Store(err) => match err {
            StoreError::NotFound => StatusCode::GONE,
            StoreError::Conflict => StatusCode::CONFLICT,
            StoreError::Corrupt(_) | StoreError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        // Storage internals never reach a client verbatim.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {}", self.0);
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
