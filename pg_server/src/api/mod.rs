//! HTTP API for the party game server.
//!
//! A thin layer over [`parlor_games::GameService`]: handlers translate
//! URL credentials and JSON bodies into service calls and map errors to
//! status codes. All state lives in the store, so any number of these
//! routers can serve the same sessions.
//!
//! # Endpoints
//!
//! ```text
//! GET    /health                                               - Health check
//! POST   /session                                              - Create session
//! GET    /session/{id}/{salt}/join/{token}                     - Session liveness probe
//! POST   /session/{id}/{salt}/join/{token}                     - Join with a name
//! GET    /session/{id}/{salt}/play/{player_id}/{token}         - Poll snapshot
//! POST   /session/{id}/{salt}/play/{player_id}/{token}         - Submit card action
//! PUT    /session/{id}/{salt}/play/{player_id}/{token}         - Submit word list
//! POST   /session/{id}/{salt}/play/{player_id}/{token}/advance - End recorded turn
//! GET    /session/{id}/{salt}/play/{player_id}/{token}/discarded - Discard pile
//! GET    /session/{id}/{salt}/manage/{token}                   - Manager snapshot
//! POST   /session/{id}/{salt}/manage/{token}                   - Start game / next round
//! DELETE /session/{id}/{salt}/manage/{token}                   - Abandon session
//! PATCH  /session/{id}/{salt}/manage/{token}/approve_word      - Approve a word
//! ```

pub mod error;
pub mod sessions;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
};
use parlor_games::{GameService, PgSessionStore};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GameService>,
    /// Present when backed by PostgreSQL; the health check probes it.
    pub db: Option<PgSessionStore>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// CORS is permissive: the clients are static pages served from
/// anywhere, and every credential already travels in the URL.
pub fn create_router(state: AppState) -> Router {
    let play_routes = Router::new()
        .route(
            "/session/{session_id}/{salt}/play/{player_id}/{token}",
            get(sessions::poll)
                .post(sessions::submit_action)
                .put(sessions::submit_words),
        )
        .route(
            "/session/{session_id}/{salt}/play/{player_id}/{token}/advance",
            post(sessions::advance_turn),
        )
        .route(
            "/session/{session_id}/{salt}/play/{player_id}/{token}/discarded",
            get(sessions::discarded),
        );

    let manage_routes = Router::new()
        .route(
            "/session/{session_id}/{salt}/manage/{token}",
            get(sessions::manager_snapshot)
                .post(sessions::start_game)
                .delete(sessions::abandon_session),
        )
        .route(
            "/session/{session_id}/{salt}/manage/{token}/approve_word",
            patch(sessions::approve_word),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/session", post(sessions::create_session))
        .route(
            "/session/{session_id}/{salt}/join/{token}",
            get(sessions::check_session).post(sessions::join_session),
        )
        .merge(play_routes)
        .merge(manage_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Probes the database when one is configured. Returns `200 OK` when
/// healthy, `503 Service Unavailable` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.db {
        Some(db) => db.health_check().await.is_ok(),
        None => true,
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
