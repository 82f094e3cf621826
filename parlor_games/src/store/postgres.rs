//! PostgreSQL session store.
//!
//! One row per session: the serialized state plus a version column. The
//! compare-and-swap lives in the UPDATE's WHERE clause, so two workers
//! racing on the same session serialize without any in-process locking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use std::time::Duration;

use super::{SessionStore, StoreError, VersionedState};
use crate::session::{SessionId, SessionState};

/// Connection settings, read from the environment by the server binary.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the sessions table if it doesn't exist yet.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS sessions (
                id BIGSERIAL PRIMARY KEY,
                version BIGINT NOT NULL DEFAULT 1,
                expires_at TIMESTAMPTZ NOT NULL,
                state TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn encode(state: &SessionState) -> Result<String, StoreError> {
        serde_json::to_string(state).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    fn decode(raw: &str) -> Result<SessionState, StoreError> {
        serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, mut state: SessionState) -> Result<VersionedState, StoreError> {
        // Two inserts: the id is part of the serialized state, so it has
        // to be known before the state column is final.
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "INSERT INTO sessions (version, expires_at, state) VALUES (1, $1, '') RETURNING id",
        )
        .bind(state.expires_at)
        .fetch_one(&mut *tx)
        .await?;
        state.id = row.get("id");

        sqlx::query("UPDATE sessions SET state = $1 WHERE id = $2")
            .bind(Self::encode(&state)?)
            .bind(state.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(VersionedState { version: 1, state })
    }

    async fn load(&self, id: SessionId) -> Result<Option<VersionedState>, StoreError> {
        let row = sqlx::query("SELECT version, state FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(VersionedState {
                version: row.get("version"),
                state: Self::decode(row.get("state"))?,
            })),
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        id: SessionId,
        expected_version: i64,
        state: &SessionState,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE sessions
            SET version = version + 1, state = $1, expires_at = $2
            WHERE id = $3 AND version = $4
            ",
        )
        .bind(Self::encode(state)?)
        .bind(state.expires_at)
        .bind(id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(expected_version + 1);
        }
        // Distinguish a vanished session from a lost race.
        if self.exists(id).await? {
            Err(StoreError::Conflict)
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn exists(&self, id: SessionId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 AS one FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn delete(&self, id: SessionId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
