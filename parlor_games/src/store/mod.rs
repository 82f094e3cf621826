//! Session persistence with optimistic concurrency.
//!
//! The serving layer is a pool of stateless workers, so no authoritative
//! state lives in process memory between requests. Every operation reads
//! a versioned record, mutates it, and writes it back conditioned on the
//! version it read; a concurrent writer surfaces as [`StoreError::
//! Conflict`], which clients re-poll and retry.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::session::{SessionId, SessionState};

pub use memory::MemoryStore;
pub use postgres::PgSessionStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session has ended")]
    NotFound,
    #[error("state changed concurrently; re-poll and retry")]
    Conflict,
    /// Persisted state failed to decode or violated an engine invariant.
    /// Never repaired silently; the session is unusable.
    #[error("corrupt session state: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A loaded record together with the version stamp to pass back to
/// [`SessionStore::save`].
#[derive(Clone, Debug)]
pub struct VersionedState {
    pub version: i64,
    pub state: SessionState,
}

/// Atomic read-then-write storage keyed by session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session, assigning its id. Returns the assigned id
    /// and the initial version.
    async fn create(&self, state: SessionState) -> Result<VersionedState, StoreError>;

    async fn load(&self, id: SessionId) -> Result<Option<VersionedState>, StoreError>;

    /// Compare-and-swap write: succeeds only if the stored version still
    /// equals `expected_version`; returns the new version.
    async fn save(
        &self,
        id: SessionId,
        expected_version: i64,
        state: &SessionState,
    ) -> Result<i64, StoreError>;

    /// Cheap liveness check for the restore flow.
    async fn exists(&self, id: SessionId) -> Result<bool, StoreError>;

    async fn delete(&self, id: SessionId) -> Result<(), StoreError>;

    /// Remove every session whose pruning deadline has passed. Returns
    /// the number pruned. Invoked lazily; there are no timers.
    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
