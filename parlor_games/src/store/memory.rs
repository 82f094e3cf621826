//! In-memory store for tests and single-process development runs.
//!
//! Semantics mirror the Postgres store exactly, including the version
//! check, so the service layer cannot tell them apart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{SessionStore, StoreError, VersionedState};
use crate::session::{SessionId, SessionState};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: SessionId,
    sessions: HashMap<SessionId, (i64, SessionState)>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, mut state: SessionState) -> Result<VersionedState, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        state.id = inner.next_id;
        inner.sessions.insert(state.id, (1, state.clone()));
        Ok(VersionedState { version: 1, state })
    }

    async fn load(&self, id: SessionId) -> Result<Option<VersionedState>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .sessions
            .get(&id)
            .map(|(version, state)| VersionedState {
                version: *version,
                state: state.clone(),
            }))
    }

    async fn save(
        &self,
        id: SessionId,
        expected_version: i64,
        state: &SessionState,
    ) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        let (version, stored) = inner.sessions.get_mut(&id).ok_or(StoreError::NotFound)?;
        if *version != expected_version {
            return Err(StoreError::Conflict);
        }
        *version += 1;
        *stored = state.clone();
        Ok(*version)
    }

    async fn exists(&self, id: SessionId) -> Result<bool, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.sessions.contains_key(&id))
    }

    async fn delete(&self, id: SessionId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.sessions.remove(&id);
        Ok(())
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, (_, state)| !state.is_expired(now));
        Ok((before - inner.sessions.len()) as u64)
    }
}
