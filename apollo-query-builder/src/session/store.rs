use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::SessionId;
use crate::error::QueryBuilderError;
use crate::structure::SessionState;

/// Persistence for session state.
///
/// `save` is optimistic: it succeeds only when the stored revision equals `state.revision`
/// (or nothing is stored and the revision is 0), and returns the new revision. Saving a loaded
/// state whose session is gone fails with `SessionNotFound`.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionState>, QueryBuilderError>;

    async fn save(&self, id: &SessionId, state: &SessionState) -> Result<u64, QueryBuilderError>;

    /// Returns whether a session was removed.
    async fn delete(&self, id: &SessionId) -> Result<bool, QueryBuilderError>;
}

struct StoredSession {
    revision: u64,
    expires_at: Instant,
    payload: Vec<u8>,
}

/// LRU-bounded in-memory store. Sessions expire `ttl` after their last save.
pub struct InMemorySessionStore {
    sessions: Mutex<LruCache<SessionId, StoredSession>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionState>, QueryBuilderError> {
        let mut sessions = self.sessions.lock();
        let Some(stored) = sessions.get(id) else {
            return Ok(None);
        };
        if stored.expires_at <= Instant::now() {
            sessions.pop(id);
            tracing::debug!(session.id = %id, "session expired");
            return Ok(None);
        }
        let mut state: SessionState = serde_json::from_slice(&stored.payload)
            .map_err(|error| QueryBuilderError::Storage(error.to_string()))?;
        state.revision = stored.revision;
        Ok(Some(state))
    }

    async fn save(&self, id: &SessionId, state: &SessionState) -> Result<u64, QueryBuilderError> {
        let payload =
            serde_json::to_vec(state).map_err(|error| QueryBuilderError::Storage(error.to_string()))?;
        let mut sessions = self.sessions.lock();
        let now = Instant::now();
        let stored_revision = sessions
            .peek(id)
            .filter(|stored| stored.expires_at > now)
            .map(|stored| stored.revision);
        let stored_revision = match stored_revision {
            Some(revision) if revision == state.revision => revision,
            None if state.revision == 0 => 0,
            // Expired, evicted or deleted since it was loaded.
            None => {
                return Err(QueryBuilderError::SessionNotFound {
                    session_id: id.to_string(),
                });
            }
            Some(_) => {
                return Err(QueryBuilderError::ConcurrentModification {
                    session_id: id.to_string(),
                });
            }
        };
        let revision = stored_revision + 1;
        sessions.put(
            id.clone(),
            StoredSession {
                revision,
                expires_at: now + self.ttl,
                payload,
            },
        );
        Ok(revision)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, QueryBuilderError> {
        let now = Instant::now();
        Ok(self
            .sessions
            .lock()
            .pop(id)
            .is_some_and(|stored| stored.expires_at > now))
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::structure::OperationType;

    fn store(capacity: usize) -> InMemorySessionStore {
        InMemorySessionStore::new(
            NonZeroUsize::new(capacity).unwrap(),
            Duration::from_secs(60),
        )
    }

    fn state() -> SessionState {
        SessionState::new(IndexMap::new(), OperationType::Query, "Query", None)
    }

    #[tokio::test]
    async fn saves_and_loads() {
        let store = store(10);
        let id = SessionId::generate();
        assert_eq!(store.save(&id, &state()).await.unwrap(), 1);
        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded.revision, 1);
        assert_eq!(loaded.operation_type_name, "Query");
        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert!(store.load(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_revisions_are_rejected() {
        let store = store(10);
        let id = SessionId::generate();
        store.save(&id, &state()).await.unwrap();

        let first = store.load(&id).await.unwrap().unwrap();
        let second = store.load(&id).await.unwrap().unwrap();
        assert_eq!(store.save(&id, &first).await.unwrap(), 2);
        assert!(matches!(
            store.save(&id, &second).await,
            Err(QueryBuilderError::ConcurrentModification { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_expire() {
        let store = store(10);
        let id = SessionId::generate();
        store.save(&id, &state()).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(store.load(&id).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn saving_after_expiry_reports_a_missing_session() {
        let store = store(10);
        let id = SessionId::generate();
        store.save(&id, &state()).await.unwrap();
        let loaded = store.load(&id).await.unwrap().unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        let error = store.save(&id, &loaded).await.unwrap_err();
        assert!(matches!(error, QueryBuilderError::SessionNotFound { .. }), "{error}");
        assert!(store.load(&id).await.unwrap().is_none());

        // A deleted session is missing as well.
        store.save(&id, &state()).await.unwrap();
        let loaded = store.load(&id).await.unwrap().unwrap();
        assert!(store.delete(&id).await.unwrap());
        assert!(matches!(
            store.save(&id, &loaded).await,
            Err(QueryBuilderError::SessionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn least_recently_used_sessions_are_evicted() {
        let store = store(2);
        let ids: Vec<_> = (0..3).map(|_| SessionId::generate()).collect();
        for id in &ids {
            store.save(id, &state()).await.unwrap();
        }
        assert_eq!(store.len(), 2);
        assert!(store.load(&ids[0]).await.unwrap().is_none());
        assert!(store.load(&ids[2]).await.unwrap().is_some());
    }
}
