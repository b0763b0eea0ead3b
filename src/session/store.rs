//! Conversation correlation store.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Snapshot of one tracked conversation.
///
/// Values handed out by [`SessionStore`] are copies; mutating them has no
/// effect on the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Key the asynchronous reply is correlated with.
    pub conversation_id: String,
    /// Platform identifier of the participant the reply goes to.
    pub user_id: String,
    /// Time of the most recent inbound message.
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has been idle longer than `timeout` at `now`.
    ///
    /// A `last_active_at` in the future (clock skew) never counts as idle.
    #[must_use]
    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        let timeout = TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.last_active_at) > timeout
    }
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
}

/// Thread-safe map from conversation id to [`Session`].
///
/// All reads and writes go through a single lock, so `put`, `get` and `sweep`
/// are linearizable with respect to each other. Cloning the store yields
/// another handle to the same map.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    // A panic while holding the lock cannot leave a half-written entry behind
    // (every mutation is a single map operation), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite the session for `conversation_id`, stamping it with
    /// the current time.
    pub fn put(&self, conversation_id: impl Into<String>, user_id: impl Into<String>) -> Session {
        self.put_at(conversation_id, user_id, Utc::now())
    }

    /// Insert or overwrite the session for `conversation_id` as of `at`.
    ///
    /// `last_active_at` never moves backwards: if the existing entry is newer
    /// than `at` (wall clock stepped back), its timestamp is kept while the
    /// user id is still replaced.
    pub fn put_at(
        &self,
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Session {
        let conversation_id = conversation_id.into();
        let mut guard = self.write();

        let last_active_at = guard
            .get(&conversation_id)
            .map_or(at, |existing| existing.last_active_at.max(at));

        let session = Session {
            conversation_id: conversation_id.clone(),
            user_id: user_id.into(),
            last_active_at,
        };
        guard.insert(conversation_id, session.clone());
        session
    }

    /// Look up a session regardless of its age.
    #[must_use]
    pub fn get(&self, conversation_id: &str) -> Option<Session> {
        self.read().get(conversation_id).cloned()
    }

    /// Remove a session explicitly.
    pub fn remove(&self, conversation_id: &str) -> Option<Session> {
        self.write().remove(conversation_id)
    }

    /// Evict every session idle for longer than `timeout` as of `now`.
    ///
    /// Returns the evicted conversation ids.
    pub fn sweep(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<String> {
        let mut evicted = Vec::new();
        let mut guard = self.write();
        guard.retain(|id, session| {
            if session.is_idle(now, timeout) {
                evicted.push(id.clone());
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Number of tracked sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(300);

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_put_and_get() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        store.put_at("C1", "U1", t(0));
        let session = store.get("C1").unwrap();
        assert_eq!(session.user_id, "U1");
        assert_eq!(session.last_active_at, t(0));
        assert_eq!(store.len(), 1);

        assert!(store.get("C2").is_none());
    }

    #[test]
    fn test_get_returns_copy() {
        let store = SessionStore::new();
        store.put_at("C1", "U1", t(0));

        let mut snapshot = store.get("C1").unwrap();
        snapshot.user_id = "someone-else".to_string();

        assert_eq!(store.get("C1").unwrap().user_id, "U1");
    }

    #[test]
    fn test_sweep_boundary() {
        let store = SessionStore::new();
        store.put_at("C1", "U1", t(0));

        // Exactly at the deadline the session is still alive.
        assert!(store.sweep(t(300), TIMEOUT).is_empty());
        assert!(store.get("C1").is_some());

        assert_eq!(store.sweep(t(301), TIMEOUT), vec!["C1".to_string()]);
        assert!(store.get("C1").is_none());
    }

    #[test]
    fn test_refresh_prevents_eviction() {
        let store = SessionStore::new();
        store.put_at("C1", "U1", t(0));
        store.put_at("C1", "U1", t(200));

        assert!(store.sweep(t(301), TIMEOUT).is_empty());
        assert_eq!(store.get("C1").unwrap().last_active_at, t(200));

        assert_eq!(store.sweep(t(501), TIMEOUT).len(), 1);
    }

    #[test]
    fn test_get_does_not_extend_lifetime() {
        let store = SessionStore::new();
        store.put_at("C1", "U1", t(0));

        assert!(store.get("C1").is_some());
        assert_eq!(store.get("C1").unwrap().last_active_at, t(0));

        assert_eq!(store.sweep(t(301), TIMEOUT).len(), 1);
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let store = SessionStore::new();
        store.put_at("old", "U1", t(0));
        store.put_at("fresh", "U2", t(250));

        let first = store.sweep(t(400), TIMEOUT);
        assert_eq!(first, vec!["old".to_string()]);

        let second = store.sweep(t(400), TIMEOUT);
        assert!(second.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_last_active_never_moves_backwards() {
        let store = SessionStore::new();
        store.put_at("C1", "U1", t(100));
        let session = store.put_at("C1", "U2", t(50));

        assert_eq!(session.user_id, "U2");
        assert_eq!(session.last_active_at, t(100));
    }

    #[test]
    fn test_future_timestamp_is_not_idle() {
        let store = SessionStore::new();
        store.put_at("C1", "U1", t(1000));
        assert!(store.sweep(t(0), TIMEOUT).is_empty());
    }

    #[test]
    fn test_remove() {
        let store = SessionStore::new();
        store.put("C1", "U1");
        assert_eq!(store.remove("C1").unwrap().user_id, "U1");
        assert!(store.remove("C1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_writes_last_write_wins() {
        let store = SessionStore::new();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = store.clone();
                scope.spawn(move || {
                    for i in 0..500 {
                        store.put("C1", format!("U{worker}-{i}"));
                    }
                });
            }
        });

        let session = store.get("C1").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(session.conversation_id, "C1");
        assert!(session.user_id.ends_with("-499"));

        // A write after all others have completed is what a later read sees.
        store.put("C1", "U-final");
        assert_eq!(store.get("C1").unwrap().user_id, "U-final");
    }
}
