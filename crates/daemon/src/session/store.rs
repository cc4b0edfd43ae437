//! In-memory store of authenticated sessions.
//!
//! A session is created on a successful login and lives until it has been
//! idle for longer than the configured timeout. Expired sessions are dropped
//! lazily on lookup and by a periodic cleanup task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Opaque session identifier carried in the session cookie.
pub type SessionId = String;

/// Errors that can occur during session lookup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// No session with this identifier exists.
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// The session existed but was idle for too long.
    #[error("session expired: {0}")]
    Expired(SessionId),
}

/// Server-side session state.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// Whether the holder passed the credential check.
    pub logged_in: bool,
    /// When the session was created.
    pub created_at: Instant,
    /// Last time the session was used.
    pub last_seen: Instant,
}

impl Session {
    fn new(id: SessionId) -> Self {
        let now = Instant::now();
        Self {
            id,
            logged_in: true,
            created_at: now,
            last_seen: now,
        }
    }

    /// Whether the session has been idle longer than `idle_timeout` at `now`.
    pub fn is_expired(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > idle_timeout
    }
}

/// Trait for session storage operations.
///
/// Implementations must be thread-safe and suitable for concurrent access.
pub trait SessionStore: Send + Sync {
    /// Creates a new logged-in session and returns its identifier.
    fn create(&self) -> SessionId;

    /// Looks up a live session and refreshes its idle timer.
    fn touch(&self, id: &str) -> Result<Session, SessionError>;

    /// Whether `id` names a live, logged-in session.
    fn is_logged_in(&self, id: &str) -> bool {
        self.touch(id).map(|s| s.logged_in).unwrap_or(false)
    }

    /// Drops every expired session. Returns how many were dropped.
    fn purge_expired(&self) -> usize;

    /// Returns the number of stored sessions, expired ones included.
    fn count(&self) -> usize;
}

/// Thread-safe session store implementation using DashMap.
#[derive(Debug)]
pub struct MemorySessionStore {
    /// Map of session ID to session.
    sessions: DashMap<SessionId, Session>,
    /// Idle lifetime of a session.
    idle_timeout: Duration,
}

impl MemorySessionStore {
    /// Creates an empty store whose sessions expire after `idle_timeout`.
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    /// Idle lifetime of a session.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Spawns a task that purges expired sessions every `interval` until
    /// `shutdown` is cancelled.
    pub fn start_cleanup_task(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        let purged = store.purge_expired();
                        if purged > 0 {
                            debug!(purged, remaining = store.count(), "Purged expired sessions");
                        }
                    }
                }
            }
        })
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self) -> SessionId {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.sessions.insert(id.clone(), Session::new(id.clone()));
        id
    }

    fn touch(&self, id: &str) -> Result<Session, SessionError> {
        let now = Instant::now();
        {
            let Some(mut session) = self.sessions.get_mut(id) else {
                return Err(SessionError::NotFound(id.to_string()));
            };
            if !session.is_expired(now, self.idle_timeout) {
                session.last_seen = now;
                return Ok(session.clone());
            }
        }

        // The map guard must be released before removing.
        self.sessions.remove(id);
        Err(SessionError::Expired(id.to_string()))
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        self.sessions.retain(|_, session| {
            let keep = !session.is_expired(now, self.idle_timeout);
            if !keep {
                purged += 1;
            }
            keep
        });
        purged
    }

    fn count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_touch() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let id = store.create();

        assert_eq!(id.len(), 32);
        let session = store.touch(&id).unwrap();
        assert_eq!(session.id, id);
        assert!(session.logged_in);
        assert!(store.is_logged_in(&id));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let a = store.create();
        let b = store.create();
        assert_ne!(a, b);
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_unknown_session() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        assert_eq!(
            store.touch("nope").unwrap_err(),
            SessionError::NotFound("nope".to_string())
        );
        assert!(!store.is_logged_in("nope"));
    }

    #[test]
    fn test_expired_session_removed_on_touch() {
        let store = MemorySessionStore::new(Duration::from_millis(20));
        let id = store.create();

        std::thread::sleep(Duration::from_millis(60));

        assert_eq!(store.touch(&id).unwrap_err(), SessionError::Expired(id.clone()));
        assert_eq!(store.count(), 0);
        assert!(!store.is_logged_in(&id));
    }

    #[test]
    fn test_touch_refreshes_idle_timer() {
        let store = MemorySessionStore::new(Duration::from_millis(150));
        let id = store.create();

        for _ in 0..4 {
            std::thread::sleep(Duration::from_millis(60));
            assert!(store.is_logged_in(&id));
        }
    }

    #[test]
    fn test_purge_expired() {
        let store = MemorySessionStore::new(Duration::from_millis(20));
        store.create();
        store.create();

        std::thread::sleep(Duration::from_millis(60));
        let fresh = store.create();

        assert_eq!(store.purge_expired(), 2);
        assert_eq!(store.count(), 1);
        assert!(store.is_logged_in(&fresh));
    }

    #[test]
    fn test_is_expired_boundary() {
        let session = Session::new("x".to_string());
        let timeout = Duration::from_secs(10);
        assert!(!session.is_expired(session.last_seen + timeout, timeout));
        assert!(session.is_expired(session.last_seen + timeout + Duration::from_millis(1), timeout));
    }

    #[tokio::test]
    async fn test_cleanup_task_purges_and_stops() {
        let store = Arc::new(MemorySessionStore::new(Duration::from_millis(10)));
        store.create();

        let shutdown = CancellationToken::new();
        let handle = store.start_cleanup_task(Duration::from_millis(20), shutdown.clone());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(store.count(), 0);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cleanup task should stop")
            .unwrap();
    }
}
