//! Operator login sessions
//!
//! Tokens are opaque UUIDs mapped to an expiry instant. Expired entries are
//! removed lazily when validated and periodically by [`SessionStore::spawn_sweeper`].
//! The store is an ordinary value handed to whoever needs it; the relay and
//! the reconcile path never look at it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;

/// Default session lifetime in seconds (200 hours)
pub const DEFAULT_SESSION_TTL_SECS: u64 = 720_000;

/// An issued login session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token table with expiry
#[derive(Debug)]
pub struct SessionStore {
    ttl: chrono::Duration,
    sessions: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_SESSION_TTL_SECS))
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh token
    pub fn issue(&self) -> Session {
        self.issue_at(Utc::now())
    }

    pub fn issue_at(&self, now: DateTime<Utc>) -> Session {
        let token = uuid::Uuid::new_v4().to_string();
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.sessions.lock().insert(token.clone(), expires_at);
        tracing::info!(expires_at = %expires_at, "issued session");
        Session { token, expires_at }
    }

    /// True when `token` is known and unexpired. An expired token is removed.
    pub fn validate(&self, token: &str) -> bool {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get(token) {
            Some(expires_at) if *expires_at > now => true,
            Some(_) => {
                sessions.remove(token);
                tracing::debug!("session expired");
                false
            }
            None => false,
        }
    }

    /// Forget one token. Unknown tokens are ignored.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.lock().remove(token).is_some()
    }

    /// Forget every token, e.g. after a password change
    pub fn revoke_all(&self) -> usize {
        let mut sessions = self.sessions.lock();
        let count = sessions.len();
        sessions.clear();
        if count > 0 {
            tracing::info!(count, "revoked all sessions");
        }
        count
    }

    /// Drop expired tokens, returning how many were removed
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, expires_at| *expires_at > now);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Sweep every `interval` until the returned task is aborted
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = store.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_validate() {
        let store = SessionStore::default();
        let session = store.issue();
        assert!(store.validate(&session.token));
        assert!(!store.validate("bogus"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_default_ttl() {
        let store = SessionStore::default();
        let now = Utc::now();
        let session = store.issue_at(now);
        assert_eq!((session.expires_at - now).num_seconds(), DEFAULT_SESSION_TTL_SECS as i64);
    }

    #[test]
    fn test_expired_token_removed_on_validate() {
        let store = SessionStore::new(Duration::from_secs(10));
        let now = Utc::now();
        let session = store.issue_at(now);
        assert!(store.validate_at(&session.token, now + chrono::Duration::seconds(9)));
        assert!(!store.validate_at(&session.token, now + chrono::Duration::seconds(10)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_revoke_and_revoke_all() {
        let store = SessionStore::default();
        let a = store.issue();
        let b = store.issue();
        assert!(store.revoke(&a.token));
        assert!(!store.revoke(&a.token));
        assert!(store.validate(&b.token));
        store.issue();
        assert_eq!(store.revoke_all(), 2);
        assert!(!store.validate(&b.token));
    }

    #[test]
    fn test_sweep() {
        let store = SessionStore::new(Duration::from_secs(60));
        let now = Utc::now();
        store.issue_at(now - chrono::Duration::seconds(120));
        let live = store.issue_at(now);
        assert_eq!(store.sweep_at(now), 1);
        assert!(store.validate_at(&live.token, now));
    }

    #[tokio::test]
    async fn test_sweeper_task_removes_expired() {
        let store = Arc::new(SessionStore::new(Duration::from_millis(1)));
        store.issue();
        let handle = store.spawn_sweeper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        assert!(store.is_empty());
    }
}
