//! Per-user session state and the store that owns it.
//!
//! Sessions live in a token-keyed map; each slot is an `Arc<Mutex<Session>>`
//! so operations on one session serialize against each other while unrelated
//! sessions proceed independently. Eviction is terminal: a slot flips from
//! `Active` to `Evicted` exactly once and is then unreachable through the
//! store, so a caller racing an eviction either wins the slot or mints a
//! fresh session, never resurrects the old one.
//!
//! An idle sweep walks the map on its own schedule and evicts sessions whose
//! last activity is older than the configured timeout. A slot whose lock is
//! held is skipped; the in-flight request refreshes its activity anyway.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::index::VectorIndex;
use crate::models::{ChatTurn, Document};

/// Lifecycle state of a session slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Evicted,
}

/// Everything one user's conversation owns.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Documents in upload order.
    pub documents: Vec<Document>,
    /// `None` means no index: empty document set, or the last rebuild could
    /// not embed. Retrieval falls back to sentence search.
    pub index: Option<VectorIndex>,
    pub chat_history: Vec<ChatTurn>,
    pub state: SessionState,
}

impl Session {
    pub(crate) fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            last_activity: now,
            documents: Vec::new(),
            index: None,
            chat_history: Vec::new(),
            state: SessionState::Active,
        }
    }

    fn is_idle(&self, now: DateTime<Utc>, timeout_secs: u64) -> bool {
        now.signed_duration_since(self.last_activity).num_seconds() > timeout_secs as i64
    }
}

pub type SessionSlot = Arc<Mutex<Session>>;

/// Token-keyed container of all live sessions.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionSlot>>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Resolve a token to its live session, minting a fresh one when the
    /// token is absent, unknown, or points at an evicted slot.
    ///
    /// Returns the slot plus the token the caller should hold on to, which
    /// differs from the input exactly when a new session was minted.
    pub async fn get_or_create(&self, token: Option<&str>) -> (SessionSlot, String) {
        if let Some(token) = token {
            let existing = { self.sessions.read().await.get(token).cloned() };
            if let Some(slot) = existing {
                let mut session = slot.lock().await;
                if session.state == SessionState::Active {
                    session.last_activity = Utc::now();
                    drop(session);
                    return (slot, token.to_string());
                }
                // Evicted while we were resolving; fall through and mint.
            }
        }
        self.mint().await
    }

    async fn mint(&self) -> (SessionSlot, String) {
        let session = Session::new();
        let token = session.id.clone();
        let slot = Arc::new(Mutex::new(session));
        self.sessions
            .write()
            .await
            .insert(token.clone(), slot.clone());
        tracing::info!(session_id = %token, "created session");
        (slot, token)
    }

    /// Look up a session without creating one.
    pub async fn get(&self, token: &str) -> Option<SessionSlot> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Destroy a session immediately. Returns `false` for unknown tokens.
    pub async fn delete(&self, token: &str) -> bool {
        let slot = { self.sessions.write().await.remove(token) };
        match slot {
            Some(slot) => {
                slot.lock().await.state = SessionState::Evicted;
                tracing::info!(session_id = %token, "deleted session");
                true
            }
            None => false,
        }
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Evict every session idle past the configured timeout; returns how
    /// many were evicted. Slots whose lock is held are left alone.
    pub async fn sweep_idle(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|token, slot| match slot.try_lock() {
            Ok(mut session) => {
                if session.is_idle(now, self.config.timeout_secs) {
                    session.state = SessionState::Evicted;
                    tracing::info!(session_id = %token, "evicting idle session");
                    false
                } else {
                    true
                }
            }
            Err(_) => true,
        });
        before - sessions.len()
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.sweep_interval_secs)
    }
}

/// Spawn the background idle sweep for `store`. The returned handle can be
/// aborted at shutdown.
pub fn spawn_sweeper(store: Arc<SessionStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(store.sweep_interval());
        // interval's first tick completes immediately; consume it so a fresh
        // store is not swept at startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = store.sweep_idle().await;
            if evicted > 0 {
                tracing::debug!(evicted, "idle sweep complete");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> SessionStore {
        SessionStore::new(SessionConfig::default())
    }

    #[tokio::test]
    async fn test_mint_without_token() {
        let store = store();
        let (slot, token) = store.get_or_create(None).await;
        assert!(!token.is_empty());
        assert_eq!(slot.lock().await.id, token);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_known_token_resolves_same_session() {
        let store = store();
        let (_, token) = store.get_or_create(None).await;
        let (slot, token2) = store.get_or_create(Some(&token)).await;
        assert_eq!(token, token2);
        assert_eq!(slot.lock().await.id, token);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_token_mints_fresh_session() {
        let store = store();
        let (_, token) = store.get_or_create(Some("no-such-token")).await;
        assert_ne!(token, "no-such-token");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_is_terminal() {
        let store = store();
        let (_, token) = store.get_or_create(None).await;
        assert!(store.delete(&token).await);
        assert!(store.get(&token).await.is_none());
        assert!(!store.delete(&token).await);

        // The old token now mints a brand new session.
        let (_, token2) = store.get_or_create(Some(&token)).await;
        assert_ne!(token, token2);
    }

    #[tokio::test]
    async fn test_access_to_evicted_slot_mints_new() {
        let store = store();
        let (slot, token) = store.get_or_create(None).await;
        // Simulate losing the race against an eviction that already marked
        // the slot but whose map entry a caller still holds.
        slot.lock().await.state = SessionState::Evicted;
        let (_, token2) = store.get_or_create(Some(&token)).await;
        assert_ne!(token, token2);
    }

    #[tokio::test]
    async fn test_sweep_evicts_only_idle_sessions() {
        let store = store();
        let (stale_slot, stale_token) = store.get_or_create(None).await;
        let (_, fresh_token) = store.get_or_create(None).await;

        stale_slot.lock().await.last_activity = Utc::now() - Duration::hours(25);

        assert_eq!(store.sweep_idle().await, 1);
        assert!(store.get(&stale_token).await.is_none());
        assert!(store.get(&fresh_token).await.is_some());
        assert_eq!(stale_slot.lock().await.state, SessionState::Evicted);
    }

    #[tokio::test]
    async fn test_sweep_skips_locked_session() {
        let store = store();
        let (slot, token) = store.get_or_create(None).await;
        slot.lock().await.last_activity = Utc::now() - Duration::hours(25);

        let guard = slot.lock().await;
        assert_eq!(store.sweep_idle().await, 0);
        assert!(store.get(&token).await.is_some());
        drop(guard);

        assert_eq!(store.sweep_idle().await, 1);
        assert!(store.get(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_resolution_yields_one_session() {
        let store = Arc::new(store());
        let (_, token) = store.get_or_create(None).await;
        let (a, b) = tokio::join!(
            store.get_or_create(Some(&token)),
            store.get_or_create(Some(&token)),
        );
        assert_eq!(a.1, b.1);
        assert_eq!(store.len().await, 1);
    }
}
