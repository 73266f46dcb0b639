//! Shared application state injected into every Axum handler.

use std::collections::HashMap;
use std::sync::Arc;

use holistica_responder::Responder;

use crate::config::Config;
use crate::entities::Store;

/// Per-session append locks.
///
/// Appending to a conversation is serialized per session so that the
/// patient message and its AI reply land as an uninterrupted pair.
/// Locks are created lazily and dropped when a session is deleted.
pub struct SessionLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for SessionLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .locks
            .lock()
            .map(|l| l.len())
            .unwrap_or_else(|p| p.into_inner().len());
        write!(f, "SessionLocks({count} sessions)")
    }
}

impl SessionLocks {
    pub fn new() -> Self {
        Self { locks: std::sync::Mutex::new(HashMap::new()) }
    }

    /// The lock guarding `session_id`, created on first use.
    ///
    /// The returned `Arc` must be held across the async append so the
    /// outer map lock is released immediately.
    pub fn for_session(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        map.entry(session_id.to_owned())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry of a deleted session.
    pub fn remove(&self, session_id: &str) {
        let mut map = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        map.remove(session_id);
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// SQLite-backed entity store.
    pub store: Arc<Store>,
    /// AI reply generator (real API or deterministic mock).
    pub responder: Arc<dyn Responder>,
    /// Per-session append serialization.
    pub session_locks: Arc<SessionLocks>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("session_locks", &self.session_locks)
            .finish_non_exhaustive()
    }
}
