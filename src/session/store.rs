//! In-memory session store with per-session exclusive locks.
//!
//! The outer `RwLock` only guards the id → session map; all pipeline
//! work happens under the inner per-session `Mutex`, so concurrent
//! messages for *different* sessions never serialize against each
//! other.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::model::{Session, SessionMeta, SessionSummary};

/// Concurrent keyed repository of sessions. The single source of
/// truth mutated by every request.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the session for `session_id`, creating it if unseen.
    ///
    /// Creation is atomic under the map's write lock: concurrent
    /// first-touches of the same id all resolve to the one inserted
    /// entry.
    pub async fn get_or_create(
        &self,
        session_id: &str,
        meta: &SessionMeta,
    ) -> Arc<Mutex<Session>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(session_id) {
                return Arc::clone(session);
            }
        }

        let mut sessions = self.sessions.write().await;
        // A racing creator may have won between the two lock scopes.
        let entry = sessions.entry(session_id.to_string()).or_insert_with(|| {
            debug!(session_id, "Creating new session");
            Arc::new(Mutex::new(Session::new(session_id.to_string(), meta.clone())))
        });
        Arc::clone(entry)
    }

    /// Fetch an existing session. Read-only dashboard paths treat
    /// `None` as NotFound; the message path never calls this.
    pub async fn get(&self, session_id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Read-only copy of one session's current state.
    pub async fn snapshot(&self, session_id: &str) -> Option<Session> {
        let handle = self.get(session_id).await?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    /// Summaries of the most recently active sessions, newest first.
    pub async fn list_recent(&self, limit: usize) -> Vec<SessionSummary> {
        let mut summaries = self.all_summaries().await;
        summaries.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        summaries.truncate(limit);
        summaries
    }

    /// Summaries of every session, unordered.
    pub async fn all_summaries(&self) -> Vec<SessionSummary> {
        let handles: Vec<Arc<Mutex<Session>>> =
            self.sessions.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            let session = handle.lock().await;
            summaries.push(session.summary());
        }
        summaries
    }

    /// Full read-only copies of every session, for the read model.
    pub async fn all_snapshots(&self) -> Vec<Session> {
        let handles: Vec<Arc<Mutex<Session>>> =
            self.sessions.read().await.values().cloned().collect();

        let mut snapshots = Vec::with_capacity(handles.len());
        for handle in handles {
            let session = handle.lock().await;
            snapshots.push(session.clone());
        }
        snapshots
    }

    /// Number of sessions held (no eviction in the base design).
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
