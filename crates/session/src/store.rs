//! File-backed session store — persistent JSON storage.
//!
//! Same discipline as the profile store: whole map loaded at open,
//! rewritten on every mutation behind a process-wide async lock.
//!
//! Storage location: `<data_dir>/sessions.json`

use crate::tracker::Session;
use quorum_core::error::StoreError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Durable session-id → session map.
pub struct SessionStore {
    path: PathBuf,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    /// Open the store, loading any existing sessions. Missing or corrupt
    /// files start empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sessions = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = sessions.len(), "Session store loaded");
        Self {
            path,
            sessions: Arc::new(RwLock::new(sessions)),
        }
    }

    fn load_from_disk(path: &PathBuf) -> HashMap<String, Session> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "Session store corrupted — starting empty");
                HashMap::new()
            }
        }
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let sessions = self.sessions.read().await;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("Failed to create session directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(&*sessions)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, content)
            .map_err(|e| StoreError::Storage(format!("Failed to write session file: {e}")))?;
        Ok(())
    }

    /// Read-modify-write one session slot under the store lock, then
    /// persist. The slot is `None` when the session does not exist yet;
    /// the mutator may fill it in.
    pub async fn mutate<F>(&self, session_id: &str, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Option<Session>),
    {
        {
            let mut sessions = self.sessions.write().await;
            let mut slot = sessions.remove(session_id);
            mutate(&mut slot);
            if let Some(session) = slot {
                sessions.insert(session_id.to_string(), session);
            }
        }
        self.flush().await
    }

    /// Pure read of one session.
    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Number of stored sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
