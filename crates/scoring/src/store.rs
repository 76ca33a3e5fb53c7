//! File-backed profile store — persistent JSON storage.
//!
//! The full profile map is loaded on creation and rewritten on every
//! mutation: fast reads, durable writes, last-writer-wins. Single-process
//! deployment is assumed; there is no cross-process locking.
//!
//! Storage location: `<data_dir>/agent_scores.json`

use crate::profile::AgentProfile;
use quorum_core::error::StoreError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Durable agent-id → profile map.
pub struct ProfileStore {
    path: PathBuf,
    profiles: Arc<RwLock<HashMap<String, AgentProfile>>>,
}

impl ProfileStore {
    /// Open a store at the given path, loading existing profiles.
    /// A missing file starts empty; a corrupt file starts empty with a
    /// warning (scores regenerate from traffic).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let profiles = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = profiles.len(), "Profile store loaded");
        Self {
            path,
            profiles: Arc::new(RwLock::new(profiles)),
        }
    }

    fn load_from_disk(path: &PathBuf) -> HashMap<String, AgentProfile> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return HashMap::new(), // File doesn't exist yet — start empty
        };
        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "Profile store corrupted — starting empty");
                HashMap::new()
            }
        }
    }

    /// Persist the full map. A failed write is surfaced, not swallowed.
    async fn flush(&self) -> Result<(), StoreError> {
        let profiles = self.profiles.read().await;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("Failed to create score directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(&*profiles)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, content)
            .map_err(|e| StoreError::Storage(format!("Failed to write score file: {e}")))?;
        Ok(())
    }

    /// Read-modify-write one profile under the store lock, then persist.
    /// The mutator receives a lazily created seed profile on first use.
    pub async fn update_profile<F>(
        &self,
        agent_id: &str,
        agent_name: &str,
        mutate: F,
    ) -> Result<AgentProfile, StoreError>
    where
        F: FnOnce(&mut AgentProfile),
    {
        let updated = {
            let mut profiles = self.profiles.write().await;
            let profile = profiles
                .entry(agent_id.to_string())
                .or_insert_with(|| AgentProfile::seed(agent_id, agent_name));
            mutate(profile);
            profile.clone()
        };
        self.flush().await?;
        Ok(updated)
    }

    /// Pure read: the profile if one exists. Never creates an entry.
    pub async fn get(&self, agent_id: &str) -> Option<AgentProfile> {
        self.profiles.read().await.get(agent_id).cloned()
    }

    /// All profiles sorted descending by overall score.
    pub async fn ranked(&self) -> Vec<AgentProfile> {
        let mut all: Vec<AgentProfile> = self.profiles.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            b.overall_score
                .partial_cmp(&a.overall_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        all
    }

    /// Number of stored profiles.
    pub async fn count(&self) -> usize {
        self.profiles.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ResponseMetrics;
    use tempfile::NamedTempFile;

    fn metrics(quality: f64) -> ResponseMetrics {
        ResponseMetrics {
            quality,
            speed: 0.9,
            relevance: 0.8,
            response_time: 3.0,
            response_length: 400,
        }
    }

    #[tokio::test]
    async fn update_persists_across_reopen() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);

        let store = ProfileStore::open(path.clone());
        store
            .update_profile("debt", "DebtSpecialist", |p| p.record(metrics(0.9)))
            .await
            .unwrap();

        let reopened = ProfileStore::open(path);
        let profile = reopened.get("debt").await.unwrap();
        assert_eq!(profile.total_queries, 1);
        assert_eq!(profile.agent_name, "DebtSpecialist");
    }

    #[tokio::test]
    async fn get_does_not_create_entries() {
        let tmp = NamedTempFile::new().unwrap();
        let store = ProfileStore::open(tmp.path());

        assert!(store.get("ghost").await.is_none());
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn ranked_sorts_descending() {
        let tmp = NamedTempFile::new().unwrap();
        let store = ProfileStore::open(tmp.path());

        store
            .update_profile("low", "Low", |p| {
                for _ in 0..5 {
                    p.record(metrics(0.2));
                }
            })
            .await
            .unwrap();
        store
            .update_profile("high", "High", |p| {
                for _ in 0..5 {
                    p.record(metrics(0.95));
                }
            })
            .await
            .unwrap();

        let ranked = store.ranked().await;
        assert_eq!(ranked[0].agent_id, "high");
        assert_eq!(ranked[1].agent_id, "low");
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "not json at all").unwrap();

        let store = ProfileStore::open(tmp.path());
        assert_eq!(store.count().await, 0);
    }
}
