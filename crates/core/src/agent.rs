//! Responder agent registry — the pool of specialist agents.
//!
//! The registry is a JSON file grouped by domain; only agents marked
//! `active` are candidates for dispatch. The file can be re-read at runtime
//! (`reload`) so agents can be added without restarting the orchestrator.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};

/// Whether an agent is eligible for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Inactive,
}

impl Default for AgentStatus {
    fn default() -> Self {
        AgentStatus::Inactive
    }
}

/// A registered responder agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    /// Stable identifier used for scoring and payouts.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Transport address messages are sent to.
    pub address: String,
    /// Wallet address payouts are sent to.
    #[serde(default)]
    pub wallet: String,
    /// Declared specialty category (e.g. "debt", "savings").
    #[serde(default = "default_specialty")]
    pub specialty: String,
    #[serde(default)]
    pub status: AgentStatus,
}

fn default_specialty() -> String {
    "general".into()
}

/// On-disk registry shape: `{"domain": {"financial": {"agents": [...]}}}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    domain: HashMap<String, DomainEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DomainEntry {
    #[serde(default)]
    agents: Vec<AgentInfo>,
}

/// In-memory view of the registry file. Reload-safe behind a lock.
pub struct AgentRegistry {
    path: PathBuf,
    agents: RwLock<Vec<AgentInfo>>,
}

impl AgentRegistry {
    /// Load the registry from a JSON file. A missing file yields an empty
    /// registry (the orchestrator degrades to the apology path).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let agents = Self::read_active(&path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Registry unreadable — starting empty");
            Vec::new()
        });
        info!(path = %path.display(), count = agents.len(), "Agent registry loaded");
        Self {
            path,
            agents: RwLock::new(agents),
        }
    }

    /// Build a registry directly from agent records (tests, embedded use).
    pub fn from_agents(agents: Vec<AgentInfo>) -> Self {
        Self {
            path: PathBuf::new(),
            agents: RwLock::new(
                agents
                    .into_iter()
                    .filter(|a| a.status == AgentStatus::Active)
                    .collect(),
            ),
        }
    }

    fn read_active(path: &Path) -> Result<Vec<AgentInfo>, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|e| RegistryError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let file: RegistryFile = serde_json::from_str(&content)
            .map_err(|e| RegistryError::Malformed(e.to_string()))?;
        Ok(file
            .domain
            .into_values()
            .flat_map(|d| d.agents)
            .filter(|a| a.status == AgentStatus::Active)
            .collect())
    }

    /// Re-read the registry file. Returns the new active-agent count.
    pub fn reload(&self) -> Result<usize, RegistryError> {
        let agents = Self::read_active(&self.path)?;
        let count = agents.len();
        *self.agents.write().unwrap_or_else(|e| e.into_inner()) = agents;
        info!(count, "Agent registry reloaded");
        Ok(count)
    }

    /// Snapshot of all active agents.
    pub fn active(&self) -> Vec<AgentInfo> {
        self.agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Look up an agent by transport address.
    pub fn by_address(&self, address: &str) -> Option<AgentInfo> {
        self.agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|a| a.address == address)
            .cloned()
    }

    /// Number of active agents.
    pub fn len(&self) -> usize {
        self.agents.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when no active agents are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
