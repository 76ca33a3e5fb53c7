//! Per-request state held in the dispatcher's live table.

use crate::selector::SelectedAgent;
use quorum_core::query::QueryAnalysis;
use quorum_reason::KnowledgeBase;
use std::collections::HashMap;
use tokio::time::Instant;

/// Lifecycle phase of one orchestrated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Created,
    Dispatched,
    Collecting,
    Complete,
    TimedOut,
    Synthesized,
}

/// One collected agent answer plus its derived metrics.
#[derive(Debug, Clone)]
pub struct CollectedResponse {
    pub agent_id: String,
    pub agent_name: String,
    pub specialty: String,
    pub text: String,
    pub elapsed_secs: f64,
    pub quality: f64,
    pub speed: f64,
    pub relevance: f64,
    /// Selection-time ranking score, reused for synthesis weighting.
    pub final_score: f64,
}

/// State for one in-flight query. Lives in the dispatcher's request table
/// from submission until the deadline finalizes it.
pub struct RequestState {
    pub id: String,
    pub analysis: QueryAnalysis,
    pub selected: Vec<SelectedAgent>,
    /// Responses keyed by the responding agent's transport address.
    pub responses: HashMap<String, CollectedResponse>,
    /// |selected| at dispatch time. Never decremented, even on send failure.
    pub expected: usize,
    pub started_at: Instant,
    /// Monotonic creation order, used for most-recent attribution.
    pub seq: u64,
    pub session_id: Option<String>,
    pub phase: RequestPhase,
    /// Per-request knowledge base; its trace feeds the synthesizer.
    pub reasoner: KnowledgeBase,
}

impl RequestState {
    /// The selection record for an address, if this request dispatched to it.
    pub fn selected_agent(&self, address: &str) -> Option<&SelectedAgent> {
        self.selected.iter().find(|s| s.info.address == address)
    }

    /// True when this address could still answer this request.
    pub fn awaiting(&self, address: &str) -> bool {
        matches!(self.phase, RequestPhase::Dispatched | RequestPhase::Collecting)
            && self.selected_agent(address).is_some()
            && !self.responses.contains_key(address)
    }
}
