//! Agent selection — rank the active pool against an analyzed query.
//!
//! Relevance comes from the analyzer's intent weights, performance from the
//! scoring engine, and a small trend boost nudges improving agents up. The
//! default policy selects every candidate; ranking decides synthesis order
//! and weighting, not inclusion. A top-K cutoff is available for deployments
//! with large pools.

use quorum_core::agent::AgentInfo;
use quorum_core::query::QueryAnalysis;
use quorum_scoring::engine::ScoringEngine;
use quorum_scoring::profile::PerformanceTrend;
use tracing::debug;

/// Floor relevance for agents whose specialty matched nothing in the query.
const RELEVANCE_FLOOR: f64 = 0.3;

/// Scale applied to the intent weight when the specialty matched but is not
/// the primary category.
const SECONDARY_SCALE: f64 = 0.8;

/// An agent chosen for a request, with its selection-time scores.
#[derive(Debug, Clone)]
pub struct SelectedAgent {
    pub info: AgentInfo,
    /// Specialty-vs-query fit, [0.3, 1.0].
    pub relevance: f64,
    /// The agent's overall score at selection time.
    pub performance: f64,
    pub trend: PerformanceTrend,
    /// Combined ranking score, capped at 1.0.
    pub final_score: f64,
}

/// Rank candidates against the analysis, descending by `final_score`.
/// All candidates are kept unless `top_k` trims the tail.
pub async fn select_agents(
    analysis: &QueryAnalysis,
    candidates: Vec<AgentInfo>,
    scoring: &ScoringEngine,
    top_k: Option<usize>,
) -> Vec<SelectedAgent> {
    let mut selected = Vec::with_capacity(candidates.len());

    for info in candidates {
        let relevance = if info.specialty == analysis.primary {
            1.0
        } else if let Some(weight) = analysis.intents.get(&info.specialty) {
            weight * SECONDARY_SCALE
        } else {
            RELEVANCE_FLOOR
        };

        let performance = scoring.score_of(&info.id).await;
        let trend = scoring.trend_of(&info.id).await;
        let trend_boost = match trend {
            PerformanceTrend::Improving => 0.05,
            PerformanceTrend::Declining => -0.05,
            PerformanceTrend::Stable => 0.0,
        };

        let final_score = (0.50 * relevance + 0.40 * performance + trend_boost + 0.10).min(1.0);
        debug!(
            agent = %info.name,
            relevance = format!("{relevance:.2}"),
            performance = format!("{performance:.2}"),
            score = format!("{final_score:.2}"),
            "Candidate ranked"
        );

        selected.push(SelectedAgent {
            info,
            relevance,
            performance,
            trend,
            final_score,
        });
    }

    selected.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if let Some(k) = top_k {
        selected.truncate(k);
    }
    selected
}
