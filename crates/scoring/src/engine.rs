//! Scoring engine — folds response metrics into profiles and feeds the
//! global reasoner with derived agent facts.

use crate::profile::{AgentProfile, PerformanceTrend, ResponseMetrics};
use crate::store::ProfileStore;
use crate::PRIOR_SCORE;
use chrono::Utc;
use quorum_core::error::StoreError;
use quorum_core::event::{DomainEvent, EventBus};
use quorum_reason::{Fact, KnowledgeBase};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Accuracy tier boundaries on the overall score.
const HIGH_ACCURACY: f64 = 0.85;
const MEDIUM_ACCURACY: f64 = 0.70;

/// Speed sub-score above which an agent is tagged `fast`.
const FAST_SPEED: f64 = 0.80;

/// Owns the profile store and the global agent knowledge base.
pub struct ScoringEngine {
    store: ProfileStore,
    reasoner: Arc<Mutex<KnowledgeBase>>,
    events: Arc<EventBus>,
}

impl ScoringEngine {
    pub fn new(
        store: ProfileStore,
        reasoner: Arc<Mutex<KnowledgeBase>>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            reasoner,
            events,
        }
    }

    /// Record one response's metrics against an agent. Persists the full
    /// store (at-least-once durability) and emits derived facts keyed by
    /// the agent's name.
    pub async fn update(
        &self,
        agent_id: &str,
        agent_name: &str,
        metrics: ResponseMetrics,
    ) -> Result<AgentProfile, StoreError> {
        let profile = self
            .store
            .update_profile(agent_id, agent_name, |p| p.record(metrics))
            .await?;

        self.emit_derived_facts(&profile).await;

        info!(
            agent = agent_name,
            overall = format!("{:.3}", profile.overall_score),
            trend = %profile.performance_trend,
            "Agent profile updated"
        );
        self.events.publish(DomainEvent::ProfileUpdated {
            agent_id: agent_id.to_string(),
            overall_score: profile.overall_score,
            timestamp: Utc::now(),
        });

        Ok(profile)
    }

    async fn emit_derived_facts(&self, profile: &AgentProfile) {
        let tier = if profile.overall_score > HIGH_ACCURACY {
            "high"
        } else if profile.overall_score > MEDIUM_ACCURACY {
            "medium"
        } else {
            "low"
        };

        let mut kb = self.reasoner.lock().await;
        kb.add_fact(Fact::new(profile.agent_name.as_str(), "has_accuracy", tier));
        if profile.speed_score > FAST_SPEED {
            kb.add_fact(Fact::new(profile.agent_name.as_str(), "has_speed", "fast"));
        }
        kb.add_fact(Fact::new(
            profile.agent_name.as_str(),
            "trend",
            profile.performance_trend.to_string(),
        ));
        kb.forward_chain();
    }

    /// Overall score for an agent, or the prior for unknown agents.
    /// Pure read — no profile is created.
    pub async fn score_of(&self, agent_id: &str) -> f64 {
        match self.store.get(agent_id).await {
            Some(profile) => profile.overall_score,
            None => PRIOR_SCORE,
        }
    }

    /// Trend for an agent, stable when unknown.
    pub async fn trend_of(&self, agent_id: &str) -> PerformanceTrend {
        match self.store.get(agent_id).await {
            Some(profile) => profile.performance_trend,
            None => PerformanceTrend::Stable,
        }
    }

    /// All profiles sorted descending by overall score.
    pub async fn ranked(&self) -> Vec<AgentProfile> {
        self.store.ranked().await
    }

    /// Number of scored agents.
    pub async fn profile_count(&self) -> usize {
        self.store.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_reason::{Rule, Term};
    use tempfile::NamedTempFile;

    fn engine_with_kb() -> (ScoringEngine, Arc<Mutex<KnowledgeBase>>, NamedTempFile) {
        let tmp = NamedTempFile::new().unwrap();
        let kb = Arc::new(Mutex::new(KnowledgeBase::new()));
        let engine = ScoringEngine::new(
            ProfileStore::open(tmp.path()),
            kb.clone(),
            Arc::new(EventBus::default()),
        );
        (engine, kb, tmp)
    }

    fn metrics(quality: f64, speed: f64) -> ResponseMetrics {
        ResponseMetrics {
            quality,
            speed,
            relevance: 0.9,
            response_time: 2.0,
            response_length: 600,
        }
    }

    #[tokio::test]
    async fn unknown_agent_returns_prior_without_side_effect() {
        let (engine, _kb, _tmp) = engine_with_kb();
        assert_eq!(engine.score_of("never-seen").await, PRIOR_SCORE);
        assert_eq!(engine.profile_count().await, 0);
    }

    #[tokio::test]
    async fn update_emits_tier_and_trend_facts() {
        let (engine, kb, _tmp) = engine_with_kb();
        for _ in 0..5 {
            engine
                .update("debt", "DebtSpecialist", metrics(0.95, 0.95))
                .await
                .unwrap();
        }

        let kb = kb.lock().await;
        assert!(!kb.query(Some("DebtSpecialist"), Some("has_accuracy")).is_empty());
        assert!(!kb.query(Some("DebtSpecialist"), Some("has_speed")).is_empty());
        assert!(!kb.query(Some("DebtSpecialist"), Some("trend")).is_empty());
    }

    #[tokio::test]
    async fn derived_facts_drive_configured_rules() {
        let (engine, kb, _tmp) = engine_with_kb();
        kb.lock().await.add_rule(Rule::new(
            "has_accuracy",
            Term::Subject,
            "reliability_assessed",
            Term::Lit("true".into()),
        ));

        engine
            .update("sav", "SavingsGuru", metrics(0.9, 0.5))
            .await
            .unwrap();

        let kb = kb.lock().await;
        assert_eq!(
            kb.query(Some("SavingsGuru"), Some("reliability_assessed")).len(),
            1
        );
    }

    #[tokio::test]
    async fn slow_agent_gets_no_fast_fact() {
        let (engine, kb, _tmp) = engine_with_kb();
        engine
            .update("slow", "SlowPoke", metrics(0.8, 0.2))
            .await
            .unwrap();

        let kb = kb.lock().await;
        assert!(kb.query(Some("SlowPoke"), Some("has_speed")).is_empty());
    }
}
