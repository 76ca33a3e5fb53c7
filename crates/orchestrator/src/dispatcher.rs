//! Orchestration dispatcher — owns the per-request lifecycle.
//!
//! Submission analyzes the query, ranks the active pool, fans the query out
//! over the transport, and arms a fixed deadline timer. Responses are
//! attributed as they arrive; the deadline always waits the full window
//! before finalizing, even when every expected response arrived early.
//! Finalization synthesizes the answer (or the apology, on zero responses)
//! and moves the request from the live table to the results table.

use crate::request::{CollectedResponse, RequestPhase, RequestState};
use crate::selector::select_agents;
use crate::synthesizer::{synthesize, AgentRating, NO_RESPONSE_MESSAGE};
use chrono::{DateTime, Utc};
use quorum_core::agent::AgentRegistry;
use quorum_core::error::{OrchestrationError, Result};
use quorum_core::event::{DomainEvent, EventBus};
use quorum_core::query::analyze_query;
use quorum_core::transport::Transport;
use quorum_reason::{Fact, KnowledgeBase};
use quorum_scoring::engine::ScoringEngine;
use quorum_scoring::profile::ResponseMetrics;
use quorum_scoring::quality::score_response_quality;
use quorum_session::SessionTracker;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Finalized results kept for polling before the oldest are pruned.
const MAX_RESULTS: usize = 1000;

/// Dispatcher tuning knobs.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Full collection window after dispatch. The deadline always waits
    /// this long; early completion does not shorten it.
    pub response_wait: Duration,
    /// Seconds after which the speed score bottoms out at zero.
    pub speed_horizon_secs: f64,
    /// Optional selection cutoff. `None` selects every active agent.
    pub top_k: Option<usize>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            response_wait: Duration::from_secs(20),
            speed_horizon_secs: 30.0,
            top_k: None,
        }
    }
}

/// A finalized request available for polling.
#[derive(Debug, Clone)]
pub struct CompletedResult {
    pub message: String,
    pub agent_count: usize,
    pub finished_at: DateTime<Utc>,
}

/// What a poll-by-id returns.
#[derive(Debug, Clone, PartialEq)]
pub enum PollResult {
    Processing,
    Success { message: String, agent_count: usize },
    NotFound,
}

/// The orchestration core. One instance per process, shared behind `Arc`.
pub struct Dispatcher {
    registry: Arc<AgentRegistry>,
    transport: Arc<dyn Transport>,
    scoring: Arc<ScoringEngine>,
    sessions: Arc<SessionTracker>,
    events: Arc<EventBus>,
    config: DispatcherConfig,
    requests: RwLock<HashMap<String, RequestState>>,
    results: RwLock<HashMap<String, CompletedResult>>,
    seq: AtomicU64,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<AgentRegistry>,
        transport: Arc<dyn Transport>,
        scoring: Arc<ScoringEngine>,
        sessions: Arc<SessionTracker>,
        events: Arc<EventBus>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            scoring,
            sessions,
            events,
            config,
            requests: RwLock::new(HashMap::new()),
            results: RwLock::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Submit a user query. Selects agents, fans out, arms the deadline,
    /// and returns the request id to poll. Errors only when no active
    /// agents are registered at all.
    pub async fn submit(
        self: &Arc<Self>,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<String> {
        let candidates = self.registry.active();
        if candidates.is_empty() {
            return Err(OrchestrationError::NoAgents.into());
        }

        let analysis = analyze_query(message);
        let selected =
            select_agents(&analysis, candidates, &self.scoring, self.config.top_k).await;

        let id = uuid::Uuid::new_v4().to_string();
        let mut reasoner = KnowledgeBase::new();
        reasoner.add_fact(Fact::new("query", "classified_as", analysis.primary.as_str()));
        if analysis.urgency >= 0.5 {
            reasoner.add_fact(Fact::new("query", "flagged", "urgent"));
        }
        for agent in &selected {
            reasoner.add_fact(Fact::new(
                agent.info.name.as_str(),
                "selected_for",
                analysis.primary.as_str(),
            ));
        }

        info!(
            request = %id,
            primary = %analysis.primary,
            agents = selected.len(),
            "Query accepted"
        );
        self.events.publish(DomainEvent::QueryReceived {
            request_id: id.clone(),
            primary: analysis.primary.clone(),
            agent_count: selected.len(),
            timestamp: Utc::now(),
        });

        let state = RequestState {
            id: id.clone(),
            analysis,
            expected: selected.len(),
            selected,
            responses: HashMap::new(),
            started_at: Instant::now(),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            session_id: session_id.map(str::to_string),
            phase: RequestPhase::Created,
            reasoner,
        };
        self.requests.write().await.insert(id.clone(), state);

        self.fan_out(&id).await;
        self.arm_deadline(&id);
        Ok(id)
    }

    /// Send the query text to every selected agent. A failed send is
    /// logged and published; the expected count stays untouched, so the
    /// agent is treated like a non-responder.
    async fn fan_out(&self, request_id: &str) {
        let (text, targets) = {
            let mut requests = self.requests.write().await;
            let Some(state) = requests.get_mut(request_id) else {
                return;
            };
            state.phase = RequestPhase::Dispatched;
            let targets: Vec<String> = state
                .selected
                .iter()
                .map(|s| s.info.address.clone())
                .collect();
            (state.analysis.text.clone(), targets)
        };

        for address in targets {
            if let Err(e) = self.transport.send(&address, &text).await {
                warn!(request = request_id, %address, error = %e, "Send failed");
                self.events.publish(DomainEvent::SendFailed {
                    request_id: request_id.to_string(),
                    address,
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }

        if let Some(state) = self.requests.write().await.get_mut(request_id) {
            state.phase = RequestPhase::Collecting;
        }
    }

    /// Arm the fixed collection window. The timer fires once; finalize is
    /// a no-op if the request is already gone.
    fn arm_deadline(self: &Arc<Self>, request_id: &str) {
        let dispatcher = Arc::clone(self);
        let id = request_id.to_string();
        let wait = self.config.response_wait;
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            if let Err(e) = dispatcher.finalize(&id).await {
                warn!(request = %id, error = %e, "Finalize failed");
            }
        });
    }

    /// Inbound responder callback. Attributes the response to the most
    /// recently created request still awaiting this agent; anything else
    /// is discarded as stale. Records metrics and fires scoring and
    /// session side effects.
    pub async fn on_response(&self, address: &str, text: &str) -> Result<()> {
        let Some(agent) = self.registry.by_address(address) else {
            debug!(%address, "Response from unknown address discarded");
            return Ok(());
        };

        let (request_id, session_id, metrics) = {
            let mut requests = self.requests.write().await;
            let target = requests
                .values_mut()
                .filter(|r| r.awaiting(address))
                .max_by_key(|r| r.seq);
            let Some(state) = target else {
                debug!(%address, agent = %agent.name, "Stale response discarded");
                return Ok(());
            };

            // awaiting() guaranteed the selection exists.
            let (relevance, final_score) = match state.selected_agent(address) {
                Some(s) => (s.relevance, s.final_score),
                None => return Ok(()),
            };

            let elapsed = state.started_at.elapsed().as_secs_f64();
            let quality = score_response_quality(text);
            let speed = (1.0 - elapsed / self.config.speed_horizon_secs).max(0.0);

            state.responses.insert(
                address.to_string(),
                CollectedResponse {
                    agent_id: agent.id.clone(),
                    agent_name: agent.name.clone(),
                    specialty: agent.specialty.clone(),
                    text: text.to_string(),
                    elapsed_secs: elapsed,
                    quality,
                    speed,
                    relevance,
                    final_score,
                },
            );
            let primary = state.analysis.primary.clone();
            state
                .reasoner
                .add_fact(Fact::new(agent.name.as_str(), "answered", primary));
            if quality > 0.7 {
                state
                    .reasoner
                    .add_fact(Fact::new(agent.name.as_str(), "gave", "detailed_answer"));
            }
            state.reasoner.forward_chain();

            self.events.publish(DomainEvent::ResponseCollected {
                request_id: state.id.clone(),
                agent_name: agent.name.clone(),
                elapsed_secs: elapsed,
                timestamp: Utc::now(),
            });

            (
                state.id.clone(),
                state.session_id.clone(),
                ResponseMetrics {
                    quality,
                    speed,
                    relevance,
                    response_time: elapsed,
                    response_length: text.len(),
                },
            )
        };

        debug!(request = %request_id, agent = %agent.name, "Response collected");
        self.scoring.update(&agent.id, &agent.name, metrics).await?;

        if let Some(session_id) = session_id {
            let score =
                (0.4 * metrics.quality + 0.3 * metrics.speed + 0.3 * metrics.relevance) * 100.0;
            self.sessions
                .record_usage(
                    &session_id,
                    &agent.id,
                    &agent.name,
                    &agent.address,
                    &agent.wallet,
                    score,
                    metrics.quality,
                )
                .await?;
        }
        Ok(())
    }

    /// Deadline handler: remove the request from the live table, synthesize
    /// (or apologize), and store the result for polling.
    async fn finalize(&self, request_id: &str) -> Result<()> {
        let Some(mut state) = self.requests.write().await.remove(request_id) else {
            return Ok(());
        };

        state.phase = if state.responses.len() >= state.expected {
            RequestPhase::Complete
        } else {
            RequestPhase::TimedOut
        };

        let mut responses: Vec<CollectedResponse> = state.responses.values().cloned().collect();
        responses.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let message = if responses.is_empty() {
            NO_RESPONSE_MESSAGE.to_string()
        } else {
            let mut ratings = Vec::with_capacity(responses.len());
            for response in &responses {
                ratings.push(AgentRating {
                    name: response.agent_name.clone(),
                    specialty: response.specialty.clone(),
                    overall: self.scoring.score_of(&response.agent_id).await,
                    trend: self.scoring.trend_of(&response.agent_id).await,
                    elapsed_secs: response.elapsed_secs,
                });
            }
            synthesize(&state.analysis, &responses, state.reasoner.trace(), &ratings)
        };
        state.phase = RequestPhase::Synthesized;

        info!(
            request = request_id,
            responses = responses.len(),
            expected = state.expected,
            "Request synthesized"
        );
        self.events.publish(DomainEvent::RequestSynthesized {
            request_id: request_id.to_string(),
            responses: responses.len(),
            expected: state.expected,
            timestamp: Utc::now(),
        });

        let mut results = self.results.write().await;
        results.insert(
            request_id.to_string(),
            CompletedResult {
                message,
                agent_count: responses.len(),
                finished_at: Utc::now(),
            },
        );
        if results.len() > MAX_RESULTS {
            if let Some(oldest) = results
                .iter()
                .min_by_key(|(_, r)| r.finished_at)
                .map(|(id, _)| id.clone())
            {
                results.remove(&oldest);
            }
        }
        Ok(())
    }

    /// Poll a request by id. Polling is idempotent: a finalized result
    /// stays available until pruned.
    pub async fn poll(&self, request_id: &str) -> PollResult {
        if let Some(result) = self.results.read().await.get(request_id) {
            return PollResult::Success {
                message: result.message.clone(),
                agent_count: result.agent_count,
            };
        }
        if self.requests.read().await.contains_key(request_id) {
            return PollResult::Processing;
        }
        PollResult::NotFound
    }

    /// Collected-vs-expected counts for an in-flight request.
    pub async fn progress(&self, request_id: &str) -> Option<(usize, usize)> {
        self.requests
            .read()
            .await
            .get(request_id)
            .map(|r| (r.responses.len(), r.expected))
    }

    /// Number of in-flight requests.
    pub async fn in_flight(&self) -> usize {
        self.requests.read().await.len()
    }
}
