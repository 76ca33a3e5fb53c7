//! HTTP API gateway for Quorum.
//!
//! Exposes REST endpoints for query submission, result polling, score
//! introspection, session summaries, payout preparation, and registry
//! reload. Built on Axum.

use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use quorum_config::AppConfig;
use quorum_core::agent::AgentRegistry;
use quorum_core::event::EventBus;
use quorum_core::transport::LocalTransport;
use quorum_orchestrator::{Dispatcher, DispatcherConfig, PollResult};
use quorum_reason::KnowledgeBase;
use quorum_scoring::engine::ScoringEngine;
use quorum_scoring::store::ProfileStore;
use quorum_session::{PayoutShare, SessionStore, SessionSummary, SessionTracker};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub registry: Arc<AgentRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub scoring: Arc<ScoringEngine>,
    pub sessions: Arc<SessionTracker>,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/chat", post(chat_handler))
        .route("/respond", post(respond_handler))
        .route("/response/{request_id}", get(response_handler))
        .route("/scores", get(scores_handler))
        .route("/sessions/{session_id}", get(session_handler))
        .route("/sessions/{session_id}/payout", get(payout_handler))
        .route("/reload", post(reload_handler))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire up the full engine from config and start serving.
///
/// The outbound transport is an in-process queue: deliveries are drained
/// and logged, and responder agents answer back through `POST /respond`.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let events = Arc::new(EventBus::default());
    let registry = Arc::new(AgentRegistry::load(&config.registry_path));
    let scoring = Arc::new(ScoringEngine::new(
        ProfileStore::open(config.data_dir.join("profiles.json")),
        Arc::new(tokio::sync::Mutex::new(KnowledgeBase::new())),
        events.clone(),
    ));
    let sessions = Arc::new(SessionTracker::new(
        SessionStore::open(config.data_dir.join("sessions.json")),
        events.clone(),
    ));

    let (transport, mut outbound) = LocalTransport::new();
    tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            info!(address = %message.address, len = message.text.len(), "Query dispatched");
        }
    });

    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        Arc::new(transport),
        scoring.clone(),
        sessions.clone(),
        events,
        DispatcherConfig {
            response_wait: std::time::Duration::from_secs(config.orchestrator.response_wait_secs),
            speed_horizon_secs: config.orchestrator.speed_horizon_secs,
            top_k: config.orchestrator.top_k,
        },
    ));

    let state = Arc::new(GatewayState {
        config,
        registry,
        dispatcher,
        scoring,
        sessions,
        started_at: Utc::now(),
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// --- Request / response bodies ---

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub request_id: String,
    pub status: &'static str,
    pub agent_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseStatus {
    Processing,
    Success { message: String, agent_count: usize },
    NotFound,
}

#[derive(Debug, Serialize)]
pub struct ScoreEntry {
    pub agent_id: String,
    pub agent_name: String,
    pub overall_score: f64,
    pub trend: String,
    pub total_queries: u64,
}

#[derive(Debug, Deserialize)]
pub struct ScoresQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PayoutQuery {
    #[serde(default)]
    pub total: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct PayoutResponse {
    pub session_id: String,
    pub total: f64,
    pub shares: Vec<PayoutShare>,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub address: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub agents: usize,
    pub in_flight: usize,
    pub profiles: usize,
    pub uptime_secs: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_json(message: impl Into<String>) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: message.into(),
    })
}

// --- Handlers ---

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        agents: state.registry.len(),
        in_flight: state.dispatcher.in_flight().await,
        profiles: state.scoring.profile_count().await,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// Submit a query. Initializes the session when both a session id and a
/// domain are supplied; the request id comes back immediately and the
/// answer is polled via `GET /response/{request_id}`.
async fn chat_handler(
    State(state): State<SharedState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    if body.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, error_json("message is empty")));
    }

    if let (Some(session_id), Some(domain)) = (&body.session_id, &body.domain) {
        if let Err(e) = state.sessions.init_session(session_id, domain).await {
            warn!(error = %e, "Session init failed");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                error_json(e.to_string()),
            ));
        }
    }

    match state
        .dispatcher
        .submit(&body.message, body.session_id.as_deref())
        .await
    {
        Ok(request_id) => {
            let agent_count = state
                .dispatcher
                .progress(&request_id)
                .await
                .map(|(_, expected)| expected)
                .unwrap_or(0);
            Ok(Json(ChatResponse {
                request_id,
                status: "processing",
                agent_count,
            }))
        }
        Err(e) => {
            warn!(error = %e, "Submission rejected");
            Err((StatusCode::SERVICE_UNAVAILABLE, error_json(e.to_string())))
        }
    }
}

/// Inbound responder callback: an agent answers a dispatched query.
async fn respond_handler(
    State(state): State<SharedState>,
    Json(body): Json<RespondRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    match state.dispatcher.on_response(&body.address, &body.text).await {
        Ok(()) => Ok(StatusCode::ACCEPTED),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            error_json(e.to_string()),
        )),
    }
}

async fn response_handler(
    State(state): State<SharedState>,
    Path(request_id): Path<String>,
) -> (StatusCode, Json<ResponseStatus>) {
    match state.dispatcher.poll(&request_id).await {
        PollResult::Processing => (StatusCode::OK, Json(ResponseStatus::Processing)),
        PollResult::Success {
            message,
            agent_count,
        } => (
            StatusCode::OK,
            Json(ResponseStatus::Success {
                message,
                agent_count,
            }),
        ),
        PollResult::NotFound => (StatusCode::NOT_FOUND, Json(ResponseStatus::NotFound)),
    }
}

/// Top agents by overall score, best first.
async fn scores_handler(
    State(state): State<SharedState>,
    Query(query): Query<ScoresQuery>,
) -> Json<Vec<ScoreEntry>> {
    let mut ranked = state.scoring.ranked().await;
    if let Some(limit) = query.limit {
        ranked.truncate(limit);
    }
    Json(
        ranked
            .into_iter()
            .map(|p| ScoreEntry {
                agent_id: p.agent_id,
                agent_name: p.agent_name,
                overall_score: p.overall_score,
                trend: p.performance_trend.to_string(),
                total_queries: p.total_queries,
            })
            .collect(),
    )
}

async fn session_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSummary>, (StatusCode, Json<ErrorResponse>)> {
    match state.sessions.summary(&session_id).await {
        Some(summary) => Ok(Json(summary)),
        None => Err((
            StatusCode::NOT_FOUND,
            error_json(format!("unknown session: {session_id}")),
        )),
    }
}

async fn payout_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Query(query): Query<PayoutQuery>,
) -> Result<Json<PayoutResponse>, (StatusCode, Json<ErrorResponse>)> {
    let total = query.total.unwrap_or(state.config.payout.default_total);
    if total < 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            error_json("total must not be negative"),
        ));
    }
    match state.sessions.prepare_payout(&session_id, total).await {
        Some(shares) => Ok(Json(PayoutResponse {
            session_id,
            total,
            shares,
        })),
        None => Err((
            StatusCode::NOT_FOUND,
            error_json(format!("unknown session: {session_id}")),
        )),
    }
}

/// Re-read the agent registry file.
async fn reload_handler(
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    match state.registry.reload() {
        Ok(count) => Ok(Json(serde_json::json!({ "agents": count }))),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            error_json(e.to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use quorum_core::agent::{AgentInfo, AgentStatus};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn agent(id: &str, specialty: &str) -> AgentInfo {
        AgentInfo {
            id: id.into(),
            name: id.to_uppercase(),
            address: format!("agent1{id}"),
            wallet: format!("0x{id}"),
            specialty: specialty.into(),
            status: AgentStatus::Active,
        }
    }

    fn test_state(agents: Vec<AgentInfo>) -> (SharedState, TempDir) {
        let dir = TempDir::new().unwrap();
        let events = Arc::new(EventBus::default());
        let registry = Arc::new(AgentRegistry::from_agents(agents));
        let scoring = Arc::new(ScoringEngine::new(
            ProfileStore::open(dir.path().join("profiles.json")),
            Arc::new(tokio::sync::Mutex::new(KnowledgeBase::new())),
            events.clone(),
        ));
        let sessions = Arc::new(SessionTracker::new(
            SessionStore::open(dir.path().join("sessions.json")),
            events.clone(),
        ));
        let (transport, _outbound) = LocalTransport::new();
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            Arc::new(transport),
            scoring.clone(),
            sessions.clone(),
            events,
            DispatcherConfig::default(),
        ));
        let state = Arc::new(GatewayState {
            config: AppConfig::default(),
            registry,
            dispatcher,
            scoring,
            sessions,
            started_at: Utc::now(),
        });
        (state, dir)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (state, _dir) = test_state(vec![agent("debt", "debt")]);
        let app = build_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn chat_returns_request_id_and_response_polls_processing() {
        let (state, _dir) = test_state(vec![agent("debt", "debt")]);
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/chat",
                serde_json::json!({"message": "help with my debt"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let request_id = body["request_id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/response/{request_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "processing");
    }

    #[tokio::test]
    async fn chat_without_agents_is_unavailable() {
        let (state, _dir) = test_state(vec![]);
        let app = build_router(state);

        let response = app
            .oneshot(post_json("/chat", serde_json::json!({"message": "help"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let (state, _dir) = test_state(vec![agent("debt", "debt")]);
        let app = build_router(state);

        let response = app
            .oneshot(post_json("/chat", serde_json::json!({"message": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_request_id_is_not_found() {
        let (state, _dir) = test_state(vec![agent("debt", "debt")]);
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/response/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn respond_feeds_the_dispatcher() {
        let (state, _dir) = test_state(vec![agent("debt", "debt")]);
        let dispatcher = state.dispatcher.clone();
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/chat",
                serde_json::json!({"message": "pay off my debt"}),
            ))
            .await
            .unwrap();
        let request_id = body_json(response).await["request_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(post_json(
                "/respond",
                serde_json::json!({
                    "address": "agent1debt",
                    "text": "You should pay the highest APR first."
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(dispatcher.progress(&request_id).await, Some((1, 1)));
    }

    #[tokio::test]
    async fn session_summary_and_payout_flow() {
        let (state, _dir) = test_state(vec![agent("debt", "debt")]);
        state.sessions.init_session("s1", "financial").await.unwrap();
        state
            .sessions
            .record_usage("s1", "debt", "DEBT", "agent1debt", "0xdebt", 85.0, 0.9)
            .await
            .unwrap();
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/sessions/s1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["domain"], "financial");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/sessions/s1/payout?total=10.0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["shares"][0]["wallet"], "0xdebt");
        assert_eq!(body["shares"][0]["amount"], 10.0);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/sessions/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn scores_endpoint_lists_ranked_agents() {
        let (state, _dir) = test_state(vec![agent("debt", "debt")]);
        state
            .scoring
            .update(
                "debt",
                "DEBT",
                quorum_scoring::profile::ResponseMetrics {
                    quality: 0.9,
                    speed: 0.8,
                    relevance: 1.0,
                    response_time: 3.0,
                    response_length: 500,
                },
            )
            .await
            .unwrap();
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/scores?limit=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body[0]["agent_id"], "debt");
        assert!(body[0]["overall_score"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn status_reports_pool_and_inflight() {
        let (state, _dir) = test_state(vec![agent("debt", "debt"), agent("sav", "savings")]);
        let app = build_router(state);

        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["agents"], 2);
        assert_eq!(body["in_flight"], 0);
    }
}
