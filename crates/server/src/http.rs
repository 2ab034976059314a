//! HTTP Endpoints
//!
//! REST API over the assistant. Every request shares one conversation
//! context, the same one the CLI would use.

use std::time::Duration;

use axum::{
    extract::{Json, State},
    http::{Method, StatusCode},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use shadow_core::{ClassificationTier, Intent, IntentType, Parameters};

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
///
/// `/api/query` is added after the timeout layer so it is not wrapped by
/// it: a turn bounds its own calls and always answers with a reply.
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.settings.server.timeout_seconds);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/state", get(conversation_state))
        .route("/api/language", post(set_language))
        .route("/api/preferences", post(set_preference))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(TimeoutLayer::new(timeout))
        .route("/api/query", post(query))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub request_id: String,
    pub reply: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentView>,
}

/// Client-facing view of an intent; the classifier's rationale stays internal
#[derive(Debug, Serialize)]
pub struct IntentView {
    #[serde(rename = "type")]
    pub intent_type: IntentType,
    pub action: String,
    pub target: String,
    pub parameters: Parameters,
    pub confidence: f32,
    pub tier: ClassificationTier,
}

impl From<Intent> for IntentView {
    fn from(intent: Intent) -> Self {
        Self {
            intent_type: intent.intent_type,
            action: intent.action,
            target: intent.target,
            parameters: intent.parameters,
            confidence: intent.confidence,
            tier: intent.tier,
        }
    }
}

/// Run one turn
async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Json<QueryResponse> {
    let request_id = uuid::Uuid::new_v4().to_string();
    metrics::counter!("shadow_http_queries_total").increment(1);
    tracing::debug!(%request_id, chars = request.text.chars().count(), "Query received");

    let turn = state.assistant.safe_handle_turn(&request.text).await;
    Json(QueryResponse {
        request_id,
        reply: turn.reply,
        language: turn.language.code().to_string(),
        intent: turn.intent.map(IntentView::from),
    })
}

/// Conversation summary and AI budget
async fn conversation_state(State(state): State<AppState>) -> Json<serde_json::Value> {
    let assistant = &state.assistant;
    Json(serde_json::json!({
        "language": assistant.current_language().code(),
        "context": assistant.get_state(),
        "rate_limit": assistant.rate_limit_usage(),
        "queue": {
            "pending": assistant.queue_stats().pending(),
            "delivered": assistant.queue_stats().delivered(),
            "failed": assistant.queue_stats().failed(),
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    pub code: String,
}

async fn set_language(
    State(state): State<AppState>,
    Json(request): Json<LanguageRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if !state.assistant.set_language(&request.code) {
        return Err(ServerError::UnsupportedLanguage(request.code));
    }
    let language = state.assistant.current_language();
    Ok(Json(serde_json::json!({
        "language": language.code(),
        "name": language.name(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct PreferenceRequest {
    pub key: String,
    pub value: String,
}

async fn set_preference(
    State(state): State<AppState>,
    Json(request): Json<PreferenceRequest>,
) -> Result<StatusCode, ServerError> {
    let key = request.key.trim();
    if key.is_empty() {
        return Err(ServerError::InvalidRequest("preference key is empty".into()));
    }
    state.assistant.set_preference(key, request.value.trim());
    Ok(StatusCode::NO_CONTENT)
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "assistant": state.settings.assistant.name,
        "language": state.assistant.current_language().code(),
        "ai_provider": format!("{:?}", state.settings.llm.provider).to_lowercase(),
    }))
}
