//! HTTP surface: message ingestion plus the read-only dashboard.
//!
//! Auth is a plain header-key equality check at this boundary; the
//! core below assumes requests reaching it are already authorized.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::callback::CallbackDispatcher;
use crate::config::Config;
use crate::dashboard;
use crate::error::StoreError;
use crate::orchestrator::{EngageRequest, Orchestrator};
use crate::persona::PersonaEngine;
use crate::reply::{self, RateGate};
use crate::session::{Intelligence, SessionStore};

const API_KEY_HEADER: &str = "x-api-key";

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<SessionStore>,
    pub gate: Arc<RateGate>,
    pub api_key: SecretString,
    pub dashboard_key: SecretString,
    pub extended_response: bool,
}

impl AppState {
    /// Wire the full pipeline from configuration.
    pub fn from_config(config: &Config) -> Self {
        let store = Arc::new(SessionStore::new());
        let gate = Arc::new(RateGate::new(
            config.gate_enabled,
            config.gate_global_rpm,
            config.gate_reply_rpm,
        ));
        let chain = Arc::new(reply::chain_from_config(config, Arc::clone(&gate)));
        let persona = PersonaEngine::new(config);
        let dispatcher = Arc::new(CallbackDispatcher::from_config(config));
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&store),
            persona,
            chain,
            dispatcher,
        ));
        Self {
            orchestrator,
            store,
            gate,
            api_key: config.api_key.clone(),
            dashboard_key: config.dashboard_key.clone(),
            extended_response: config.extended_response,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/message", post(post_message))
        .route("/api/dashboard/summary", get(get_summary))
        .route("/api/dashboard/sessions", get(list_sessions))
        .route("/api/dashboard/sessions/{id}", get(get_session))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Handlers ────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Minimal response by default; extended fields when enabled.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageResponse {
    status: &'static str,
    reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scam_detected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    engagement_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intelligence: Option<Intelligence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_messages_exchanged: Option<u32>,
}

async fn post_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<EngageRequest>,
) -> Response {
    if let Err(denied) = check_key(&headers, &state.api_key) {
        return denied;
    }
    if request.session_id.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "sessionId must not be empty");
    }
    if request.message.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message.text must not be empty");
    }

    let outcome = state.orchestrator.process(request).await;

    let body = if state.extended_response {
        MessageResponse {
            status: "success",
            reply: outcome.reply,
            scam_detected: Some(outcome.scam_detected),
            engagement_complete: Some(outcome.engagement_complete),
            intelligence: Some(outcome.intelligence),
            total_messages_exchanged: Some(outcome.total_messages_exchanged),
        }
    } else {
        MessageResponse {
            status: "success",
            reply: outcome.reply,
            scam_detected: None,
            engagement_complete: None,
            intelligence: None,
            total_messages_exchanged: None,
        }
    };
    Json(body).into_response()
}

async fn get_summary(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(denied) = check_key(&headers, &state.dashboard_key) {
        return denied;
    }
    Json(dashboard::summarize(&state.store, &state.gate).await).into_response()
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    20
}

async fn list_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    if let Err(denied) = check_key(&headers, &state.dashboard_key) {
        return denied;
    }
    Json(dashboard::recent_sessions(&state.store, query.limit).await).into_response()
}

async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = check_key(&headers, &state.dashboard_key) {
        return denied;
    }
    match state.store.snapshot(&id).await {
        Some(session) => Json(session).into_response(),
        None => {
            let err = StoreError::NotFound(id);
            error_response(StatusCode::NOT_FOUND, &err.to_string())
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn check_key(headers: &HeaderMap, expected: &SecretString) -> Result<(), Response> {
    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented == expected.expose_secret() {
        Ok(())
    } else {
        Err(error_response(StatusCode::UNAUTHORIZED, "invalid API key"))
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"status": "error", "error": message}))).into_response()
}
