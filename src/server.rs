use std::sync::Arc;
use axum::{extract::{Path, State}, routing::{delete, get, post}, Router, Json};
use tower_http::cors::{CorsLayer, Any};
use serde::{Deserialize, Serialize};
use axum::http::StatusCode;
use tracing::{info, warn};
use crate::engine::{Engine, Outcome};
use crate::format::DisplayKind;
use crate::plan::QueryPlan;

#[derive(Deserialize)]
pub struct TurnRequest {
    pub session: String,
    pub message: String,
    /// Raw plan document produced by the plan generator for this message.
    #[serde(default)]
    pub plan: Option<String>,
}

#[derive(Serialize)]
pub struct TurnResponse {
    pub status: String,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_type: Option<DisplayKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<QueryPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TurnResponse {
    fn failed(elapsed_ms: f64, error: String) -> Self {
        Self { status: "error".into(), elapsed_ms, reply_type: None, reply: None, row_count: None, plan: None, error: Some(error) }
    }
}

pub fn router(engine: Arc<Engine>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::DELETE])
        .allow_headers(Any);
    Router::new()
        .route("/v1/turn", post(turn))
        .route("/v1/sessions/:id", delete(end_session))
        .route("/v1/health", get(|| async { "ok" }))
        .layer(cors)
        .with_state(engine)
}

async fn turn(State(engine): State<Arc<Engine>>, Json(req): Json<TurnRequest>) -> (StatusCode, Json<TurnResponse>) {
    let started = std::time::Instant::now();
    // The engine is synchronous; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || {
        engine.respond(&req.session, &req.message, req.plan.as_deref())
    }).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    match result {
        Ok(Ok(turn)) => {
            let row_count = match &turn.outcome {
                Outcome::Answered(result) => Some(result.total),
                _ => None,
            };
            info!(ms = elapsed_ms, rows = ?row_count, "turn answered");
            let body = TurnResponse {
                status: "ok".into(),
                elapsed_ms,
                reply_type: Some(turn.reply.display_kind),
                reply: Some(turn.reply.text),
                row_count,
                plan: turn.plan,
                error: None,
            };
            (StatusCode::OK, Json(body))
        }
        Ok(Err(e)) => {
            warn!(error = %e, "turn failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(TurnResponse::failed(elapsed_ms, e.to_string())))
        }
        Err(e) => {
            warn!(error = %e, "Join error");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(TurnResponse::failed(elapsed_ms, "Join error".into())))
        }
    }
}

async fn end_session(State(engine): State<Arc<Engine>>, Path(id): Path<String>) -> StatusCode {
    match engine.end_session(&id) {
        Ok(true) => StatusCode::NO_CONTENT,
        Ok(false) => StatusCode::NOT_FOUND,
        Err(e) => {
            warn!(error = %e, session = %id, "could not end session");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
