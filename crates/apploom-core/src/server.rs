//! HTTP event surface: accepts workflow triggers and status queries.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::workflow::{CodeAgentEvent, EventDispatcher, WorkflowContext, run_status};

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<WorkflowContext>,
    pub dispatcher: EventDispatcher,
}

#[derive(Deserialize)]
pub struct EventPayload {
    pub project_id: String,
    pub value: String,
}

#[derive(Serialize)]
struct EventAccepted {
    run_id: String,
}

#[derive(Serialize)]
struct StatusResponse {
    running: bool,
    url: String,
    log: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events/code-agent/plan", post(trigger_plan))
        .route("/events/code-agent/generate", post(trigger_generate))
        .route("/events/code-agent/run", post(trigger_run))
        .route("/fragments/{fragment_id}/status", get(fragment_status))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn trigger_plan(
    State(state): State<AppState>,
    Json(payload): Json<EventPayload>,
) -> Response {
    dispatch(
        &state,
        CodeAgentEvent::Plan {
            project_id: payload.project_id,
            value: payload.value,
        },
    )
    .await
}

async fn trigger_generate(
    State(state): State<AppState>,
    Json(payload): Json<EventPayload>,
) -> Response {
    dispatch(
        &state,
        CodeAgentEvent::Generate {
            project_id: payload.project_id,
            value: payload.value,
        },
    )
    .await
}

async fn trigger_run(State(state): State<AppState>, Json(payload): Json<EventPayload>) -> Response {
    dispatch(
        &state,
        CodeAgentEvent::Run {
            project_id: payload.project_id,
            value: payload.value,
        },
    )
    .await
}

async fn dispatch(state: &AppState, event: CodeAgentEvent) -> Response {
    match state.dispatcher.send(event).await {
        Ok(run_id) => (StatusCode::ACCEPTED, Json(EventAccepted { run_id })).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to queue event");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

async fn fragment_status(
    State(state): State<AppState>,
    Path(fragment_id): Path<String>,
) -> Response {
    match run_status(&state.ctx, &fragment_id).await {
        Ok(report) => Json(StatusResponse {
            running: report.running,
            url: report.url,
            log: report.log,
        })
        .into_response(),
        Err(e) => {
            error!(fragment_id, error = %e, "Status check failed");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
