//! Overseer endpoints
//!
//! POST /overseer/log, GET /overseer/events?limit=&task_id=,
//! POST /overseer/kill, GET /overseer/status

use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vigil_core::{AuditEvent, AuditLog, AuditSink, KillSwitch, LocalKillSwitch};

use super::{ok, ApiResponse};

const DEFAULT_EVENT_LIMIT: usize = 50;

/// Event listing query
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Kill switch command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KillAction {
    Halt,
    Resume,
}

/// Kill switch request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillRequest {
    pub action: KillAction,
    #[serde(default)]
    pub note: Option<String>,
}

async fn log_event(
    Extension(audit): Extension<Arc<AuditLog>>,
    Json(event): Json<AuditEvent>,
) -> Response {
    if event.service.trim().is_empty() || event.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error("service and message are required")),
        )
            .into_response();
    }
    audit.emit(event);
    ok(serde_json::json!({ "logged": true }))
}

async fn events(
    Extension(audit): Extension<Arc<AuditLog>>,
    Query(query): Query<EventsQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    ok(audit.recent(limit, query.task_id.as_deref()))
}

async fn kill(
    Extension(kill_switch): Extension<Arc<LocalKillSwitch>>,
    Json(request): Json<KillRequest>,
) -> Response {
    kill_switch.set_halted(request.action == KillAction::Halt, request.note);
    ok(kill_switch.status())
}

async fn status(Extension(kill_switch): Extension<Arc<LocalKillSwitch>>) -> Response {
    ok(kill_switch.status())
}

/// Overseer routes
pub fn overseer_routes() -> Router {
    Router::new()
        .route("/overseer/log", post(log_event))
        .route("/overseer/events", get(events))
        .route("/overseer/kill", post(kill))
        .route("/overseer/status", get(status))
}
