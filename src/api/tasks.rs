//! Task endpoints
//!
//! POST /invoke                 - submit a goal (202 Accepted)
//! GET  /task/:id/status        - full task snapshot
//! POST /task/:id/approve       - resume a paused task
//! POST /task/:id/replan        - restart a task with a new goal
//! GET  /tasks/list             - summaries, most recent first

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use vigil_core::{Orchestrator, TaskStatus};

use super::{error_response, ok, ApiResponse};

/// Goal submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    pub goal: String,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

/// Accepted submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub status_url: String,
}

/// Approval with an optional operator note
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApproveRequest {
    #[serde(default)]
    pub note: Option<String>,
}

/// Replan with a new goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplanRequest {
    pub goal: String,
}

async fn invoke(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Json(request): Json<InvokeRequest>,
) -> Response {
    let task_id = match orchestrator.submit(&request.goal, request.context).await {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let status = match orchestrator.status(&task_id).await {
        Ok(task) => task.status,
        Err(e) => return error_response(&e),
    };

    info!(task_id = %task_id, status = %status, "Goal accepted");
    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(InvokeResponse {
            status_url: format!("/task/{}/status", task_id),
            task_id,
            status,
        })),
    )
        .into_response()
}

async fn task_status(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Path(task_id): Path<String>,
) -> Response {
    match orchestrator.status(&task_id).await {
        Ok(task) => ok(task),
        Err(e) => error_response(&e),
    }
}

async fn approve(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Path(task_id): Path<String>,
    body: Option<Json<ApproveRequest>>,
) -> Response {
    let note = body.and_then(|Json(b)| b.note);
    match orchestrator.approve(&task_id, note).await {
        Ok(task) => ok(task),
        Err(e) => error_response(&e),
    }
}

async fn replan(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Path(task_id): Path<String>,
    Json(request): Json<ReplanRequest>,
) -> Response {
    match orchestrator.replan(&task_id, &request.goal).await {
        Ok(task) => ok(task),
        Err(e) => error_response(&e),
    }
}

async fn list(Extension(orchestrator): Extension<Arc<Orchestrator>>) -> Response {
    ok(orchestrator.list().await)
}

/// Task routes
pub fn tasks_routes() -> Router {
    Router::new()
        .route("/invoke", post(invoke))
        .route("/task/:id/status", get(task_status))
        .route("/task/:id/approve", post(approve))
        .route("/task/:id/replan", post(replan))
        .route("/tasks/list", get(list))
}
