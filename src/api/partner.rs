//! Step execution endpoint
//!
//! POST /partner/execute_step

use axum::extract::Extension;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vigil_core::StepExecutor;

use super::{error_response, ok};

/// Step execution request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteStepRequest {
    pub task_id: String,
    pub step_goal: String,
}

async fn execute_step(
    Extension(executor): Extension<Arc<StepExecutor>>,
    Json(request): Json<ExecuteStepRequest>,
) -> Response {
    match executor
        .execute_step(&request.task_id, &request.step_goal)
        .await
    {
        Ok(report) => ok(report),
        Err(e) => error_response(&e),
    }
}

/// Partner routes
pub fn partner_routes() -> Router {
    Router::new().route("/partner/execute_step", post(execute_step))
}
