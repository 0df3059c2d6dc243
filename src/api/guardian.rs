//! Validation endpoints
//!
//! POST /guardian/validate_plan, POST /guardian/validate_action

use axum::extract::Extension;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vigil_core::{DecisionEngine, ProposedAction};

use super::{error_response, ok};

/// Plan validation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatePlanRequest {
    #[serde(default)]
    pub task_id: String,
    pub plan: Vec<String>,
}

/// Action validation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateActionRequest {
    #[serde(default)]
    pub task_id: String,
    pub step_goal: String,
    pub action: ProposedAction,
}

async fn validate_plan(
    Extension(engine): Extension<Arc<DecisionEngine>>,
    Json(request): Json<ValidatePlanRequest>,
) -> Response {
    match engine.validate_plan(&request.task_id, &request.plan).await {
        Ok(decision) => ok(decision),
        Err(e) => error_response(&e),
    }
}

async fn validate_action(
    Extension(engine): Extension<Arc<DecisionEngine>>,
    Json(request): Json<ValidateActionRequest>,
) -> Response {
    match engine
        .validate_action(&request.task_id, &request.step_goal, &request.action)
        .await
    {
        Ok(decision) => ok(decision),
        Err(e) => error_response(&e),
    }
}

/// Guardian routes
pub fn guardian_routes() -> Router {
    Router::new()
        .route("/guardian/validate_plan", post(validate_plan))
        .route("/guardian/validate_action", post(validate_action))
}
