//! Health check endpoint

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vigil_core::{KillSwitch, LocalKillSwitch, Orchestrator};

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub halted: bool,
    pub tasks: usize,
}

async fn health(
    Extension(kill_switch): Extension<Arc<LocalKillSwitch>>,
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        halted: kill_switch.is_halted(),
        tasks: orchestrator.task_count(),
    })
}

/// Health routes
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health))
}
