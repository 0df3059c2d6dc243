//! Knowledge hub endpoints
//!
//! GET/POST /hub/policies, GET /hub/tools, GET /hub/search?query=&limit=,
//! GET /hub/memory/:task_id

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use vigil_core::{KnowledgeStore, PolicySnippet};

use super::{error_response, ok, ApiResponse};
use crate::hub::KnowledgeHub;

/// Search query
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    5
}

async fn list_policies(Extension(hub): Extension<Arc<KnowledgeHub>>) -> Response {
    match hub.get_policies("").await {
        Ok(policies) => ok(policies),
        Err(e) => error_response(&e),
    }
}

async fn add_policy(
    Extension(hub): Extension<Arc<KnowledgeHub>>,
    Json(snippet): Json<PolicySnippet>,
) -> Response {
    if snippet.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error("policy text is empty")),
        )
            .into_response();
    }
    hub.add_policy(snippet.clone());
    (StatusCode::CREATED, Json(ApiResponse::success(snippet))).into_response()
}

async fn list_tools(Extension(hub): Extension<Arc<KnowledgeHub>>) -> Response {
    match hub.get_tools().await {
        Ok(tools) => ok(tools),
        Err(e) => error_response(&e),
    }
}

async fn search(
    Extension(hub): Extension<Arc<KnowledgeHub>>,
    Query(query): Query<SearchQuery>,
) -> Response {
    match hub.search(&query.query, query.limit).await {
        Ok(hits) => ok(hits),
        Err(e) => error_response(&e),
    }
}

async fn memory(
    Extension(hub): Extension<Arc<KnowledgeHub>>,
    Path(task_id): Path<String>,
) -> Response {
    ok(hub.memory_for(&task_id))
}

/// Hub routes
pub fn hub_routes() -> Router {
    Router::new()
        .route("/hub/policies", get(list_policies).post(add_policy))
        .route("/hub/tools", get(list_tools))
        .route("/hub/search", get(search))
        .route("/hub/memory/:task_id", get(memory))
}
