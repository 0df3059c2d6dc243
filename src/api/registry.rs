//! Registry endpoints
//!
//! POST /register, POST /deregister, GET /discover?service_name=, GET /list

use axum::extract::{Extension, Query};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use vigil_core::ServiceRegistry;

use super::{error_response, ok};

/// Registration (also used as a heartbeat)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub service_name: String,
    pub address: String,
    /// Seconds; absent or zero uses the registry default
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

/// Deregistration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeregisterRequest {
    pub service_name: String,
}

/// Discovery query
#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    pub service_name: String,
}

/// Discovery answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub service_name: String,
    pub address: String,
}

/// Listed record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceView {
    pub name: String,
    pub address: String,
    pub registered_at: chrono::DateTime<chrono::Utc>,
    pub ttl_secs: u64,
    pub remaining_secs: u64,
}

async fn register(
    Extension(registry): Extension<Arc<ServiceRegistry>>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    let ttl = request.ttl_secs.map(Duration::from_secs);
    match registry.register(&request.service_name, &request.address, ttl) {
        Ok(record) => ok(record),
        Err(e) => error_response(&e),
    }
}

async fn deregister(
    Extension(registry): Extension<Arc<ServiceRegistry>>,
    Json(request): Json<DeregisterRequest>,
) -> Response {
    match registry.deregister(&request.service_name) {
        Ok(()) => ok(serde_json::json!({ "service_name": request.service_name })),
        Err(e) => error_response(&e),
    }
}

async fn discover(
    Extension(registry): Extension<Arc<ServiceRegistry>>,
    Query(query): Query<DiscoverQuery>,
) -> Response {
    match registry.discover(&query.service_name) {
        Ok(address) => ok(DiscoverResponse {
            service_name: query.service_name,
            address,
        }),
        Err(e) => error_response(&e),
    }
}

async fn list(Extension(registry): Extension<Arc<ServiceRegistry>>) -> Response {
    let services: Vec<ServiceView> = registry
        .list()
        .into_iter()
        .map(|r| ServiceView {
            remaining_secs: r.remaining_secs(),
            name: r.name,
            address: r.address,
            registered_at: r.registered_at,
            ttl_secs: r.ttl_secs,
        })
        .collect();
    ok(services)
}

/// Registry routes
pub fn registry_routes() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/deregister", post(deregister))
        .route("/discover", get(discover))
        .route("/list", get(list))
}
