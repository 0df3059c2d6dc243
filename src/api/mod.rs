//! HTTP API for Vigil
//!
//! Every component exposes its operations over HTTP so peers can run as
//! separate processes:
//! - Registry: register, deregister, discover, list
//! - Guardian: plan and action validation
//! - Partner: step execution
//! - Manager: task submission, status, approval and replanning
//! - Overseer: audit log and kill switch
//! - Hub: policies and per-task memory

pub mod guardian;
pub mod health;
pub mod hub;
pub mod overseer;
pub mod partner;
pub mod registry;
pub mod tasks;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::Router;
use serde::{Deserialize, Serialize};
use vigil_core::{Error, UserFriendlyError};

pub use guardian::guardian_routes;
pub use health::health_routes;
pub use hub::hub_routes;
pub use overseer::overseer_routes;
pub use partner::partner_routes;
pub use registry::registry_routes;
pub use tasks::tasks_routes;

/// Response envelope shared by every endpoint
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> ApiResponse<T> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// HTTP status for a core error
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidTransition { .. } => StatusCode::CONFLICT,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::ValidationDenied(_) | Error::Ambiguous(_) => StatusCode::FORBIDDEN,
        Error::TransientUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        Error::DeviationDetected(_)
        | Error::Planning(_)
        | Error::Configuration(_)
        | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error envelope with the mapped status code
pub fn error_response(error: &Error) -> Response {
    (
        status_for(error),
        Json(ApiResponse::<()>::error(error.user_message())),
    )
        .into_response()
}

/// Successful envelope with `200 OK`
pub fn ok<T: Serialize>(data: T) -> Response {
    Json(ApiResponse::success(data)).into_response()
}

/// Every route this process serves
pub fn api_router() -> Router {
    Router::new()
        .merge(health_routes())
        .merge(registry_routes())
        .merge(guardian_routes())
        .merge(partner_routes())
        .merge(tasks_routes())
        .merge(overseer_routes())
        .merge(hub_routes())
}
