//! Remote peer adapters
//!
//! HTTP implementations of the core seams so the orchestrator can drive a
//! step executor or decision engine running in another vigil process. Peer
//! addresses are resolved through [`Discovery`] on every call, so a peer
//! that re-registers at a new address is picked up without a restart.

use crate::api::guardian::{ValidateActionRequest, ValidatePlanRequest};
use crate::api::partner::ExecuteStepRequest;
use crate::api::registry::{DeregisterRequest, DiscoverResponse, RegisterRequest};
use crate::api::ApiResponse;
use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use vigil_core::{
    discover_with_retry, Decision, Discovery, Error, PolicyGate, ProposedAction, Registrar, Result,
    RetryConfig, StepReport, StepRunner,
};

fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

fn transport_error(url: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::TransientUnavailable(format!("{} timed out", url))
    } else {
        Error::TransientUnavailable(format!("{} unreachable: {}", url, e))
    }
}

/// Map a peer's error envelope back onto the core taxonomy
fn status_error(status: StatusCode, message: String) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::CONFLICT => Error::InvalidTransition {
            from: "remote".to_string(),
            reason: message,
        },
        StatusCode::BAD_REQUEST => Error::InvalidInput(message),
        StatusCode::FORBIDDEN => Error::ValidationDenied(message),
        s if s.is_server_error() => Error::TransientUnavailable(message),
        _ => Error::Internal(format!("peer answered {}: {}", status, message)),
    }
}

async fn decode<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
        if status.is_server_error() {
            Error::TransientUnavailable(format!("{} answered {}", url, status))
        } else {
            Error::Internal(format!("unreadable response from {}: {}", url, e))
        }
    })?;
    match envelope {
        ApiResponse {
            success: true,
            data: Some(data),
            ..
        } => Ok(data),
        ApiResponse { error, .. } => Err(status_error(
            status,
            error.unwrap_or_else(|| format!("{} answered {}", url, status)),
        )),
    }
}

/// A named peer found through discovery
pub struct PeerClient {
    client: Client,
    discovery: Arc<dyn Discovery>,
    service: String,
    retry: RetryConfig,
    discovery_timeout: Duration,
}

impl PeerClient {
    /// Create a client for `service`
    pub fn new(
        service: impl Into<String>,
        discovery: Arc<dyn Discovery>,
        retry: RetryConfig,
        discovery_timeout: Duration,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(request_timeout)?,
            discovery,
            service: service.into(),
            retry,
            discovery_timeout,
        })
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let base = discover_with_retry(
            self.discovery.as_ref(),
            &self.service,
            &self.retry,
            self.discovery_timeout,
        )
        .await?;
        let url = format!("{}{}", base, path);
        debug!(service = %self.service, url = %url, "Calling peer");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        decode(&url, response).await
    }
}

/// [`StepRunner`] backed by a remote `/partner/execute_step`
pub struct RemoteStepRunner {
    peer: PeerClient,
}

impl RemoteStepRunner {
    /// Wrap a peer client
    pub fn new(peer: PeerClient) -> Self {
        Self { peer }
    }
}

#[async_trait::async_trait]
impl StepRunner for RemoteStepRunner {
    async fn run_step(&self, task_id: &str, step_goal: &str) -> Result<StepReport> {
        self.peer
            .post(
                "/partner/execute_step",
                &ExecuteStepRequest {
                    task_id: task_id.to_string(),
                    step_goal: step_goal.to_string(),
                },
            )
            .await
    }
}

/// [`PolicyGate`] backed by a remote `/guardian/*`
pub struct RemotePolicyGate {
    peer: PeerClient,
}

impl RemotePolicyGate {
    /// Wrap a peer client
    pub fn new(peer: PeerClient) -> Self {
        Self { peer }
    }
}

#[async_trait::async_trait]
impl PolicyGate for RemotePolicyGate {
    async fn validate_plan(&self, task_id: &str, plan: &[String]) -> Result<Decision> {
        self.peer
            .post(
                "/guardian/validate_plan",
                &ValidatePlanRequest {
                    task_id: task_id.to_string(),
                    plan: plan.to_vec(),
                },
            )
            .await
    }

    async fn validate_action(
        &self,
        task_id: &str,
        step_goal: &str,
        action: &ProposedAction,
    ) -> Result<Decision> {
        self.peer
            .post(
                "/guardian/validate_action",
                &ValidateActionRequest {
                    task_id: task_id.to_string(),
                    step_goal: step_goal.to_string(),
                    action: action.clone(),
                },
            )
            .await
    }
}

/// Registry client for a directory hosted by another vigil process
pub struct DirectoryClient {
    client: Client,
    base_url: String,
}

impl DirectoryClient {
    /// Client for the directory at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        decode::<serde_json::Value>(&url, response).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl Discovery for DirectoryClient {
    async fn discover(&self, name: &str) -> Result<String> {
        let url = format!("{}/discover", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("service_name", name)])
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        let found: DiscoverResponse = decode(&url, response).await?;
        Ok(found.address)
    }
}

#[async_trait::async_trait]
impl Registrar for DirectoryClient {
    async fn register(&self, name: &str, address: &str, ttl: Duration) -> Result<()> {
        self.post(
            "/register",
            &RegisterRequest {
                service_name: name.to_string(),
                address: address.to_string(),
                ttl_secs: Some(ttl.as_secs()),
            },
        )
        .await
    }

    async fn deregister(&self, name: &str) -> Result<()> {
        self.post(
            "/deregister",
            &DeregisterRequest {
                service_name: name.to_string(),
            },
        )
        .await
    }
}
