use super::types::HeartbeatConfig;
use crate::error::{Error, Result};
use crate::utils::{retry_with_backoff, with_timeout, RetryConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Resolves a service name to an address
#[async_trait::async_trait]
pub trait Discovery: Send + Sync {
    /// Address of a live service; `NotFound` when absent or expired
    async fn discover(&self, name: &str) -> Result<String>;
}

/// Registers this process with a directory
#[async_trait::async_trait]
pub trait Registrar: Send + Sync {
    /// Upsert a registration with the given TTL
    async fn register(&self, name: &str, address: &str, ttl: Duration) -> Result<()>;

    /// Remove a registration
    async fn deregister(&self, name: &str) -> Result<()>;
}

/// Discover with a per-call deadline, retrying `NotFound` and transient
/// failures; startup races can leave a name briefly unregistered.
pub async fn discover_with_retry(
    discovery: &dyn Discovery,
    name: &str,
    retry: &RetryConfig,
    timeout: Duration,
) -> Result<String> {
    retry_with_backoff(
        retry,
        || with_timeout("service discovery", timeout, discovery.discover(name)),
        |e| matches!(e, Error::NotFound(_)) || e.is_transient(),
    )
    .await
    .map_err(|e| match e.last_error {
        Error::NotFound(what) => Error::TransientUnavailable(format!(
            "{} not discoverable after {} attempts",
            what, e.attempts
        )),
        other => other,
    })
}

/// Keep a registration alive.
///
/// Registers immediately (retrying every `retry_every` until the directory
/// accepts it), then refreshes every `interval`. A failed or stalled refresh
/// drops back to the retrying registration loop. Each directory call is
/// bounded by `call_timeout`. Deregisters on cancellation.
pub fn spawn_heartbeat(
    registrar: Arc<dyn Registrar>,
    name: String,
    address: String,
    config: HeartbeatConfig,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let register = || {
            with_timeout(
                "service registration",
                config.call_timeout,
                registrar.register(&name, &address, config.ttl),
            )
        };

        'outer: loop {
            loop {
                match register().await {
                    Ok(()) => {
                        info!(service = %name, address = %address, "Registered with directory");
                        break;
                    }
                    Err(e) => {
                        warn!(service = %name, error = %e, retry_secs = config.retry_every.as_secs(), "Directory unavailable, retrying");
                        tokio::select! {
                            _ = token.cancelled() => break 'outer,
                            _ = tokio::time::sleep(config.retry_every) => {}
                        }
                    }
                }
            }

            loop {
                tokio::select! {
                    _ = token.cancelled() => break 'outer,
                    _ = tokio::time::sleep(config.interval) => {}
                }
                if let Err(e) = register().await {
                    warn!(service = %name, error = %e, "Heartbeat failed, re-registering");
                    continue 'outer;
                }
            }
        }

        let deregister = with_timeout(
            "service deregistration",
            config.call_timeout,
            registrar.deregister(&name),
        );
        if let Err(e) = deregister.await {
            warn!(service = %name, error = %e, "Deregistration on shutdown failed");
        }
    })
}
