use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bound a fallible call by a deadline; an elapsed deadline is a transient failure.
pub async fn with_timeout<T, Fut>(operation: &str, limit: Duration, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            let ms = limit.as_millis() as u64;
            warn!(operation, timeout_ms = ms, "Call exceeded its deadline");
            Err(Error::timeout(operation, ms))
        }
    }
}
