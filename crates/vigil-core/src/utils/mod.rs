//! Utility modules for vigil-core
//!
//! - retry: bounded exponential backoff for transient failures
//! - timeout: deadline wrapper mapping elapsed calls to [`crate::Error::Timeout`]

mod retry;
mod timeout;

pub use retry::{retry_transient, retry_with_backoff, RetryConfig, RetryError};
pub use timeout::with_timeout;
