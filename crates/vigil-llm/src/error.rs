//! Error types for vigil-llm

use thiserror::Error;

/// LLM error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// API error
    #[error("api error: {0}")]
    Api(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimit,

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Scripted provider ran out of responses
    #[error("mock provider exhausted")]
    Exhausted,
}

impl Error {
    /// Whether the failure is worth retrying
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network(_) | Self::Timeout(_) | Self::Exhausted
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
