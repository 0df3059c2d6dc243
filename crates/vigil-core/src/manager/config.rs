//! Orchestrator configuration

use crate::utils::RetryConfig;
use std::time::Duration;

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Deadline for the planning oracle
    pub planning_timeout: Duration,
    /// Deadline for plan validation
    pub validation_timeout: Duration,
    /// Deadline for one step, reasoning loop included
    pub step_timeout: Duration,
    /// Backoff for transient failures; `max_attempts` bounds step retries
    pub retry: RetryConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            planning_timeout: Duration::from_secs(60),
            validation_timeout: Duration::from_secs(30),
            step_timeout: Duration::from_secs(300),
            retry: RetryConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the planning deadline
    #[must_use]
    pub fn with_planning_timeout(mut self, timeout: Duration) -> Self {
        self.planning_timeout = timeout;
        self
    }

    /// Set the plan validation deadline
    #[must_use]
    pub fn with_validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout = timeout;
        self
    }

    /// Set the per-step deadline
    #[must_use]
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}
