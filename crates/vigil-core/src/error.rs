//! Error types for vigil-core
//!
//! The taxonomy mirrors how the orchestrator reacts to a failure:
//! denials are terminal for the plan or action, transient failures are
//! retried with backoff, deviations park the task for a human.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Policy or rule violation
    #[error("validation denied: {0}")]
    ValidationDenied(String),

    /// Escalation exhausted without a definite answer; treated as a denial
    #[error("ambiguous decision: {0}")]
    Ambiguous(String),

    /// A registry, oracle, or store is temporarily unreachable
    #[error("transient failure: {0}")]
    TransientUnavailable(String),

    /// A bounded call exceeded its deadline
    #[error("{operation} timed out after {ms}ms")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Deadline in milliseconds
        ms: u64,
    },

    /// The executor diverged from the approved step
    #[error("deviation detected: {0}")]
    DeviationDetected(String),

    /// The planning oracle produced no usable plan
    #[error("planning error: {0}")]
    Planning(String),

    /// Requested entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Requested state transition is not allowed from the current state
    #[error("invalid transition from {from}: {reason}")]
    InvalidTransition {
        /// Current state name
        from: String,
        /// Why the transition was refused
        reason: String,
    },

    /// Caller supplied unusable input (empty goal, blank service name)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error (serialization, join failures)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the orchestrator should retry the failed call
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientUnavailable(_) | Self::Timeout { .. })
    }

    /// Whether a failed step execution is worth another attempt.
    ///
    /// Any unexpected executor failure counts; only errors that a retry
    /// cannot change are final.
    #[must_use]
    pub fn is_step_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Planning(_) | Self::InvalidInput(_) | Self::Configuration(_)
        )
    }

    /// Build a timeout error
    pub fn timeout(operation: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            ms,
        }
    }
}

impl From<vigil_llm::Error> for Error {
    fn from(e: vigil_llm::Error) -> Self {
        if e.is_transient() {
            Self::TransientUnavailable(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::ValidationDenied(reason) => format!("Request denied by policy: {}", reason),
            Error::Ambiguous(reason) => {
                format!("Policy check could not reach a decision: {}", reason)
            }
            Error::TransientUnavailable(what) => {
                format!("A dependency is temporarily unavailable: {}", what)
            }
            Error::Timeout { operation, ms } => {
                format!("{} did not answer within {}ms", operation, ms)
            }
            Error::DeviationDetected(reason) => {
                format!("Execution left the approved plan: {}", reason)
            }
            Error::Planning(msg) => format!("Planning failed: {}", msg),
            Error::NotFound(what) => format!("{} was not found", what),
            Error::InvalidTransition { from, reason } => {
                format!("Not allowed while {}: {}", from, reason)
            }
            Error::InvalidInput(msg) => format!("Invalid request: {}", msg),
            Error::Configuration(msg) => format!("Configuration error: {}", msg),
            Error::Internal(msg) => format!("Internal error: {}", msg),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::ValidationDenied(_) | Error::Ambiguous(_) => {
                Some("Rephrase the goal or replan the task with a narrower scope.".to_string())
            }
            Error::TransientUnavailable(_) | Error::Timeout { .. } => {
                Some("Check that the registry and peer services are running.".to_string())
            }
            Error::DeviationDetected(_) => {
                Some("Review the task history, then approve or replan it.".to_string())
            }
            Error::Planning(_) => {
                Some("Try breaking down your goal into smaller steps.".to_string())
            }
            Error::Configuration(_) => {
                Some("Check config/default.toml or the VIGIL_* environment variables.".to_string())
            }
            _ => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = error.user_message();
    if let Some(suggestion) = error.suggestion() {
        output.push_str("\n\n");
        output.push_str(&suggestion);
    }
    output
}
