use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of an audit event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditLevel {
    /// Diagnostic detail
    Debug,
    /// Normal progress
    #[default]
    Info,
    /// Denials, deviations, degraded dependencies
    Warning,
    /// Failures
    Error,
}

/// A structured audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Emitting component
    pub service: String,
    /// Related task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Severity
    #[serde(default)]
    pub level: AuditLevel,
    /// Human-readable message
    pub message: String,
    /// Structured details
    #[serde(default)]
    pub context: serde_json::Value,
    /// When the event happened
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an event stamped now
    #[must_use]
    pub fn new(service: impl Into<String>, level: AuditLevel, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            task_id: None,
            level,
            message: message.into(),
            context: serde_json::Value::Null,
            timestamp: Utc::now(),
        }
    }

    /// Info-level event
    #[must_use]
    pub fn info(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, AuditLevel::Info, message)
    }

    /// Warning-level event
    #[must_use]
    pub fn warning(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, AuditLevel::Warning, message)
    }

    /// Error-level event
    #[must_use]
    pub fn error(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, AuditLevel::Error, message)
    }

    /// Attach a task id
    #[must_use]
    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Attach structured context
    #[must_use]
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

/// Kill switch state as reported to operators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KillStatus {
    /// Whether new tasks and steps are blocked
    pub halted: bool,
    /// Note given with the last change
    pub note: Option<String>,
    /// When the flag last changed
    pub changed_at: Option<DateTime<Utc>>,
}
