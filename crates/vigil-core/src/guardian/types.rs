use crate::capabilities::{PolicySnippet, ProposedAction};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final outcome of a validation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    /// Safe to proceed
    Allow,
    /// Blocked by a rule, a policy, or the fallback
    Deny,
    /// No definite answer; callers treat this as a denial
    Ambiguous,
}

impl DecisionKind {
    /// Display name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
            Self::Ambiguous => "Ambiguous",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision returned by the engine. Not persisted; the audit sink keeps a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Allow, Deny or Ambiguous
    pub decision: DecisionKind,
    /// Human-readable reason
    pub reason: String,
    /// Non-blocking findings, in the order they were raised
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Best policy match score, when one was computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Decision {
    fn new(decision: DecisionKind, reason: impl Into<String>) -> Self {
        Self {
            decision,
            reason: reason.into(),
            warnings: Vec::new(),
            score: None,
        }
    }

    /// An allow decision
    #[must_use]
    pub fn allow(reason: impl Into<String>) -> Self {
        Self::new(DecisionKind::Allow, reason)
    }

    /// A deny decision
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::new(DecisionKind::Deny, reason)
    }

    /// An ambiguous decision
    #[must_use]
    pub fn ambiguous(reason: impl Into<String>) -> Self {
        Self::new(DecisionKind::Ambiguous, reason)
    }

    /// Attach warnings
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Attach a score
    #[must_use]
    pub fn with_score(mut self, score: Option<f64>) -> Self {
        self.score = score;
        self
    }

    /// Only an explicit `Allow` lets work proceed
    #[must_use]
    pub fn is_allow(&self) -> bool {
        self.decision == DecisionKind::Allow
    }
}

/// Result of a single evaluator in the chain
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Stop and allow
    Allow(String),
    /// Stop and deny
    Deny(String),
    /// Stop without a definite answer
    Ambiguous(String),
    /// Defer to the next evaluator
    Pass,
}

/// What is being validated
#[derive(Debug, Clone)]
pub enum Subject {
    /// A whole plan
    Plan {
        /// Step goals in order
        steps: Vec<String>,
    },
    /// A single action within a step
    Action {
        /// Goal of the step the action belongs to
        step_goal: String,
        /// The proposed action
        action: ProposedAction,
    },
}

impl Subject {
    /// Texts scanned by the rule and policy passes
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        match self {
            Self::Plan { steps } => steps.clone(),
            Self::Action { action, .. } => vec![action.text()],
        }
    }

    /// Single-line rendering used for policy lookups and the fallback prompt
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Plan { steps } => steps.join("; "),
            Self::Action { step_goal, action } => {
                format!("step '{}': {}", step_goal, action.text())
            }
        }
    }
}

/// Review-band match handed to the fallback evaluator
#[derive(Debug, Clone)]
pub struct Escalation {
    /// Best policy score that triggered the escalation
    pub score: f64,
    /// Top-matching snippets, best first
    pub snippets: Vec<PolicySnippet>,
}
