//! Capability seams
//!
//! Everything the engine consumes from the outside world is expressed as a
//! trait here: the planning and reasoning oracles, the knowledge store, tool
//! execution, the kill switch and the audit sink. The engine's own
//! components are also reachable through traits ([`PolicyGate`],
//! [`StepRunner`]) so the orchestrator can drive in-process or remote peers.

use crate::error::Result;
use crate::guardian::{Decision, DecisionKind};
use crate::overseer::AuditEvent;
use crate::partner::StepReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Shared data types
// ============================================================================

/// A policy statement served by the knowledge store.
///
/// `Disallow: <phrase>` texts are violation rules; anything else is advisory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnippet {
    /// Policy text
    pub text: String,
    /// Where the policy came from
    #[serde(default)]
    pub source: String,
    /// Relative weight in `[0, 1]`
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl PolicySnippet {
    /// Snippet with full weight
    #[must_use]
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            weight: 1.0,
        }
    }

    /// Override the weight
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// A tool the executor may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, as proposed by the reasoning oracle
    pub name: String,
    /// What the tool does
    #[serde(default)]
    pub description: String,
    /// Parameter schema or example
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl ToolDescriptor {
    /// Descriptor without a parameter schema
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::Value::Null,
        }
    }
}

/// One reasoning-loop record, appended to the knowledge store per task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Owning task
    pub task_id: String,
    /// Oracle's reasoning for the action
    pub thought: String,
    /// Action text that was executed
    pub action: String,
    /// Observed result
    pub observation: String,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
}

/// Ranked knowledge-store search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Snippet text
    pub text: String,
    /// Origin (runbook, policy, memory)
    pub source: String,
    /// Relevance score, higher is better
    pub score: f64,
}

/// An action proposed by the reasoning oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    /// Tool to invoke
    pub tool: String,
    /// Tool arguments
    #[serde(default)]
    pub input: serde_json::Value,
    /// Oracle's stated reasoning
    #[serde(default)]
    pub thought: String,
}

impl ProposedAction {
    /// Build an action
    #[must_use]
    pub fn new(tool: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            tool: tool.into(),
            input,
            thought: String::new(),
        }
    }

    /// Attach the oracle's reasoning
    #[must_use]
    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = thought.into();
        self
    }

    /// Text used for rule matching and deviation scoring: the tool name
    /// followed by every scalar value in the input.
    #[must_use]
    pub fn text(&self) -> String {
        let mut parts = vec![self.tool.clone()];
        flatten_scalars(&self.input, &mut parts);
        parts.join(" ")
    }
}

fn flatten_scalars(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => out.push(s.clone()),
        serde_json::Value::Number(n) => out.push(n.to_string()),
        serde_json::Value::Bool(b) => out.push(b.to_string()),
        serde_json::Value::Array(items) => {
            for item in items {
                flatten_scalars(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            for v in map.values() {
                flatten_scalars(v, out);
            }
        }
        serde_json::Value::Null => {}
    }
}

/// Reasoning oracle answer
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    /// Take this action next
    Action(ProposedAction),
    /// The step goal is already met
    Satisfied {
        /// Oracle's closing reasoning
        thought: String,
    },
}

/// Prior (thought, action, observation) triple for the current step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Oracle reasoning
    pub thought: String,
    /// Action text
    pub action: String,
    /// Observed result
    pub observation: String,
}

/// Result of executing a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolOutcome {
    /// Tool ran as intended
    Success {
        /// Tool output
        observation: String,
    },
    /// Tool ran but the result departs from the plan
    Deviation {
        /// What went off-script
        observation: String,
    },
    /// Tool failed
    Error {
        /// Failure description
        observation: String,
    },
}

impl ToolOutcome {
    /// Observation carried by any outcome
    #[must_use]
    pub fn observation(&self) -> &str {
        match self {
            Self::Success { observation }
            | Self::Deviation { observation }
            | Self::Error { observation } => observation,
        }
    }

    /// Whether the outcome lets the loop continue
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Oracle fallback classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Allow, Deny or Ambiguous
    pub decision: DecisionKind,
    /// Oracle's justification
    #[serde(default)]
    pub reason: String,
}

// ============================================================================
// External capabilities
// ============================================================================

/// Turns a goal into an ordered list of step goals
#[async_trait::async_trait]
pub trait PlanningOracle: Send + Sync {
    /// Generate a plan; fails with [`crate::Error::Planning`] on unusable output
    async fn generate_plan(&self, goal: &str, context: &serde_json::Value) -> Result<Vec<String>>;
}

/// Proposes the next action for a step
#[async_trait::async_trait]
pub trait ReasoningOracle: Send + Sync {
    /// Propose an action, or report the goal satisfied
    async fn propose_action(
        &self,
        goal: &str,
        tools: &[ToolDescriptor],
        history: &[HistoryEntry],
    ) -> Result<Proposal>;
}

/// Semantic fallback for the decision engine
#[async_trait::async_trait]
pub trait PolicyClassifier: Send + Sync {
    /// Classify `subject` against the top-matching policy snippets
    async fn classify(&self, subject: &str, snippets: &[PolicySnippet]) -> Result<Classification>;
}

/// Policies, tools, runbooks and per-task memory
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Policies relevant to `context`
    async fn get_policies(&self, context: &str) -> Result<Vec<PolicySnippet>>;

    /// Current tool catalog
    async fn get_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Append a memory entry (best-effort for callers)
    async fn append_memory(&self, entry: MemoryEntry) -> Result<()>;

    /// Ranked similarity search
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

/// Executes tool actions, possibly simulated or sandboxed
#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute an action; transport failures surface as `Err`
    async fn execute(&self, task_id: &str, action: &ProposedAction) -> Result<ToolOutcome>;
}

/// Process-wide halt flag
pub trait KillSwitch: Send + Sync {
    /// Whether new tasks and steps are blocked
    fn is_halted(&self) -> bool;

    /// Set or clear the halt flag, with an optional operator note
    fn set_halted(&self, halted: bool, note: Option<String>);
}

/// Fire-and-forget audit sink
pub trait AuditSink: Send + Sync {
    /// Record an event; never fails the caller
    fn emit(&self, event: AuditEvent);
}

// ============================================================================
// Engine seams
// ============================================================================

/// Decision engine as seen by its callers
#[async_trait::async_trait]
pub trait PolicyGate: Send + Sync {
    /// Validate a whole plan
    async fn validate_plan(&self, task_id: &str, plan: &[String]) -> Result<Decision>;

    /// Validate one proposed action against its step goal
    async fn validate_action(
        &self,
        task_id: &str,
        step_goal: &str,
        action: &ProposedAction,
    ) -> Result<Decision>;
}

/// Step executor as seen by the orchestrator
#[async_trait::async_trait]
pub trait StepRunner: Send + Sync {
    /// Run the reasoning loop for one step
    async fn run_step(&self, task_id: &str, step_goal: &str) -> Result<StepReport>;
}

/// Shared handles
pub type SharedKnowledgeStore = Arc<dyn KnowledgeStore>;
/// Shared audit sink
pub type SharedAuditSink = Arc<dyn AuditSink>;
/// Shared kill switch
pub type SharedKillSwitch = Arc<dyn KillSwitch>;
