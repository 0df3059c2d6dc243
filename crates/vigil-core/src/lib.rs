//! Vigil Core - Orchestration and Policy-Validation Engine
//!
//! This crate provides the engine behind Vigil, including:
//! - Registry: TTL-based service directory with lazy expiry
//! - Guardian: two-tier decision engine (deterministic rules, semantic fallback)
//! - Partner: bounded reason-validate-act-observe loop per plan step
//! - Manager: task lifecycle state machine with pause, resume and replan
//! - Overseer: audit log and the process-wide kill switch
//! - Oracle: LLM-backed planning, reasoning and classification
//! - Capabilities: the traits every external collaborator is consumed through
//! - Utils: bounded retry and deadline helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capabilities;
pub mod error;
pub mod event_bus;
pub mod guardian;
pub mod manager;
pub mod oracle;
pub mod overseer;
pub mod partner;
pub mod registry;
pub mod utils;

pub use capabilities::{
    AuditSink, Classification, HistoryEntry, KillSwitch, KnowledgeStore, MemoryEntry,
    PlanningOracle, PolicyClassifier, PolicyGate, PolicySnippet, Proposal, ProposedAction,
    ReasoningOracle, SearchHit, SharedAuditSink, SharedKillSwitch, SharedKnowledgeStore,
    StepRunner, ToolDescriptor, ToolExecutor, ToolOutcome,
};
pub use error::{Error, Result, UserFriendlyError};
pub use event_bus::{EventBus, VigilEvent};
pub use guardian::{
    Decision, DecisionEngine, DecisionKind, GuardianConfig, ThreatLevel, ToolRule,
};
pub use manager::{Orchestrator, OrchestratorConfig, Task, TaskStatus, TaskSummary, Transition};
pub use oracle::{LlmOracle, OracleConfig};
pub use overseer::{AuditEvent, AuditLevel, AuditLog, KillStatus, LocalKillSwitch};
pub use partner::{ExecutorConfig, StepExecutor, StepOutcome, StepReport};
pub use registry::{
    discover_with_retry, spawn_heartbeat, Discovery, HeartbeatConfig, Registrar, RegistryConfig,
    ServiceRecord, ServiceRegistry,
};
pub use utils::{retry_transient, retry_with_backoff, with_timeout, RetryConfig, RetryError};
