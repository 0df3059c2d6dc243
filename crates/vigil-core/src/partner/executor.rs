use super::types::{StepOutcome, StepReport};
use crate::capabilities::{
    HistoryEntry, MemoryEntry, PolicyGate, Proposal, ReasoningOracle, SharedAuditSink,
    SharedKnowledgeStore, StepRunner, ToolDescriptor, ToolExecutor,
};
use crate::error::{Error, Result};
use crate::overseer::AuditEvent;
use crate::utils::with_timeout;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Reason reported when the loop bound runs out
pub const ITERATION_LIMIT_EXCEEDED: &str = "iteration limit exceeded";

/// Step executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Upper bound on reasoning iterations per step
    pub max_iterations: usize,
    /// History entries passed back to the reasoning oracle
    pub history_window: usize,
    /// Deadline for the tool catalog fetch
    pub catalog_timeout: Duration,
    /// Deadline for one reasoning call
    pub reasoning_timeout: Duration,
    /// Deadline for one validation call
    pub validation_timeout: Duration,
    /// Deadline for one tool execution
    pub tool_timeout: Duration,
    /// Deadline for a memory append
    pub memory_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 6,
            history_window: 3,
            catalog_timeout: Duration::from_secs(5),
            reasoning_timeout: Duration::from_secs(60),
            validation_timeout: Duration::from_secs(30),
            tool_timeout: Duration::from_secs(120),
            memory_timeout: Duration::from_secs(5),
        }
    }
}

impl ExecutorConfig {
    /// Create with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the iteration bound (at least 1)
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Set the history window
    #[must_use]
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Set the reasoning deadline
    #[must_use]
    pub fn with_reasoning_timeout(mut self, timeout: Duration) -> Self {
        self.reasoning_timeout = timeout;
        self
    }

    /// Set the tool execution deadline
    #[must_use]
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }
}

/// Runs one plan step against the reasoning oracle, the decision engine
/// and the tool executor.
pub struct StepExecutor {
    store: SharedKnowledgeStore,
    oracle: Arc<dyn ReasoningOracle>,
    gate: Arc<dyn PolicyGate>,
    tools: Arc<dyn ToolExecutor>,
    audit: Option<SharedAuditSink>,
    config: ExecutorConfig,
}

impl StepExecutor {
    /// Create an executor
    #[must_use]
    pub fn new(
        store: SharedKnowledgeStore,
        oracle: Arc<dyn ReasoningOracle>,
        gate: Arc<dyn PolicyGate>,
        tools: Arc<dyn ToolExecutor>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            store,
            oracle,
            gate,
            tools,
            audit: None,
            config,
        }
    }

    /// Emit step outcomes to `audit`
    #[must_use]
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Run the loop for `step_goal`.
    ///
    /// Transient failures of the catalog, oracle, engine or tool executor
    /// surface as `Err` so the orchestrator can retry the step.
    #[instrument(skip(self), fields(max_iterations = self.config.max_iterations))]
    pub async fn execute_step(&self, task_id: &str, step_goal: &str) -> Result<StepReport> {
        let catalog = with_timeout(
            "tool catalog",
            self.config.catalog_timeout,
            self.store.get_tools(),
        )
        .await?;
        if catalog.is_empty() {
            return Err(Error::TransientUnavailable("no tools available".to_string()));
        }

        let report = self.reasoning_loop(task_id, step_goal, &catalog).await?;
        info!(
            task_id = %task_id,
            outcome = report.outcome.as_str(),
            iterations = report.iterations,
            reason = %report.reason,
            "Step finished"
        );
        if let Some(audit) = &self.audit {
            let event = match report.outcome {
                StepOutcome::StepCompleted => {
                    AuditEvent::info("partner", format!("step completed: {}", step_goal))
                }
                _ => AuditEvent::warning(
                    "partner",
                    format!("step {}: {}", report.outcome.as_str(), report.reason),
                ),
            };
            audit.emit(event.with_task(task_id).with_context(json!({
                "step_goal": step_goal,
                "outcome": report.outcome,
                "iterations": report.iterations,
                "observation": report.observation,
            })));
        }
        Ok(report)
    }

    async fn reasoning_loop(
        &self,
        task_id: &str,
        step_goal: &str,
        catalog: &[ToolDescriptor],
    ) -> Result<StepReport> {
        let mut history: Vec<HistoryEntry> = Vec::new();
        let mut last_observation: Option<String> = None;

        for iteration in 1..=self.config.max_iterations {
            let window_start = history.len().saturating_sub(self.config.history_window);
            let proposal = with_timeout(
                "reasoning",
                self.config.reasoning_timeout,
                self.oracle
                    .propose_action(step_goal, catalog, &history[window_start..]),
            )
            .await?;

            let action = match proposal {
                Proposal::Satisfied { thought } => {
                    let reason = if thought.trim().is_empty() {
                        "goal satisfied".to_string()
                    } else {
                        thought
                    };
                    let report = StepReport::completed(reason).with_history(iteration, history);
                    return Ok(match last_observation {
                        Some(obs) => report.with_observation(obs),
                        None => report,
                    });
                }
                Proposal::Action(action) => action,
            };
            debug!(task_id = %task_id, iteration, tool = %action.tool, "Action proposed");

            if !catalog.iter().any(|t| t.name == action.tool) {
                return Ok(StepReport::rejected(format!("unknown tool '{}'", action.tool))
                    .with_history(iteration, history));
            }

            let decision = with_timeout(
                "action validation",
                self.config.validation_timeout,
                self.gate.validate_action(task_id, step_goal, &action),
            )
            .await;
            let decision = match decision {
                Ok(d) => d,
                Err(e) if e.is_transient() => return Err(e),
                Err(e) => {
                    return Ok(StepReport::rejected(e.to_string()).with_history(iteration, history))
                }
            };
            if !decision.is_allow() {
                return Ok(StepReport::rejected(decision.reason).with_history(iteration, history));
            }

            let outcome = with_timeout(
                "tool execution",
                self.config.tool_timeout,
                self.tools.execute(task_id, &action),
            )
            .await?;
            let observation = outcome.observation().to_string();
            if !outcome.is_success() {
                return Ok(StepReport::deviation(observation.clone())
                    .with_observation(observation)
                    .with_history(iteration, history));
            }

            let action_text = action.text();
            self.memorize(task_id, &action.thought, &action_text, &observation)
                .await;
            history.push(HistoryEntry {
                thought: action.thought,
                action: action_text,
                observation: observation.clone(),
            });
            last_observation = Some(observation);
        }

        let iterations = self.config.max_iterations;
        let report = StepReport::deviation(ITERATION_LIMIT_EXCEEDED).with_history(iterations, history);
        Ok(match last_observation {
            Some(obs) => report.with_observation(obs),
            None => report,
        })
    }

    /// Best-effort; failures are logged and the loop continues
    async fn memorize(&self, task_id: &str, thought: &str, action: &str, observation: &str) {
        let entry = MemoryEntry {
            task_id: task_id.to_string(),
            thought: thought.to_string(),
            action: action.to_string(),
            observation: observation.to_string(),
            timestamp: Utc::now(),
        };
        let result = with_timeout(
            "memory append",
            self.config.memory_timeout,
            self.store.append_memory(entry),
        )
        .await;
        if let Err(e) = result {
            warn!(task_id = %task_id, error = %e, "Failed to record memory, continuing");
        }
    }
}

#[async_trait::async_trait]
impl StepRunner for StepExecutor {
    async fn run_step(&self, task_id: &str, step_goal: &str) -> Result<StepReport> {
        self.execute_step(task_id, step_goal).await
    }
}
