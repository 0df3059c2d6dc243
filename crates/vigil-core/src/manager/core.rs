//! Orchestrator core structure and public operations

use super::config::OrchestratorConfig;
use super::store::TaskStore;
use super::types::{Task, TaskStatus, TaskSummary};
use crate::capabilities::{
    PlanningOracle, PolicyGate, SharedAuditSink, SharedKillSwitch, StepRunner,
};
use crate::error::{Error, Result};
use crate::event_bus::{EventBus, VigilEvent};
use crate::overseer::{AuditEvent, AuditLevel};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Reason recorded when the kill switch blocks a task
pub const SYSTEM_HALTED: &str = "system halted";

/// Owns task state and drives each task in its own background job
pub struct Orchestrator {
    pub(crate) planner: Arc<dyn PlanningOracle>,
    pub(crate) gate: Arc<dyn PolicyGate>,
    pub(crate) runner: Arc<dyn StepRunner>,
    pub(crate) kill_switch: SharedKillSwitch,
    pub(crate) audit: Option<SharedAuditSink>,
    pub(crate) event_bus: Option<Arc<EventBus>>,
    pub(crate) config: OrchestratorConfig,
    pub(crate) tasks: TaskStore,
}

impl Orchestrator {
    /// Create a new orchestrator
    #[must_use]
    pub fn new(
        planner: Arc<dyn PlanningOracle>,
        gate: Arc<dyn PolicyGate>,
        runner: Arc<dyn StepRunner>,
        kill_switch: SharedKillSwitch,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            planner,
            gate,
            runner,
            kill_switch,
            audit: None,
            event_bus: None,
            config,
            tasks: TaskStore::default(),
        }
    }

    /// Emit transitions to the audit sink
    #[must_use]
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Publish lifecycle events on the bus
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Get a reference to the event bus (if set)
    #[must_use]
    pub fn event_bus(&self) -> Option<&Arc<EventBus>> {
        self.event_bus.as_ref()
    }

    /// Number of known tasks
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Create a task and start driving it. Returns the task id immediately.
    ///
    /// When the kill switch is engaged the task is recorded as `REJECTED`
    /// and no plan is requested.
    pub async fn submit(
        self: &Arc<Self>,
        goal: &str,
        context: Option<serde_json::Value>,
    ) -> Result<String> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(Error::InvalidInput("goal is empty".to_string()));
        }

        let task = Task::new(goal, context.unwrap_or(serde_json::Value::Null));
        let id = task.id.clone();
        let handle = self.tasks.insert(task);
        info!(task_id = %id, goal = %goal, "Task submitted");

        if self.kill_switch.is_halted() {
            let mut task = handle.lock().await;
            self.apply_transition(&mut task, TaskStatus::Rejected, Some(SYSTEM_HALTED.to_string()));
            return Ok(id);
        }

        self.spawn_driver(&id);
        Ok(id)
    }

    /// Snapshot of a task
    pub async fn status(&self, task_id: &str) -> Result<Task> {
        self.tasks.snapshot(task_id).await
    }

    /// Summaries of every task, most recently updated first
    pub async fn list(&self) -> Vec<TaskSummary> {
        self.tasks.list().await
    }

    /// Resume a paused task at exactly its stored step index
    pub async fn approve(self: &Arc<Self>, task_id: &str, note: Option<String>) -> Result<Task> {
        let handle = self.tasks.get(task_id)?;
        let snapshot = {
            let mut task = handle.lock().await;
            if !task.status.is_paused() {
                return Err(Error::InvalidTransition {
                    from: task.status.to_string(),
                    reason: "only PAUSED_DEVIATION or WAITING_APPROVAL tasks can be approved"
                        .to_string(),
                });
            }
            let reason = match note.as_deref().map(str::trim) {
                Some(n) if !n.is_empty() => format!("approved: {}", n),
                _ => "approved".to_string(),
            };
            task.pause_reason = None;
            self.apply_transition(&mut task, TaskStatus::Executing, Some(reason));
            task.clone()
        };

        info!(task_id = %task_id, step = snapshot.current_step_index, "Task approved, resuming");
        self.spawn_driver(task_id);
        Ok(snapshot)
    }

    /// Discard the plan and start over with `goal`, from any state
    pub async fn replan(self: &Arc<Self>, task_id: &str, goal: &str) -> Result<Task> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(Error::InvalidInput("goal is empty".to_string()));
        }
        let handle = self.tasks.get(task_id)?;
        let snapshot = {
            let mut task = handle.lock().await;
            task.goal = goal.to_string();
            task.plan.clear();
            task.current_step_index = 0;
            task.pause_reason = None;
            task.epoch += 1;
            self.apply_transition(&mut task, TaskStatus::Planning, Some("replan requested".to_string()));
            task.clone()
        };

        info!(task_id = %task_id, goal = %goal, "Task replanned");
        self.spawn_driver(task_id);
        Ok(snapshot)
    }

    /// Record a transition and publish it. Callers hold the task lock.
    pub(crate) fn apply_transition(&self, task: &mut Task, to: TaskStatus, reason: Option<String>) {
        let from = task.transition(to, reason.clone());
        if matches!(
            to,
            TaskStatus::Rejected | TaskStatus::Failed | TaskStatus::PausedDeviation | TaskStatus::WaitingApproval
        ) {
            task.pause_reason = reason.clone();
        }
        info!(
            task_id = %task.id,
            from = %from,
            to = %to,
            step = task.current_step_index,
            reason = reason.as_deref().unwrap_or(""),
            "Task transition"
        );

        if let Some(audit) = &self.audit {
            let level = match to {
                TaskStatus::Failed => AuditLevel::Error,
                TaskStatus::Rejected | TaskStatus::PausedDeviation | TaskStatus::WaitingApproval => {
                    AuditLevel::Warning
                }
                _ => AuditLevel::Info,
            };
            audit.emit(
                AuditEvent::new("manager", level, format!("{} -> {}", from, to))
                    .with_task(task.id.clone())
                    .with_context(json!({
                        "from": from,
                        "to": to,
                        "reason": reason,
                        "current_step_index": task.current_step_index,
                    })),
            );
        }
        if let Some(bus) = &self.event_bus {
            bus.publish(VigilEvent::TaskStateChanged {
                task_id: task.id.clone(),
                from,
                to,
                reason,
            });
        }
    }
}
