//! Background driver: advances one task through its state machine.

use super::core::{Orchestrator, SYSTEM_HALTED};
use super::types::{Task, TaskStatus};
use crate::error::Error;
use crate::event_bus::VigilEvent;
use crate::guardian::DecisionKind;
use crate::partner::StepOutcome;
use crate::utils::{retry_transient, retry_with_backoff, with_timeout};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Whether the driver should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

impl Orchestrator {
    pub(crate) fn spawn_driver(self: &Arc<Self>, task_id: &str) {
        let this = Arc::clone(self);
        let task_id = task_id.to_string();
        tokio::spawn(async move { this.drive(task_id).await });
    }

    /// Single-flight loop. A driver that cannot claim the task exits; the
    /// claim holder re-checks the status after releasing, so a resume that
    /// lands during release is never lost.
    async fn drive(self: Arc<Self>, task_id: String) {
        loop {
            let Some(claim) = self.tasks.try_claim(&task_id) else {
                debug!(task_id = %task_id, "Driver already running");
                return;
            };
            while self.advance(&task_id).await == Flow::Continue {}
            drop(claim);

            match self.tasks.snapshot(&task_id).await {
                Ok(task) if task.status.is_active() => continue,
                _ => return,
            }
        }
    }

    async fn advance(&self, task_id: &str) -> Flow {
        let Ok(task) = self.tasks.snapshot(task_id).await else {
            return Flow::Stop;
        };
        match task.status {
            TaskStatus::Pending => self.start(task).await,
            TaskStatus::Planning => self.request_plan(task).await,
            TaskStatus::PlanValidating => self.validate_plan(task).await,
            TaskStatus::Executing => self.execute_next_step(task).await,
            _ => Flow::Stop,
        }
    }

    /// Apply `f` under the task lock unless a replan happened meanwhile.
    async fn commit<F>(&self, task_id: &str, epoch: u64, f: F) -> Flow
    where
        F: FnOnce(&mut Task) -> Flow,
    {
        let Ok(handle) = self.tasks.get(task_id) else {
            return Flow::Stop;
        };
        let mut task = handle.lock().await;
        if task.epoch != epoch {
            debug!(task_id = %task_id, "Task replanned while in flight, dropping stale result");
            return Flow::Continue;
        }
        f(&mut task)
    }

    async fn start(&self, task: Task) -> Flow {
        let halted = self.kill_switch.is_halted();
        self.commit(&task.id, task.epoch, |t| {
            if halted {
                self.apply_transition(t, TaskStatus::Rejected, Some(SYSTEM_HALTED.to_string()));
                Flow::Stop
            } else {
                self.apply_transition(t, TaskStatus::Planning, None);
                Flow::Continue
            }
        })
        .await
    }

    #[instrument(skip(self, task), fields(task_id = %task.id))]
    async fn request_plan(&self, task: Task) -> Flow {
        let result = retry_transient(&self.config.retry, || {
            with_timeout(
                "plan generation",
                self.config.planning_timeout,
                self.planner.generate_plan(&task.goal, &task.context),
            )
        })
        .await;

        match result {
            Ok(steps) => {
                let steps: Vec<String> = steps
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                self.commit(&task.id, task.epoch, |t| {
                    if steps.is_empty() {
                        self.apply_transition(
                            t,
                            TaskStatus::Failed,
                            Some("planning oracle returned an empty plan".to_string()),
                        );
                        return Flow::Stop;
                    }
                    t.plan = steps;
                    t.current_step_index = 0;
                    self.apply_transition(t, TaskStatus::PlanValidating, None);
                    Flow::Continue
                })
                .await
            }
            Err(e) => {
                warn!(error = %e.last_error, attempts = e.attempts, "Planning failed");
                let reason = format!("planning failed: {}", e.last_error);
                self.commit(&task.id, task.epoch, |t| {
                    self.apply_transition(t, TaskStatus::Failed, Some(reason));
                    Flow::Stop
                })
                .await
            }
        }
    }

    #[instrument(skip(self, task), fields(task_id = %task.id, steps = task.plan.len()))]
    async fn validate_plan(&self, task: Task) -> Flow {
        let result = retry_transient(&self.config.retry, || {
            with_timeout(
                "plan validation",
                self.config.validation_timeout,
                self.gate.validate_plan(&task.id, &task.plan),
            )
        })
        .await;

        self.commit(&task.id, task.epoch, |t| match result {
            Ok(decision) => match decision.decision {
                DecisionKind::Allow => {
                    let note = (!decision.warnings.is_empty())
                        .then(|| format!("plan allowed with warnings: {}", decision.warnings.join("; ")));
                    self.apply_transition(t, TaskStatus::Executing, note);
                    Flow::Continue
                }
                DecisionKind::Deny => {
                    self.apply_transition(t, TaskStatus::Rejected, Some(decision.reason));
                    Flow::Stop
                }
                DecisionKind::Ambiguous => {
                    self.apply_transition(
                        t,
                        TaskStatus::Rejected,
                        Some(format!("ambiguous: {}", decision.reason)),
                    );
                    Flow::Stop
                }
            },
            Err(e) => {
                self.apply_transition(
                    t,
                    TaskStatus::Failed,
                    Some(format!("plan validation failed: {}", e.last_error)),
                );
                Flow::Stop
            }
        })
        .await
    }

    #[instrument(skip(self, task), fields(task_id = %task.id, step = task.current_step_index))]
    async fn execute_next_step(&self, task: Task) -> Flow {
        let index = task.current_step_index;
        let Some(goal) = task.current_step().map(str::to_string) else {
            return self
                .commit(&task.id, task.epoch, |t| {
                    self.apply_transition(t, TaskStatus::Completed, Some("all steps completed".to_string()));
                    Flow::Stop
                })
                .await;
        };

        // step boundary; in-flight steps are never preempted
        if self.kill_switch.is_halted() {
            return self
                .commit(&task.id, task.epoch, |t| {
                    self.apply_transition(t, TaskStatus::WaitingApproval, Some(SYSTEM_HALTED.to_string()));
                    Flow::Stop
                })
                .await;
        }

        self.publish(VigilEvent::StepStarted {
            task_id: task.id.clone(),
            step_index: index,
            goal: goal.clone(),
        });

        let result = retry_with_backoff(
            &self.config.retry,
            || {
                with_timeout(
                    "step execution",
                    self.config.step_timeout,
                    self.runner.run_step(&task.id, &goal),
                )
            },
            Error::is_step_retryable,
        )
        .await;

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e.last_error, attempts = e.attempts, "Step failed");
                let reason = format!(
                    "step {} failed after {} attempt(s): {}",
                    index, e.attempts, e.last_error
                );
                return self
                    .commit(&task.id, task.epoch, |t| {
                        self.apply_transition(t, TaskStatus::Failed, Some(reason));
                        Flow::Stop
                    })
                    .await;
            }
        };

        self.publish(VigilEvent::StepFinished {
            task_id: task.id.clone(),
            step_index: index,
            outcome: report.outcome,
        });

        self.commit(&task.id, task.epoch, |t| match report.outcome {
            StepOutcome::StepCompleted => {
                t.current_step_index = index + 1;
                t.updated_at = Utc::now();
                if t.current_step_index >= t.plan.len() {
                    self.apply_transition(t, TaskStatus::Completed, Some("all steps completed".to_string()));
                    Flow::Stop
                } else {
                    Flow::Continue
                }
            }
            StepOutcome::DeviationDetected => {
                self.apply_transition(t, TaskStatus::PausedDeviation, Some(report.reason));
                Flow::Stop
            }
            StepOutcome::ActionRejected => {
                self.apply_transition(t, TaskStatus::WaitingApproval, Some(report.reason));
                Flow::Stop
            }
        })
        .await
    }

    fn publish(&self, event: VigilEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}
