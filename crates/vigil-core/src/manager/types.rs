use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Created, not yet planned
    Pending,
    /// Waiting for the planning oracle
    Planning,
    /// Waiting for the decision engine to rule on the plan
    PlanValidating,
    /// Driving steps
    Executing,
    /// Every step completed
    Completed,
    /// Plan denied, or the system was halted at submission
    Rejected,
    /// A step deviated; waiting for a human
    PausedDeviation,
    /// An action was rejected; waiting for a human
    WaitingApproval,
    /// Unrecoverable error
    Failed,
}

impl TaskStatus {
    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Planning => "PLANNING",
            Self::PlanValidating => "PLAN_VALIDATING",
            Self::Executing => "EXECUTING",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
            Self::PausedDeviation => "PAUSED_DEVIATION",
            Self::WaitingApproval => "WAITING_APPROVAL",
            Self::Failed => "FAILED",
        }
    }

    /// States a background driver makes progress from
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Planning | Self::PlanValidating | Self::Executing
        )
    }

    /// States that wait for `approve`
    #[must_use]
    pub fn is_paused(&self) -> bool {
        matches!(self, Self::PausedDeviation | Self::WaitingApproval)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Previous state
    pub from: TaskStatus,
    /// New state
    pub to: TaskStatus,
    /// Why, when there is something to say
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When it happened
    pub at: DateTime<Utc>,
}

/// One goal-to-completion unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// `task-<uuid>`
    pub id: String,
    /// Goal being pursued
    pub goal: String,
    /// Caller-supplied planning context
    #[serde(default)]
    pub context: serde_json::Value,
    /// Current state
    pub status: TaskStatus,
    /// Step goals, in order
    pub plan: Vec<String>,
    /// Index of the next step to run
    pub current_step_index: usize,
    /// Reason for the latest pausing or terminal condition
    pub pause_reason: Option<String>,
    /// Every state change, oldest first
    pub history: Vec<Transition>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
    /// Bumped on replan; results computed under an older epoch are dropped
    #[serde(skip)]
    pub(crate) epoch: u64,
}

impl Task {
    /// New pending task with a fresh id
    #[must_use]
    pub fn new(goal: impl Into<String>, context: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: format!("task-{}", Uuid::new_v4()),
            goal: goal.into(),
            context,
            status: TaskStatus::Pending,
            plan: Vec::new(),
            current_step_index: 0,
            pause_reason: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            epoch: 0,
        }
    }

    /// Move to `to`, recording the change. Returns the previous state.
    pub(crate) fn transition(&mut self, to: TaskStatus, reason: Option<String>) -> TaskStatus {
        let from = self.status;
        let now = Utc::now();
        self.status = to;
        self.updated_at = now;
        self.history.push(Transition {
            from,
            to,
            reason,
            at: now,
        });
        from
    }

    /// Goal of the step at `current_step_index`
    #[must_use]
    pub fn current_step(&self) -> Option<&str> {
        self.plan.get(self.current_step_index).map(String::as_str)
    }

    /// Compact view for listings
    #[must_use]
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id.clone(),
            goal: self.goal.clone(),
            status: self.status,
            current_step_index: self.current_step_index,
            plan_len: self.plan.len(),
            pause_reason: self.pause_reason.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Listing row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    /// Task id
    pub id: String,
    /// Goal
    pub goal: String,
    /// Current state
    pub status: TaskStatus,
    /// Next step index
    pub current_step_index: usize,
    /// Number of plan steps
    pub plan_len: usize,
    /// Latest reason
    pub pause_reason: Option<String>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}
