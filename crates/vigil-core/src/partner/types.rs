use crate::capabilities::HistoryEntry;
use serde::{Deserialize, Serialize};

/// How a step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepOutcome {
    /// The reasoning oracle reported the goal satisfied
    StepCompleted,
    /// An action was denied, or unresolved by the fallback
    ActionRejected,
    /// A tool outcome went off-script, or the iteration bound ran out
    DeviationDetected,
}

impl StepOutcome {
    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StepCompleted => "STEP_COMPLETED",
            Self::ActionRejected => "ACTION_REJECTED",
            Self::DeviationDetected => "DEVIATION_DETECTED",
        }
    }
}

/// Report returned for one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Outcome
    pub outcome: StepOutcome,
    /// Why the step ended
    pub reason: String,
    /// Last tool observation, if any
    #[serde(default)]
    pub observation: Option<String>,
    /// Reasoning iterations used
    #[serde(default)]
    pub iterations: usize,
    /// (thought, action, observation) triples executed during the step
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl StepReport {
    fn new(outcome: StepOutcome, reason: impl Into<String>) -> Self {
        Self {
            outcome,
            reason: reason.into(),
            observation: None,
            iterations: 0,
            history: Vec::new(),
        }
    }

    /// Goal satisfied
    #[must_use]
    pub fn completed(reason: impl Into<String>) -> Self {
        Self::new(StepOutcome::StepCompleted, reason)
    }

    /// Action denied
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::new(StepOutcome::ActionRejected, reason)
    }

    /// Deviation from the step
    #[must_use]
    pub fn deviation(reason: impl Into<String>) -> Self {
        Self::new(StepOutcome::DeviationDetected, reason)
    }

    /// Attach the last observation
    #[must_use]
    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observation = Some(observation.into());
        self
    }

    /// Attach loop bookkeeping
    #[must_use]
    pub fn with_history(mut self, iterations: usize, history: Vec<HistoryEntry>) -> Self {
        self.iterations = iterations;
        self.history = history;
        self
    }
}
