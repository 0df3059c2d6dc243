//! EventBus - broadcast channel for live task and audit events.
//!
//! The orchestrator publishes lifecycle events as they happen and the
//! overseer republishes audit events, so dashboards and tests can follow a
//! task without polling its status.

use crate::manager::TaskStatus;
use crate::overseer::AuditEvent;
use crate::partner::StepOutcome;
use serde::Serialize;
use tokio::sync::broadcast;

/// Events published while tasks run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VigilEvent {
    /// A task moved between states
    TaskStateChanged {
        /// Task identifier
        task_id: String,
        /// Previous status
        from: TaskStatus,
        /// New status
        to: TaskStatus,
        /// Reason, when the new state records one
        reason: Option<String>,
    },
    /// The executor was handed a step
    StepStarted {
        /// Task identifier
        task_id: String,
        /// Zero-based step index
        step_index: usize,
        /// Step goal
        goal: String,
    },
    /// The executor reported back
    StepFinished {
        /// Task identifier
        task_id: String,
        /// Zero-based step index
        step_index: usize,
        /// Reported outcome
        outcome: StepOutcome,
    },
    /// An audit record was emitted
    Audit {
        /// The record
        event: AuditEvent,
    },
    /// The kill switch changed
    KillSwitchChanged {
        /// New flag value
        halted: bool,
        /// Operator note
        note: Option<String>,
    },
}

impl VigilEvent {
    /// Task the event belongs to, if any
    #[must_use]
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskStateChanged { task_id, .. }
            | Self::StepStarted { task_id, .. }
            | Self::StepFinished { task_id, .. } => Some(task_id),
            Self::Audit { event } => event.task_id.as_deref(),
            Self::KillSwitchChanged { .. } => None,
        }
    }
}

/// Broadcast-based event bus.
///
/// Slow subscribers see `RecvError::Lagged` rather than blocking publishers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<VigilEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<VigilEvent> {
        self.sender.subscribe()
    }

    /// Publish to all subscribers; returns how many received it.
    pub fn publish(&self, event: VigilEvent) -> usize {
        // no receivers is not an error
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(VigilEvent::TaskStateChanged {
            task_id: "task-1".into(),
            from: TaskStatus::Pending,
            to: TaskStatus::Planning,
            reason: None,
        });
        bus.publish(VigilEvent::StepStarted {
            task_id: "task-1".into(),
            step_index: 0,
            goal: "check connectivity".into(),
        });

        match rx.recv().await.unwrap() {
            VigilEvent::TaskStateChanged { to, .. } => assert_eq!(to, TaskStatus::Planning),
            other => panic!("expected TaskStateChanged, got: {:?}", other),
        }
        let next = rx.recv().await.unwrap();
        assert_eq!(next.task_id(), Some("task-1"));
    }

    #[test]
    fn test_publish_no_subscribers() {
        let bus = EventBus::new(4);
        let count = bus.publish(VigilEvent::KillSwitchChanged {
            halted: true,
            note: None,
        });
        assert_eq!(count, 0);
    }

    #[test]
    fn test_event_serialization() {
        let event = VigilEvent::StepFinished {
            task_id: "task-1".into(),
            step_index: 2,
            outcome: StepOutcome::ActionRejected,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"step_finished\""));
        assert!(json.contains("\"outcome\":\"ACTION_REJECTED\""));
    }
}
