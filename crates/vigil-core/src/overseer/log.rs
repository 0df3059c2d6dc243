use super::types::{AuditEvent, AuditLevel};
use crate::capabilities::AuditSink;
use crate::event_bus::{EventBus, VigilEvent};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Bounded in-memory audit trail
#[derive(Debug)]
pub struct AuditLog {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
    bus: Option<Arc<EventBus>>,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl AuditLog {
    /// Keep at most `capacity` events
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            bus: None,
        }
    }

    /// Republish every event on `bus`
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Up to `limit` most recent events, oldest first, optionally for one task
    #[must_use]
    pub fn recent(&self, limit: usize, task_id: Option<&str>) -> Vec<AuditEvent> {
        let events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut selected: Vec<AuditEvent> = events
            .iter()
            .rev()
            .filter(|e| task_id.is_none() || e.task_id.as_deref() == task_id)
            .take(limit)
            .cloned()
            .collect();
        selected.reverse();
        selected
    }

    /// Number of events held
    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether no events are held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for AuditLog {
    fn emit(&self, event: AuditEvent) {
        let task = event.task_id.as_deref().unwrap_or("-");
        match event.level {
            AuditLevel::Debug => debug!(service = %event.service, task_id = %task, "{}", event.message),
            AuditLevel::Info => info!(service = %event.service, task_id = %task, "{}", event.message),
            AuditLevel::Warning => warn!(service = %event.service, task_id = %task, "{}", event.message),
            AuditLevel::Error => error!(service = %event.service, task_id = %task, "{}", event.message),
        }

        {
            let mut events = self
                .events
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if events.len() >= self.capacity {
                events.pop_front();
            }
            events.push_back(event.clone());
        }

        if let Some(bus) = &self.bus {
            bus.publish(VigilEvent::Audit { event });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let log = AuditLog::new(3);
        for i in 0..5 {
            log.emit(AuditEvent::info("manager", format!("event {i}")));
        }
        let recent = log.recent(10, None);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].message, "event 2");
        assert_eq!(recent[2].message, "event 4");
    }

    #[test]
    fn test_recent_filters_by_task() {
        let log = AuditLog::default();
        log.emit(AuditEvent::info("manager", "a").with_task("task-1"));
        log.emit(AuditEvent::warning("guardian", "b").with_task("task-2"));
        log.emit(AuditEvent::info("manager", "c").with_task("task-1"));

        let only = log.recent(10, Some("task-1"));
        assert_eq!(only.len(), 2);
        assert_eq!(only[1].message, "c");
        assert_eq!(log.recent(1, None)[0].message, "c");
    }

    #[test]
    fn test_level_serializes_uppercase() {
        let event = AuditEvent::warning("guardian", "denied");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["level"], "WARNING");
        assert!(json.get("task_id").is_none());
    }
}
