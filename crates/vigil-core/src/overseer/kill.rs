use super::types::KillStatus;
use crate::capabilities::KillSwitch;
use crate::event_bus::{EventBus, VigilEvent};
use chrono::Utc;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// In-process kill switch
#[derive(Debug, Default)]
pub struct LocalKillSwitch {
    state: RwLock<KillStatus>,
    bus: Option<Arc<EventBus>>,
}

impl LocalKillSwitch {
    /// Create, not halted
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish changes on `bus`
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Current state
    #[must_use]
    pub fn status(&self) -> KillStatus {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl KillSwitch for LocalKillSwitch {
    fn is_halted(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .halted
    }

    fn set_halted(&self, halted: bool, note: Option<String>) {
        {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state.halted = halted;
            state.note = note.clone();
            state.changed_at = Some(Utc::now());
        }
        if halted {
            warn!(note = ?note, "Kill switch engaged");
        } else {
            warn!(note = ?note, "Kill switch released");
        }
        if let Some(bus) = &self.bus {
            bus.publish(VigilEvent::KillSwitchChanged { halted, note });
        }
    }
}
