//! Overseer
//!
//! Audit trail and the process-wide kill switch. [`AuditLog`] keeps a
//! bounded window of recent events and republishes them on the
//! [`EventBus`](crate::event_bus::EventBus); [`LocalKillSwitch`] gates new
//! tasks and step boundaries.

mod kill;
mod log;
mod types;

pub use kill::LocalKillSwitch;
pub use self::log::AuditLog;
pub use types::{AuditEvent, AuditLevel, KillStatus};
