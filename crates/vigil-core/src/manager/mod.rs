//! Manager orchestrator
//!
//! Owns the task collection and the task state machine:
//!
//! ```text
//! PENDING -> PLANNING -> PLAN_VALIDATING -> EXECUTING -> COMPLETED
//!                 |              |              |-> PAUSED_DEVIATION --approve--> EXECUTING
//!                 v              v              |-> WAITING_APPROVAL --approve--> EXECUTING
//!              FAILED        REJECTED           '-> FAILED
//! ```
//!
//! `replan` returns any task to PLANNING with its index reset to zero.
//! Each task is driven by at most one background job at a time.

mod config;
mod core;
mod driver;
mod store;
mod types;

#[cfg(test)]
mod tests;

pub use config::OrchestratorConfig;
pub use self::core::{Orchestrator, SYSTEM_HALTED};
pub use types::{Task, TaskStatus, TaskSummary, Transition};
