//! Partner step executor
//!
//! Runs the bounded reason-validate-act-observe loop for a single plan
//! step and reports one of three outcomes back to the orchestrator.

mod executor;
mod types;


pub use executor::{ExecutorConfig, StepExecutor, ITERATION_LIMIT_EXCEEDED};
pub use types::{StepOutcome, StepReport};
