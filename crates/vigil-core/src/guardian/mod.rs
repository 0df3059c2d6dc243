//! Guardian decision engine
//!
//! Validates plans and actions through an ordered chain of evaluators:
//! hard-deny rules, the step-deviation score (actions only), injection
//! signatures, policy similarity, per-tool argument rules, and finally an
//! oracle fallback for review-band matches. The fallback fails closed.

mod chain;
mod config;
mod engine;
mod fallback;
mod injection;
mod policy;
mod rules;
mod text;
mod tools;
mod types;

#[cfg(test)]
mod tests;

pub use chain::{
    DeviationEvaluator, EvaluationContext, Evaluator, EvaluatorChain, HardDenyEvaluator,
    InjectionEvaluator, PolicyEvaluator, PolicyThresholds,
};
pub use config::GuardianConfig;
pub use engine::{DecisionEngine, POLICY_CONTEXT_UNAVAILABLE};
pub use fallback::{FallbackEvaluator, FALLBACK_UNAVAILABLE};
pub use injection::{InjectionDetector, InjectionPattern, InjectionScan, MatchOn, ThreatLevel, INJECTION_PATTERNS};
pub use rules::{hard_deny_match, HardDenyRule, HARD_DENY_RULES};
pub use tools::{default_tool_rules, ToolRule, ToolRulesEvaluator};
pub use types::{Decision, DecisionKind, Escalation, Subject, Verdict};
