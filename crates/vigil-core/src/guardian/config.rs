use super::injection::ThreatLevel;
use super::tools::{default_tool_rules, ToolRule};
use std::collections::HashMap;
use std::time::Duration;

/// Decision engine configuration
#[derive(Debug, Clone)]
pub struct GuardianConfig {
    /// Policy score at or above which a violation rule denies outright
    pub deny_threshold: f64,
    /// Policy score at or above which the oracle fallback is consulted
    pub review_threshold: f64,
    /// Policy score at or above which a warning is recorded
    pub warn_threshold: f64,
    /// Minimum token overlap between an action and its step goal
    pub min_step_similarity: f64,
    /// Plans longer than this get a complexity warning
    pub max_plan_steps: usize,
    /// Lowest injection threat level that denies
    pub block_level: ThreatLevel,
    /// Snippets passed to the fallback classifier
    pub fallback_snippets: usize,
    /// Deadline for fetching policies
    pub store_timeout: Duration,
    /// Deadline for the fallback classifier
    pub fallback_timeout: Duration,
    /// Argument rules keyed by tool name
    pub tool_rules: HashMap<String, ToolRule>,
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            deny_threshold: 0.90,
            review_threshold: 0.70,
            warn_threshold: 0.30,
            min_step_similarity: 0.10,
            max_plan_steps: 10,
            block_level: ThreatLevel::Medium,
            fallback_snippets: 3,
            store_timeout: Duration::from_secs(5),
            fallback_timeout: Duration::from_secs(30),
            tool_rules: default_tool_rules(),
        }
    }
}

impl GuardianConfig {
    /// Create with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deny, review and warn thresholds
    #[must_use]
    pub fn with_thresholds(mut self, deny: f64, review: f64, warn: f64) -> Self {
        self.deny_threshold = deny;
        self.review_threshold = review;
        self.warn_threshold = warn;
        self
    }

    /// Set the minimum step similarity
    #[must_use]
    pub fn with_min_step_similarity(mut self, min: f64) -> Self {
        self.min_step_similarity = min;
        self
    }

    /// Set the complexity threshold
    #[must_use]
    pub fn with_max_plan_steps(mut self, steps: usize) -> Self {
        self.max_plan_steps = steps;
        self
    }

    /// Set the injection block level
    #[must_use]
    pub fn with_block_level(mut self, level: ThreatLevel) -> Self {
        self.block_level = level;
        self
    }

    /// Set the policy fetch deadline
    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Set the fallback deadline
    #[must_use]
    pub fn with_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_timeout = timeout;
        self
    }

    /// Replace every tool rule
    #[must_use]
    pub fn with_tool_rules(mut self, rules: HashMap<String, ToolRule>) -> Self {
        self.tool_rules = rules;
        self
    }

    /// Add or replace the rule for one tool
    #[must_use]
    pub fn with_tool_rule(mut self, tool: impl Into<String>, rule: ToolRule) -> Self {
        self.tool_rules.insert(tool.into(), rule);
        self
    }
}
