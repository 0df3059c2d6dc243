//! Strategy chain of evaluators
//!
//! Evaluators run in order and the first non-[`Verdict::Pass`] answer wins.
//! Order: hard-deny, step deviation, injection, policy, tool rules, fallback.

use super::injection::InjectionDetector;
use super::policy::{score_rules, PolicyRule};
use super::rules::hard_deny_match;
use super::text::jaccard;
use super::types::{Decision, Escalation, Subject, Verdict};
use tracing::debug;

/// Mutable state threaded through the chain for one validation call
#[derive(Debug)]
pub struct EvaluationContext {
    /// Task the call belongs to
    pub task_id: String,
    /// Plan or action under evaluation
    pub subject: Subject,
    /// Parsed policies; `None` when the knowledge store was unreachable
    pub(crate) policies: Option<Vec<PolicyRule>>,
    /// Findings that do not block
    pub warnings: Vec<String>,
    /// Best policy score seen
    pub score: Option<f64>,
    /// Set by the policy pass when the fallback must decide
    pub escalation: Option<Escalation>,
}

impl EvaluationContext {
    /// Context with no policy data yet
    #[must_use]
    pub fn new(task_id: impl Into<String>, subject: Subject) -> Self {
        Self {
            task_id: task_id.into(),
            subject,
            policies: None,
            warnings: Vec::new(),
            score: None,
            escalation: None,
        }
    }

    fn warn(&mut self, warning: String) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

/// One link of the chain
#[async_trait::async_trait]
pub trait Evaluator: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Inspect the context; return `Pass` to defer
    async fn evaluate(&self, ctx: &mut EvaluationContext) -> Verdict;
}

/// Ordered list of evaluators
#[derive(Default)]
pub struct EvaluatorChain {
    evaluators: Vec<Box<dyn Evaluator>>,
}

impl EvaluatorChain {
    /// Empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an evaluator
    #[must_use]
    pub fn with(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluators.push(Box::new(evaluator));
        self
    }

    /// Evaluator names in order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.evaluators.iter().map(|e| e.name()).collect()
    }

    /// Run until the first non-`Pass` verdict. All-pass is an allow.
    pub async fn run(&self, mut ctx: EvaluationContext) -> Decision {
        for evaluator in &self.evaluators {
            let verdict = evaluator.evaluate(&mut ctx).await;
            let decision = match verdict {
                Verdict::Pass => continue,
                Verdict::Allow(reason) => Decision::allow(reason),
                Verdict::Deny(reason) => Decision::deny(reason),
                Verdict::Ambiguous(reason) => Decision::ambiguous(reason),
            };
            debug!(
                task_id = %ctx.task_id,
                evaluator = evaluator.name(),
                decision = %decision.decision,
                "Evaluator decided"
            );
            return decision.with_warnings(ctx.warnings).with_score(ctx.score);
        }
        Decision::allow("no policy violations found")
            .with_warnings(ctx.warnings)
            .with_score(ctx.score)
    }
}

/// Destructive-command rules
pub struct HardDenyEvaluator;

#[async_trait::async_trait]
impl Evaluator for HardDenyEvaluator {
    fn name(&self) -> &'static str {
        "hard_deny"
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> Verdict {
        for text in ctx.subject.texts() {
            if let Some(rule) = hard_deny_match(&text) {
                ctx.score = Some(1.0);
                return Verdict::Deny(format!(
                    "hard-deny pattern matched: {} ({})",
                    rule.id, rule.description
                ));
            }
        }
        Verdict::Pass
    }
}

/// Token overlap between an action and its step goal
pub struct DeviationEvaluator {
    min_similarity: f64,
}

impl DeviationEvaluator {
    /// Deny actions scoring below `min_similarity`
    #[must_use]
    pub fn new(min_similarity: f64) -> Self {
        Self { min_similarity }
    }
}

#[async_trait::async_trait]
impl Evaluator for DeviationEvaluator {
    fn name(&self) -> &'static str {
        "deviation"
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> Verdict {
        let Subject::Action { step_goal, action } = &ctx.subject else {
            return Verdict::Pass;
        };
        // the thought is the oracle's own claim; only what runs is scored
        let similarity = jaccard(&action.text(), step_goal);
        if similarity < self.min_similarity {
            debug!(task_id = %ctx.task_id, similarity, min = self.min_similarity, "Action deviates from step");
            return Verdict::Deny(format!(
                "deviation from approved step (similarity {:.2} < {:.2})",
                similarity, self.min_similarity
            ));
        }
        Verdict::Pass
    }
}

/// Prompt-injection signatures
pub struct InjectionEvaluator {
    detector: InjectionDetector,
}

impl InjectionEvaluator {
    /// Wrap a detector
    #[must_use]
    pub fn new(detector: InjectionDetector) -> Self {
        Self { detector }
    }
}

#[async_trait::async_trait]
impl Evaluator for InjectionEvaluator {
    fn name(&self) -> &'static str {
        "injection"
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> Verdict {
        let mut texts = ctx.subject.texts();
        if let Subject::Action { action, .. } = &ctx.subject {
            texts.push(action.thought.clone());
        }
        for text in texts {
            let scan = self.detector.scan(&text);
            if let Some(pattern) = scan.blocking {
                return Verdict::Deny(format!(
                    "prompt injection detected: {} ({})",
                    pattern.id, pattern.description
                ));
            }
            for signal in scan.signals {
                ctx.warn(format!("low-confidence injection signal: {}", signal.id));
            }
        }
        Verdict::Pass
    }
}

/// Thresholds used by [`PolicyEvaluator`]
#[derive(Debug, Clone, Copy)]
pub struct PolicyThresholds {
    /// Deny at or above
    pub deny: f64,
    /// Escalate at or above
    pub review: f64,
    /// Warn at or above
    pub warn: f64,
    /// Snippets passed on escalation
    pub escalation_snippets: usize,
}

/// Token-overlap scoring against fetched policy snippets
pub struct PolicyEvaluator {
    thresholds: PolicyThresholds,
}

impl PolicyEvaluator {
    /// Create with thresholds
    #[must_use]
    pub fn new(thresholds: PolicyThresholds) -> Self {
        Self { thresholds }
    }
}

#[async_trait::async_trait]
impl Evaluator for PolicyEvaluator {
    fn name(&self) -> &'static str {
        "policy"
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> Verdict {
        let Some(rules) = &ctx.policies else {
            return Verdict::Pass;
        };
        let t = self.thresholds;
        let matches = score_rules(&ctx.subject.texts(), rules);

        let violations: Vec<_> = matches.iter().filter(|m| m.violation).collect();
        if let Some(best) = violations.first() {
            ctx.score = Some(best.score);
            if best.score >= t.deny {
                return Verdict::Deny(format!(
                    "policy violation: '{}' (score {:.2})",
                    best.snippet.text, best.score
                ));
            }
            if best.score >= t.review {
                ctx.escalation = Some(Escalation {
                    score: best.score,
                    snippets: violations
                        .iter()
                        .take(t.escalation_snippets)
                        .map(|m| m.snippet.clone())
                        .collect(),
                });
            }
        } else if !rules.is_empty() {
            ctx.score = Some(0.0);
        }

        let mut warnings = Vec::new();
        for m in matches.iter().filter(|m| m.score >= t.warn) {
            if m.violation {
                warnings.push(format!(
                    "low-confidence policy match: '{}' (score {:.2})",
                    m.snippet.text, m.score
                ));
            } else {
                warnings.push(format!("advisory policy applies: '{}'", m.snippet.text));
            }
        }
        for w in warnings {
            ctx.warn(w);
        }
        Verdict::Pass
    }
}
