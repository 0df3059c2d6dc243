use super::chain::{
    DeviationEvaluator, EvaluationContext, EvaluatorChain, HardDenyEvaluator, InjectionEvaluator,
    PolicyEvaluator, PolicyThresholds,
};
use super::config::GuardianConfig;
use super::fallback::FallbackEvaluator;
use super::injection::InjectionDetector;
use super::policy::parse_snippets;
use super::tools::ToolRulesEvaluator;
use super::types::{Decision, DecisionKind, Subject};
use crate::capabilities::{
    PolicyClassifier, PolicyGate, ProposedAction, SharedAuditSink, SharedKnowledgeStore,
};
use crate::error::{Error, Result};
use crate::overseer::AuditEvent;
use crate::utils::with_timeout;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Warning recorded when policies could not be fetched
pub const POLICY_CONTEXT_UNAVAILABLE: &str = "policy context unavailable";

/// Two-tier decision engine: deterministic passes, then the oracle fallback.
pub struct DecisionEngine {
    store: SharedKnowledgeStore,
    classifier: Option<Arc<dyn PolicyClassifier>>,
    audit: Option<SharedAuditSink>,
    config: GuardianConfig,
    chain: EvaluatorChain,
}

impl DecisionEngine {
    /// Engine without a fallback classifier; escalations are denied.
    #[must_use]
    pub fn new(store: SharedKnowledgeStore, config: GuardianConfig) -> Self {
        let chain = build_chain(&config, None);
        Self {
            store,
            classifier: None,
            audit: None,
            config,
            chain,
        }
    }

    /// Use `classifier` for review-band matches
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn PolicyClassifier>) -> Self {
        self.chain = build_chain(&self.config, Some(classifier.clone()));
        self.classifier = Some(classifier);
        self
    }

    /// Emit every decision to `audit`
    #[must_use]
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &GuardianConfig {
        &self.config
    }

    /// Whether a fallback classifier is configured
    #[must_use]
    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// Validate a plan
    #[instrument(skip(self, plan), fields(steps = plan.len()))]
    pub async fn validate_plan(&self, task_id: &str, plan: &[String]) -> Result<Decision> {
        let steps: Vec<String> = plan
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if steps.is_empty() {
            return Err(Error::InvalidInput("plan has no steps".to_string()));
        }

        let mut ctx = EvaluationContext::new(task_id, Subject::Plan { steps });
        if let Subject::Plan { steps } = &ctx.subject {
            if steps.len() > self.config.max_plan_steps {
                let warning = format!(
                    "plan has {} steps, above the complexity threshold of {}",
                    steps.len(),
                    self.config.max_plan_steps
                );
                ctx.warnings.push(warning);
            }
        }

        let decision = self.evaluate(ctx).await;
        self.record(task_id, "plan", &decision);
        Ok(decision)
    }

    /// Validate one action against the goal of its step
    #[instrument(skip(self, action), fields(tool = %action.tool))]
    pub async fn validate_action(
        &self,
        task_id: &str,
        step_goal: &str,
        action: &ProposedAction,
    ) -> Result<Decision> {
        if action.tool.trim().is_empty() {
            return Err(Error::InvalidInput("action has no tool".to_string()));
        }
        let ctx = EvaluationContext::new(
            task_id,
            Subject::Action {
                step_goal: step_goal.to_string(),
                action: action.clone(),
            },
        );

        let decision = self.evaluate(ctx).await;
        self.record(task_id, "action", &decision);
        Ok(decision)
    }

    async fn evaluate(&self, mut ctx: EvaluationContext) -> Decision {
        let context = ctx.subject.describe();
        let fetched = with_timeout(
            "policy fetch",
            self.config.store_timeout,
            self.store.get_policies(&context),
        )
        .await;

        match fetched {
            Ok(snippets) => {
                debug!(count = snippets.len(), "Fetched policy snippets");
                let rules = parse_snippets(snippets, &mut ctx.warnings);
                ctx.policies = Some(rules);
            }
            Err(e) => {
                // rule-only evaluation; policy and fallback passes see no context
                warn!(task_id = %ctx.task_id, error = %e, "Knowledge store unreachable, evaluating rules only");
                ctx.warnings.push(POLICY_CONTEXT_UNAVAILABLE.to_string());
            }
        }

        self.chain.run(ctx).await
    }

    fn record(&self, task_id: &str, kind: &str, decision: &Decision) {
        info!(
            task_id = %task_id,
            subject = kind,
            decision = %decision.decision,
            reason = %decision.reason,
            warnings = decision.warnings.len(),
            "Validation decided"
        );
        if let Some(audit) = &self.audit {
            let event = match decision.decision {
                DecisionKind::Allow => AuditEvent::info("guardian", format!("{} allowed", kind)),
                DecisionKind::Deny | DecisionKind::Ambiguous => AuditEvent::warning(
                    "guardian",
                    format!("{} {}: {}", kind, decision.decision, decision.reason),
                ),
            };
            audit.emit(event.with_task(task_id).with_context(json!({
                "decision": decision.decision,
                "reason": decision.reason,
                "warnings": decision.warnings,
                "score": decision.score,
            })));
        }
    }
}

fn build_chain(
    config: &GuardianConfig,
    classifier: Option<Arc<dyn PolicyClassifier>>,
) -> EvaluatorChain {
    EvaluatorChain::new()
        .with(HardDenyEvaluator)
        .with(DeviationEvaluator::new(config.min_step_similarity))
        .with(InjectionEvaluator::new(InjectionDetector::new(
            config.block_level,
        )))
        .with(PolicyEvaluator::new(PolicyThresholds {
            deny: config.deny_threshold,
            review: config.review_threshold,
            warn: config.warn_threshold,
            escalation_snippets: config.fallback_snippets,
        }))
        .with(ToolRulesEvaluator::new(config.tool_rules.clone()))
        .with(FallbackEvaluator::new(classifier, config.fallback_timeout))
}

#[async_trait::async_trait]
impl PolicyGate for DecisionEngine {
    async fn validate_plan(&self, task_id: &str, plan: &[String]) -> Result<Decision> {
        DecisionEngine::validate_plan(self, task_id, plan).await
    }

    async fn validate_action(
        &self,
        task_id: &str,
        step_goal: &str,
        action: &ProposedAction,
    ) -> Result<Decision> {
        DecisionEngine::validate_action(self, task_id, step_goal, action).await
    }
}
