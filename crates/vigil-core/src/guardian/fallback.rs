use super::chain::{EvaluationContext, Evaluator};
use super::types::{DecisionKind, Verdict};
use crate::capabilities::PolicyClassifier;
use crate::utils::with_timeout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Reason recorded whenever the fallback cannot produce an answer
pub const FALLBACK_UNAVAILABLE: &str = "fallback unavailable";

/// Last link of the chain: asks the policy classifier about review-band
/// matches. Fails closed when the classifier is missing, errors, or
/// times out.
pub struct FallbackEvaluator {
    classifier: Option<Arc<dyn PolicyClassifier>>,
    timeout: Duration,
}

impl FallbackEvaluator {
    /// Create; `None` means every escalation is denied
    #[must_use]
    pub fn new(classifier: Option<Arc<dyn PolicyClassifier>>, timeout: Duration) -> Self {
        Self {
            classifier,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl Evaluator for FallbackEvaluator {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> Verdict {
        let Some(escalation) = ctx.escalation.clone() else {
            return Verdict::Pass;
        };
        let Some(classifier) = &self.classifier else {
            warn!(task_id = %ctx.task_id, "No policy classifier configured, failing closed");
            return Verdict::Deny(FALLBACK_UNAVAILABLE.to_string());
        };

        let subject = ctx.subject.describe();
        let result = with_timeout(
            "policy fallback",
            self.timeout,
            classifier.classify(&subject, &escalation.snippets),
        )
        .await;

        match result {
            Ok(classification) => {
                info!(
                    task_id = %ctx.task_id,
                    decision = %classification.decision,
                    score = escalation.score,
                    "Fallback classified review-band match"
                );
                let reason = if classification.reason.trim().is_empty() {
                    format!("fallback classifier returned {}", classification.decision)
                } else {
                    classification.reason
                };
                match classification.decision {
                    DecisionKind::Allow => {
                        ctx.warnings
                            .push(format!("allowed by fallback classifier: {}", reason));
                        Verdict::Allow(reason)
                    }
                    DecisionKind::Deny => Verdict::Deny(reason),
                    DecisionKind::Ambiguous => Verdict::Ambiguous(reason),
                }
            }
            Err(e) => {
                warn!(task_id = %ctx.task_id, error = %e, "Policy fallback failed, failing closed");
                Verdict::Deny(FALLBACK_UNAVAILABLE.to_string())
            }
        }
    }
}
