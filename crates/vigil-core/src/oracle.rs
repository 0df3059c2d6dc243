//! LLM-backed oracles
//!
//! [`LlmOracle`] adapts any [`vigil_llm::LlmProvider`] to the three oracle
//! seams the engine consumes: plan generation, action proposal, and the
//! decision engine's semantic fallback. Every prompt asks for a JSON object;
//! answers are parsed with [`vigil_llm::util::extract_json`], so fenced or
//! chatty output is tolerated.

use crate::capabilities::{
    Classification, HistoryEntry, PlanningOracle, PolicyClassifier, PolicySnippet, Proposal,
    ProposedAction, ReasoningOracle, ToolDescriptor,
};
use crate::error::{Error, Result};
use crate::guardian::DecisionKind;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};
use vigil_llm::{util::extract_json, CompletionRequest, Message, SharedLlmProvider};

/// Action name the reasoning oracle uses to report the step goal as met
pub const FINISH_GOAL: &str = "finish_goal";

/// System prompt for plan generation
pub const PLANNER_SYSTEM_PROMPT: &str = r#"You are the planner of Vigil, an autonomous operations system.
Break the user's goal into a short, ordered list of concrete steps. Each step must be a single
verifiable objective. Do not include destructive operations unless the goal explicitly requires them.

Respond ONLY with JSON:
{
  "plan_id": "<string>",
  "steps": [
    { "step_id": <int>, "goal": "<string>" }
  ]
}"#;

/// System prompt for the step reasoning loop
pub const REASONING_SYSTEM_PROMPT: &str = r#"You are a ReAct-style worker in Vigil.
You work on exactly one step goal using only the tools listed. Look at the history of previous
actions and their observations before choosing the next action. When the step goal is already
achieved, use the action "finish_goal".

Respond ONLY with JSON:
{
  "thought": "<reasoning>",
  "action": "<tool-name or 'finish_goal'>",
  "action_input": { ... }
}"#;

/// System prompt for the policy fallback
pub const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You are the safety reviewer of Vigil.
Decide whether the subject violates any of the listed policies. Answer "Deny" when it clearly
violates one, "Allow" when it clearly does not, and "Ambiguous" when a human should decide.

Respond ONLY with JSON:
{
  "decision": "Allow" | "Deny" | "Ambiguous",
  "reason": "<one sentence>"
}"#;

/// Generation settings shared by all three prompts
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Model override; `None` uses the provider default
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Response token cap
    pub max_tokens: Option<u32>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: Some(0.2),
            max_tokens: Some(1024),
        }
    }
}

impl OracleConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature
    #[must_use]
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set the response token cap
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Deserialize)]
struct PlanAnswer {
    #[serde(default)]
    plan_id: Option<String>,
    steps: Vec<PlanStepAnswer>,
}

#[derive(Debug, Deserialize)]
struct PlanStepAnswer {
    goal: String,
}

#[derive(Debug, Deserialize)]
struct ActionAnswer {
    #[serde(default)]
    thought: String,
    action: String,
    #[serde(default)]
    action_input: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ClassificationAnswer {
    decision: String,
    #[serde(default)]
    reason: String,
}

/// Planning, reasoning and classification over one LLM provider
pub struct LlmOracle {
    provider: SharedLlmProvider,
    config: OracleConfig,
}

impl LlmOracle {
    /// Create an oracle with default settings
    #[must_use]
    pub fn new(provider: SharedLlmProvider) -> Self {
        Self {
            provider,
            config: OracleConfig::default(),
        }
    }

    /// Override generation settings
    #[must_use]
    pub fn with_config(mut self, config: OracleConfig) -> Self {
        self.config = config;
        self
    }

    /// Name of the backing provider
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send one system/user exchange and return the JSON object in the answer.
    ///
    /// Transport failures keep their transient classification; unparseable
    /// output is handed back as the raw text so callers can pick the error.
    async fn ask(&self, system: &str, user: String) -> Result<std::result::Result<serde_json::Value, String>> {
        let mut request = CompletionRequest::new(self.config.model.clone().unwrap_or_default())
            .with_message(Message::system(system))
            .with_message(Message::user(user))
            .with_json_mode();
        request.temperature = self.config.temperature;
        request.max_tokens = self.config.max_tokens;

        let response = self.provider.complete(request).await?;
        debug!(
            provider = %self.provider.name(),
            model = %response.model,
            chars = response.content.len(),
            "Oracle answered"
        );
        Ok(extract_json(&response.content).map_err(|e| e.to_string()))
    }
}

#[async_trait::async_trait]
impl PlanningOracle for LlmOracle {
    #[instrument(skip(self, context), fields(provider = %self.provider.name()))]
    async fn generate_plan(&self, goal: &str, context: &serde_json::Value) -> Result<Vec<String>> {
        let prompt = format!(
            "User Goal: {}\nContext: {}\nGenerate the plan.",
            goal, context
        );
        let value = self
            .ask(PLANNER_SYSTEM_PROMPT, prompt)
            .await?
            .map_err(Error::Planning)?;

        let answer: PlanAnswer = serde_json::from_value(value)
            .map_err(|e| Error::Planning(format!("plan does not match the expected shape: {}", e)))?;
        let steps: Vec<String> = answer
            .steps
            .into_iter()
            .map(|s| s.goal.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();
        if steps.is_empty() {
            return Err(Error::Planning("plan has no steps".to_string()));
        }

        debug!(plan_id = answer.plan_id.as_deref().unwrap_or("-"), steps = steps.len(), "Plan generated");
        Ok(steps)
    }
}

#[async_trait::async_trait]
impl ReasoningOracle for LlmOracle {
    #[instrument(skip(self, tools, history), fields(provider = %self.provider.name()))]
    async fn propose_action(
        &self,
        goal: &str,
        tools: &[ToolDescriptor],
        history: &[HistoryEntry],
    ) -> Result<Proposal> {
        let prompt = format!(
            "Reason\nStep Goal: {}\nAvailable Tools: {}\nHistory: {}",
            goal,
            serde_json::to_string(tools)?,
            serde_json::to_string(history)?,
        );
        let value = self
            .ask(REASONING_SYSTEM_PROMPT, prompt)
            .await?
            .map_err(|raw| Error::Internal(format!("unusable reasoning output: {}", raw)))?;

        let answer: ActionAnswer = serde_json::from_value(value)
            .map_err(|e| Error::Internal(format!("unusable reasoning output: {}", e)))?;
        let action = answer.action.trim();
        if action.is_empty() || action == FINISH_GOAL {
            return Ok(Proposal::Satisfied {
                thought: answer.thought,
            });
        }
        Ok(Proposal::Action(
            ProposedAction::new(action, answer.action_input).with_thought(answer.thought),
        ))
    }
}

#[async_trait::async_trait]
impl PolicyClassifier for LlmOracle {
    #[instrument(skip(self, subject, snippets), fields(snippets = snippets.len()))]
    async fn classify(&self, subject: &str, snippets: &[PolicySnippet]) -> Result<Classification> {
        let policies: Vec<serde_json::Value> = snippets
            .iter()
            .map(|s| json!({"text": s.text, "source": s.source}))
            .collect();
        let prompt = format!(
            "Subject:\n{}\nPolicies: {}",
            subject,
            serde_json::Value::Array(policies)
        );
        let value = self
            .ask(CLASSIFIER_SYSTEM_PROMPT, prompt)
            .await?
            .map_err(|raw| Error::Internal(format!("unusable classifier output: {}", raw)))?;

        let answer: ClassificationAnswer = serde_json::from_value(value)
            .map_err(|e| Error::Internal(format!("unusable classifier output: {}", e)))?;
        let decision = match answer.decision.trim().to_ascii_lowercase().as_str() {
            "allow" => DecisionKind::Allow,
            "deny" => DecisionKind::Deny,
            "ambiguous" => DecisionKind::Ambiguous,
            other => {
                warn!(decision = %other, "Classifier returned an unknown decision");
                return Err(Error::Internal(format!("unknown classifier decision '{}'", other)));
            }
        };
        Ok(Classification {
            decision,
            reason: answer.reason,
        })
    }
}
