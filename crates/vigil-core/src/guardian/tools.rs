//! Per-tool argument rules
//!
//! A rule constrains the arguments a known tool may be called with. An
//! action that breaks one is not denied outright: it comes back
//! `Ambiguous`, which callers treat as a denial pending human review.

use super::chain::{EvaluationContext, Evaluator};
use super::types::{Subject, Verdict};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Component, Path};
use tracing::debug;
use url::Url;

/// Argument constraints for one tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRule {
    /// Required prefix of the `path` argument, checked when one is passed
    #[serde(default)]
    pub path_prefix: Option<String>,
    /// Hosts the `url` argument may target, subdomains included.
    /// Empty means unrestricted; otherwise `url` is required.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
}

impl ToolRule {
    /// Rule requiring `path` to live under `prefix`
    #[must_use]
    pub fn path_prefix(prefix: impl Into<String>) -> Self {
        Self {
            path_prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    /// Rule limiting `url` to the given hosts
    #[must_use]
    pub fn allowed_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_hosts: hosts.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Why `input` breaks this rule, if it does
    #[must_use]
    pub fn violation(&self, tool: &str, input: &Value) -> Option<String> {
        if let Some(prefix) = &self.path_prefix {
            if let Some(path) = input.get("path").and_then(Value::as_str) {
                if !path_within(path, prefix) {
                    return Some(format!("{} path '{}' is outside {}", tool, path, prefix));
                }
            }
        }

        if !self.allowed_hosts.is_empty() {
            let url = input.get("url").and_then(Value::as_str).unwrap_or_default();
            let allowed = host_of(url).is_some_and(|host| {
                self.allowed_hosts
                    .iter()
                    .any(|allowed| host_matches(&host, allowed))
            });
            if !allowed {
                return Some(format!("{} target '{}' is not an allowed host", tool, url));
            }
        }
        None
    }
}

/// Rules shipped with the default configuration
#[must_use]
pub fn default_tool_rules() -> HashMap<String, ToolRule> {
    HashMap::from([
        ("run_script".to_string(), ToolRule::path_prefix("/srv/")),
        (
            "fetch_data".to_string(),
            ToolRule::allowed_hosts(["api.mycompany.com", "localhost"]),
        ),
    ])
}

fn path_within(path: &str, prefix: &str) -> bool {
    let escapes = Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir));
    !escapes && path.starts_with(prefix)
}

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    parsed.host_str().map(str::to_ascii_lowercase)
}

fn host_matches(host: &str, allowed: &str) -> bool {
    let allowed = allowed.trim().to_ascii_lowercase();
    !allowed.is_empty() && (host == allowed || host.ends_with(&format!(".{}", allowed)))
}

/// Applies [`ToolRule`]s to actions; plans pass through
pub struct ToolRulesEvaluator {
    rules: HashMap<String, ToolRule>,
}

impl ToolRulesEvaluator {
    /// Evaluator over `rules`, keyed by tool name
    #[must_use]
    pub fn new(rules: HashMap<String, ToolRule>) -> Self {
        Self { rules }
    }
}

#[async_trait::async_trait]
impl Evaluator for ToolRulesEvaluator {
    fn name(&self) -> &'static str {
        "tool_rules"
    }

    async fn evaluate(&self, ctx: &mut EvaluationContext) -> Verdict {
        let Subject::Action { action, .. } = &ctx.subject else {
            return Verdict::Pass;
        };
        let tool = action.tool.trim();
        let Some(rule) = self.rules.get(tool) else {
            return Verdict::Pass;
        };
        match rule.violation(tool, &action.input) {
            Some(reason) => {
                debug!(task_id = %ctx.task_id, tool = %tool, reason = %reason, "Tool rule needs review");
                Verdict::Ambiguous(reason)
            }
            None => Verdict::Pass,
        }
    }
}
