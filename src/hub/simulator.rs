use tracing::info;
use vigil_core::{ProposedAction, Result, ToolExecutor, ToolOutcome};

/// Deterministic stand-in for real tool execution.
///
/// Nothing is actually run. Known tools succeed with a canned observation;
/// an unknown tool, or an input mentioning `deviation`, reports a deviation.
#[derive(Debug, Default, Clone)]
pub struct SimulatedTools;

impl SimulatedTools {
    /// Create the simulator
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn observe(action: &ProposedAction) -> ToolOutcome {
        let text = action.text();
        if text.to_lowercase().contains("deviation") {
            return ToolOutcome::Deviation {
                observation: format!("simulated deviation while running {}", action.tool),
            };
        }

        let arg = |key: &str| {
            action
                .input
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };
        match action.tool.as_str() {
            "run_script" => {
                let script = [arg("command"), arg("path")]
                    .into_iter()
                    .find(|s| !s.is_empty())
                    .unwrap_or_default();
                ToolOutcome::Success {
                    observation: format!("simulated: executed `{}` (exit 0)", script),
                }
            }
            "fetch_data" => ToolOutcome::Success {
                observation: format!("simulated: GET {} returned 200", arg("url")),
            },
            "restart_service" => ToolOutcome::Success {
                observation: format!("simulated: service '{}' restarted", arg("name")),
            },
            other => ToolOutcome::Deviation {
                observation: format!("unknown tool '{}'", other),
            },
        }
    }
}

#[async_trait::async_trait]
impl ToolExecutor for SimulatedTools {
    async fn execute(&self, task_id: &str, action: &ProposedAction) -> Result<ToolOutcome> {
        let outcome = Self::observe(action);
        info!(
            task_id = %task_id,
            tool = %action.tool,
            success = outcome.is_success(),
            "Simulated tool call"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_tool_succeeds() {
        let tools = SimulatedTools::new();
        let action = ProposedAction::new("run_script", json!({"command": "ping -c 3 8.8.8.8"}));
        let outcome = tokio_test::block_on(tools.execute("task-1", &action)).unwrap();
        assert!(outcome.is_success());
        assert!(outcome.observation().contains("ping -c 3 8.8.8.8"));

        let script = ProposedAction::new("run_script", json!({"path": "/srv/scripts/check_disk_usage.sh"}));
        let outcome = tokio_test::block_on(tools.execute("task-1", &script)).unwrap();
        assert!(outcome.observation().contains("/srv/scripts/check_disk_usage.sh"));

        let restart = ProposedAction::new("restart_service", json!({"name": "web"}));
        let outcome = tokio_test::block_on(tools.execute("task-1", &restart)).unwrap();
        assert!(outcome.observation().contains("'web'"));
    }

    #[tokio::test]
    async fn test_deviation_marker_and_unknown_tool() {
        let tools = SimulatedTools::new();
        let marked = ProposedAction::new("fetch_data", json!({"url": "http://x/deviation"}));
        assert!(matches!(
            tools.execute("t", &marked).await.unwrap(),
            ToolOutcome::Deviation { .. }
        ));

        let unknown = ProposedAction::new("format_disk", json!({}));
        let outcome = tools.execute("t", &unknown).await.unwrap();
        assert!(!outcome.is_success());
        assert!(outcome.observation().contains("unknown tool"));
    }
}
