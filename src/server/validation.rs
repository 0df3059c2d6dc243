//! Production configuration validation
//!
//! Warns about settings that are fine for development but unsafe in production.

use super::config::{AppConfig, ServiceMode};
use anyhow::Result;
use tracing::warn;

/// Validate configuration for production safety
pub fn validate_production_config(config: &AppConfig) -> Result<()> {
    let is_production = std::env::var("VIGIL_ENV")
        .map(|v| v.to_lowercase() == "production")
        .unwrap_or(false);

    if !is_production {
        return Ok(());
    }

    for warning in production_warnings(config) {
        warn!("SECURITY WARNING: {}", warning);
    }
    Ok(())
}

fn production_warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.server.host == "0.0.0.0" {
        warnings.push(
            "Server is binding to all interfaces (0.0.0.0). Consider binding to 127.0.0.1 \
             and using a reverse proxy."
                .to_string(),
        );
    }
    if config.llm.provider == "mock" {
        warnings.push(
            "LLM provider is 'mock'; plans and fallback classifications will not be real."
                .to_string(),
        );
    }
    let guardian = &config.guardian;
    if guardian.deny_threshold > 0.95 {
        warnings.push(format!(
            "guardian.deny_threshold is {:.2}; most policy matches will escalate instead of denying.",
            guardian.deny_threshold
        ));
    }
    if guardian.min_step_similarity <= 0.0 {
        warnings.push("guardian.min_step_similarity is 0; deviation checks are disabled.".to_string());
    }
    if !matches!(
        guardian.injection_block_level.to_lowercase().as_str(),
        "low" | "medium"
    ) {
        warnings.push(format!(
            "guardian.injection_block_level is '{}'; medium-level injection signatures will only warn.",
            guardian.injection_block_level
        ));
    }
    if guardian.tool_rules.is_empty() {
        warnings.push("guardian.tool_rules is empty; tool arguments are not checked.".to_string());
    }
    if config.services.mode == ServiceMode::Remote && config.services.directory_url.is_none() {
        warnings.push(
            "services.mode is remote but services.directory_url is unset; peers must register \
             with this instance."
                .to_string(),
        );
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_only_flag_mock_provider() {
        let warnings = production_warnings(&AppConfig::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("mock"));
    }

    #[test]
    fn test_lax_guardian_settings_flagged() {
        let mut config = AppConfig::default();
        config.llm.provider = "gemini".into();
        config.guardian.min_step_similarity = 0.0;
        config.guardian.injection_block_level = "critical".into();
        config.server.host = "0.0.0.0".into();
        config.guardian.tool_rules.clear();
        assert_eq!(production_warnings(&config).len(), 4);
    }
}
