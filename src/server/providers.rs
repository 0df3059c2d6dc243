//! LLM provider resolution

use super::config::LlmConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use vigil_llm::{
    GeminiConfig, GeminiProvider, MockProvider, OllamaConfig, OllamaProvider, SharedLlmProvider,
};

/// Build the configured provider
pub fn resolve_llm_provider(llm_config: &LlmConfig) -> Result<SharedLlmProvider> {
    let timeout = Duration::from_secs(llm_config.timeout_secs);
    let provider: SharedLlmProvider = match llm_config.provider.to_lowercase().as_str() {
        "gemini" => {
            let mut config = GeminiConfig::from_env()
                .context("Gemini selected but GEMINI_API_KEY is not set")?
                .with_timeout(timeout);
            if let Some(model) = &llm_config.model {
                config = config.with_model(model);
            }
            if let Some(url) = &llm_config.base_url {
                config = config.with_base_url(url);
            }
            Arc::new(GeminiProvider::new(config).context("Failed to create Gemini provider")?)
        }
        "ollama" => {
            let mut config = OllamaConfig::new().with_timeout(timeout);
            if let Some(model) = &llm_config.model {
                config = config.with_model(model);
            }
            if let Some(url) = &llm_config.base_url {
                config = config.with_base_url(url);
            }
            Arc::new(OllamaProvider::new(config).context("Failed to create Ollama provider")?)
        }
        "mock" => {
            if llm_config.mock_responses.is_empty() {
                warn!("Mock LLM provider has no scripted responses; oracle calls will fail as unavailable");
            }
            Arc::new(MockProvider::with_responses(llm_config.mock_responses.iter().cloned()))
        }
        other => anyhow::bail!("Unknown LLM provider '{}' (expected gemini, ollama or mock)", other),
    };

    info!(provider = %provider.name(), model = %provider.default_model(), "LLM provider ready");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_and_unknown_providers() {
        let config = LlmConfig {
            mock_responses: vec!["{}".into()],
            ..LlmConfig::default()
        };
        assert_eq!(resolve_llm_provider(&config).unwrap().name(), "mock");

        let config = LlmConfig {
            provider: "skynet".into(),
            ..LlmConfig::default()
        };
        assert!(resolve_llm_provider(&config).is_err());
    }
}
