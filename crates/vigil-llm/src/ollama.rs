//! Ollama - Local Ollama API provider
//!
//! Chat completions through `/api/chat`, for running Vigil fully offline.

use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::provider::LlmProvider;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

// ============================================================================
// Security Utilities
// ============================================================================

/// Sanitize API error messages to prevent leaking sensitive information
fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();

    if lower.contains("/home") || lower.contains("/root") || lower.contains("/var") {
        return "An internal error occurred. Please check your Ollama installation.".to_string();
    }

    if lower.contains("model") && (lower.contains("not found") || lower.contains("pull")) {
        return "Model not available. Please pull the model first with: ollama pull <model>"
            .to_string();
    }

    if error.len() < 100 {
        return error.to_string();
    }

    "An error occurred. Please try again.".to_string()
}

/// Default Ollama model
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Default Ollama API URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: OllamaMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Ollama provider configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL (default: http://localhost:11434)
    pub base_url: String,
    /// Default model
    pub default_model: String,
    /// Default max tokens
    pub default_max_tokens: u32,
    /// Request timeout (longer for local inference)
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_max_tokens: 2048,
            timeout: Duration::from_secs(300),
        }
    }
}

impl OllamaConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Ollama local provider
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn convert_messages(messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|msg| OllamaMessage {
                role: msg.role.as_str().to_string(),
                content: msg.content.clone(),
            })
            .collect()
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_connect() {
            Error::Network(format!(
                "Failed to connect to Ollama at {}. Is Ollama running?",
                self.config.base_url
            ))
        } else if e.is_timeout() {
            Error::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            Error::Network(e.to_string())
        }
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String> {
        let url = format!("{}{}", self.config.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<OllamaError>(&text) {
                return Err(Error::Api(sanitize_api_error(&error.error)));
            }
            return Err(Error::Api(sanitize_api_error(&format!("HTTP {}", status))));
        }

        Ok(text)
    }
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn available_models(&self) -> Vec<String> {
        vec![self.config.default_model.clone()]
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = if request.model.is_empty() {
            self.config.default_model.clone()
        } else {
            request.model.clone()
        };

        debug!("Sending request to Ollama: {}", model);

        let body = OllamaChatRequest {
            model,
            messages: Self::convert_messages(&request.messages),
            options: Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens.or(Some(self.config.default_max_tokens)),
            }),
            format: request.json_mode.then(|| "json".to_string()),
            stream: false,
        };

        let text = self.post_json("/api/chat", &body).await?;
        let response: OllamaChatResponse =
            serde_json::from_str(&text).map_err(|e| Error::InvalidResponse(e.to_string()))?;

        let usage = match (response.prompt_eval_count, response.eval_count) {
            (Some(prompt), Some(completion)) => Some(TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }),
            _ => None,
        };

        Ok(CompletionResponse {
            content: response.message.content,
            usage,
            finish_reason: response.done_reason,
            model: response.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::new().with_model("mistral");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.default_model, "mistral");
    }

    #[test]
    fn test_message_conversion() {
        let converted =
            OllamaProvider::convert_messages(&[Message::system("sys"), Message::user("hi")]);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[1].content, "hi");
    }

    #[test]
    fn test_chat_request_json_format() {
        let body = OllamaChatRequest {
            model: "llama3.2".into(),
            messages: vec![],
            options: None,
            format: Some("json".into()),
            stream: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["format"], "json");
        assert_eq!(value["stream"], false);
        assert!(value.get("options").is_none());
    }

    #[test]
    fn test_sanitize_api_error() {
        assert!(sanitize_api_error("model 'x' not found, try pulling it first").contains("pull"));
        assert!(sanitize_api_error("open /root/.ollama/id: denied").contains("internal"));
    }
}
