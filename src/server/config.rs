//! Server configuration types
//!
//! Every section has serde defaults so a partial file (or none at all)
//! still yields a runnable configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use vigil_core::guardian::default_tool_rules;
use vigil_core::{
    ExecutorConfig, GuardianConfig, OrchestratorConfig, RegistryConfig, RetryConfig, ThreatLevel,
    ToolRule,
};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub registry: RegistrySection,
    #[serde(default)]
    pub guardian: GuardianSection,
    #[serde(default)]
    pub partner: PartnerSection,
    #[serde(default)]
    pub manager: ManagerSection,
    #[serde(default)]
    pub overseer: OverseerSection,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub services: ServicesConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8700,
        }
    }
}

impl ServerConfig {
    /// Base URL peers use to reach this instance
    pub fn public_url(&self) -> String {
        let host = if self.host == "0.0.0.0" { "127.0.0.1" } else { &self.host };
        format!("http://{}:{}", host, self.port)
    }
}

/// Registry and self-registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySection {
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Name this instance registers under
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    #[serde(default = "default_register_retry_secs")]
    pub register_retry_secs: u64,
    /// Deadline for one call to the directory
    #[serde(default = "default_register_timeout_secs")]
    pub register_timeout_secs: u64,
}

fn default_ttl_secs() -> u64 {
    60
}
fn default_sweep_interval_secs() -> u64 {
    10
}
fn default_service_name() -> String {
    "vigil".to_string()
}
fn default_heartbeat_secs() -> u64 {
    45
}
fn default_register_retry_secs() -> u64 {
    5
}
fn default_register_timeout_secs() -> u64 {
    10
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            service_name: default_service_name(),
            heartbeat_secs: default_heartbeat_secs(),
            register_retry_secs: default_register_retry_secs(),
            register_timeout_secs: default_register_timeout_secs(),
        }
    }
}

impl RegistrySection {
    pub fn to_core(&self) -> RegistryConfig {
        RegistryConfig::default()
            .with_default_ttl(Duration::from_secs(self.default_ttl_secs))
            .with_sweep_interval(Duration::from_secs(self.sweep_interval_secs.max(1)))
    }
}

/// Decision engine thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianSection {
    #[serde(default = "default_deny_threshold")]
    pub deny_threshold: f64,
    #[serde(default = "default_review_threshold")]
    pub review_threshold: f64,
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: f64,
    #[serde(default = "default_min_step_similarity")]
    pub min_step_similarity: f64,
    #[serde(default = "default_max_plan_steps")]
    pub max_plan_steps: usize,
    /// low | medium | high | critical
    #[serde(default = "default_block_level")]
    pub injection_block_level: String,
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
    #[serde(default = "default_fallback_timeout_secs")]
    pub fallback_timeout_secs: u64,
    /// Argument rules keyed by tool name
    #[serde(default = "default_tool_rules")]
    pub tool_rules: HashMap<String, ToolRule>,
}

fn default_deny_threshold() -> f64 {
    0.90
}
fn default_review_threshold() -> f64 {
    0.70
}
fn default_warn_threshold() -> f64 {
    0.30
}
fn default_min_step_similarity() -> f64 {
    0.10
}
fn default_max_plan_steps() -> usize {
    10
}
fn default_block_level() -> String {
    "medium".to_string()
}
fn default_store_timeout_secs() -> u64 {
    5
}
fn default_fallback_timeout_secs() -> u64 {
    30
}

impl Default for GuardianSection {
    fn default() -> Self {
        Self {
            deny_threshold: default_deny_threshold(),
            review_threshold: default_review_threshold(),
            warn_threshold: default_warn_threshold(),
            min_step_similarity: default_min_step_similarity(),
            max_plan_steps: default_max_plan_steps(),
            injection_block_level: default_block_level(),
            store_timeout_secs: default_store_timeout_secs(),
            fallback_timeout_secs: default_fallback_timeout_secs(),
            tool_rules: default_tool_rules(),
        }
    }
}

impl GuardianSection {
    pub fn to_core(&self) -> Result<GuardianConfig> {
        if !(self.warn_threshold <= self.review_threshold
            && self.review_threshold <= self.deny_threshold)
        {
            anyhow::bail!(
                "guardian thresholds must satisfy warn <= review <= deny (got {} / {} / {})",
                self.warn_threshold,
                self.review_threshold,
                self.deny_threshold
            );
        }
        let level = ThreatLevel::from_str(&self.injection_block_level)
            .context("Invalid guardian.injection_block_level")?;
        Ok(GuardianConfig::default()
            .with_thresholds(self.deny_threshold, self.review_threshold, self.warn_threshold)
            .with_min_step_similarity(self.min_step_similarity)
            .with_max_plan_steps(self.max_plan_steps)
            .with_block_level(level)
            .with_store_timeout(Duration::from_secs(self.store_timeout_secs))
            .with_fallback_timeout(Duration::from_secs(self.fallback_timeout_secs))
            .with_tool_rules(self.tool_rules.clone()))
    }
}

/// Step executor limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerSection {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_reasoning_timeout_secs")]
    pub reasoning_timeout_secs: u64,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

fn default_max_iterations() -> usize {
    6
}
fn default_history_window() -> usize {
    3
}
fn default_reasoning_timeout_secs() -> u64 {
    60
}
fn default_tool_timeout_secs() -> u64 {
    120
}

impl Default for PartnerSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            history_window: default_history_window(),
            reasoning_timeout_secs: default_reasoning_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl PartnerSection {
    pub fn to_core(&self) -> ExecutorConfig {
        ExecutorConfig::default()
            .with_max_iterations(self.max_iterations)
            .with_history_window(self.history_window)
            .with_reasoning_timeout(Duration::from_secs(self.reasoning_timeout_secs))
            .with_tool_timeout(Duration::from_secs(self.tool_timeout_secs))
    }
}

/// Orchestrator retries and deadlines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerSection {
    #[serde(default = "default_max_step_attempts")]
    pub max_step_attempts: u32,
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    #[serde(default = "default_planning_timeout_secs")]
    pub planning_timeout_secs: u64,
    #[serde(default = "default_validation_timeout_secs")]
    pub validation_timeout_secs: u64,
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    #[serde(default = "default_discovery_timeout_secs")]
    pub discovery_timeout_secs: u64,
}

fn default_max_step_attempts() -> u32 {
    3
}
fn default_retry_initial_delay_ms() -> u64 {
    500
}
fn default_retry_max_delay_ms() -> u64 {
    10_000
}
fn default_planning_timeout_secs() -> u64 {
    60
}
fn default_validation_timeout_secs() -> u64 {
    30
}
fn default_step_timeout_secs() -> u64 {
    300
}
fn default_discovery_timeout_secs() -> u64 {
    5
}

impl Default for ManagerSection {
    fn default() -> Self {
        Self {
            max_step_attempts: default_max_step_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            planning_timeout_secs: default_planning_timeout_secs(),
            validation_timeout_secs: default_validation_timeout_secs(),
            step_timeout_secs: default_step_timeout_secs(),
            discovery_timeout_secs: default_discovery_timeout_secs(),
        }
    }
}

impl ManagerSection {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig::new()
            .with_max_attempts(self.max_step_attempts.max(1))
            .with_initial_delay(Duration::from_millis(self.retry_initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.retry_max_delay_ms))
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    pub fn to_core(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_planning_timeout(Duration::from_secs(self.planning_timeout_secs))
            .with_validation_timeout(Duration::from_secs(self.validation_timeout_secs))
            .with_step_timeout(Duration::from_secs(self.step_timeout_secs))
            .with_retry(self.retry())
    }
}

/// Audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverseerSection {
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

fn default_audit_capacity() -> usize {
    1000
}
fn default_event_bus_capacity() -> usize {
    256
}

impl Default for OverseerSection {
    fn default() -> Self {
        Self {
            audit_capacity: default_audit_capacity(),
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// gemini | ollama | mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    /// Canned answers for the mock provider, served in order
    #[serde(default)]
    pub mock_responses: Vec<String>,
}

fn default_provider() -> String {
    "mock".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            timeout_secs: default_llm_timeout_secs(),
            mock_responses: Vec::new(),
        }
    }
}

/// Where the executor and validator live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    /// Everything in this process
    #[default]
    Local,
    /// Executor and validator are peer instances found through the directory
    Remote,
}

/// Peer wiring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub mode: ServiceMode,
    /// Directory to register with and discover peers from; `None` uses the local registry
    #[serde(default)]
    pub directory_url: Option<String>,
    /// Registered name of the step executor peer
    #[serde(default = "default_partner_name")]
    pub partner: String,
    /// Registered name of the validator peer
    #[serde(default = "default_guardian_name")]
    pub guardian: String,
}

fn default_partner_name() -> String {
    "partner".to_string()
}
fn default_guardian_name() -> String {
    "guardian".to_string()
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            mode: ServiceMode::Local,
            directory_url: None,
            partner: default_partner_name(),
            guardian: default_guardian_name(),
        }
    }
}
