//! Component wiring
//!
//! Builds every engine component from [`AppConfig`] and exposes them to
//! the HTTP layer as axum extensions.

use super::adapters::{DirectoryClient, PeerClient, RemotePolicyGate, RemoteStepRunner};
use super::config::{AppConfig, ServiceMode};
use crate::hub::{KnowledgeHub, SimulatedTools};
use anyhow::Result;
use axum::{Extension, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use vigil_core::{
    AuditLog, DecisionEngine, Discovery, EventBus, LlmOracle, LocalKillSwitch, OracleConfig,
    Orchestrator, PolicyGate, Registrar, ServiceRegistry, SharedKnowledgeStore, StepExecutor,
    StepRunner,
};
use vigil_llm::SharedLlmProvider;

/// Every long-lived component of a vigil process
pub struct Components {
    pub config: AppConfig,
    pub event_bus: Arc<EventBus>,
    pub registry: Arc<ServiceRegistry>,
    pub audit: Arc<AuditLog>,
    pub kill_switch: Arc<LocalKillSwitch>,
    pub hub: Arc<KnowledgeHub>,
    pub engine: Arc<DecisionEngine>,
    pub executor: Arc<StepExecutor>,
    pub orchestrator: Arc<Orchestrator>,
    directory: Option<Arc<DirectoryClient>>,
}

impl Components {
    /// Wire the components for `config` around one LLM provider
    pub fn build(config: AppConfig, provider: SharedLlmProvider) -> Result<Self> {
        let event_bus = Arc::new(EventBus::new(config.overseer.event_bus_capacity));
        let registry = Arc::new(ServiceRegistry::new(config.registry.to_core()));
        let audit = Arc::new(
            AuditLog::new(config.overseer.audit_capacity).with_event_bus(event_bus.clone()),
        );
        let kill_switch = Arc::new(LocalKillSwitch::new().with_event_bus(event_bus.clone()));
        let hub = Arc::new(KnowledgeHub::seeded());
        let store: SharedKnowledgeStore = hub.clone();

        let mut oracle_config = OracleConfig::new();
        if let Some(model) = &config.llm.model {
            oracle_config = oracle_config.with_model(model);
        }
        let oracle = Arc::new(LlmOracle::new(provider).with_config(oracle_config));
        info!(provider = %oracle.provider_name(), "Oracle ready");

        let engine = Arc::new(
            DecisionEngine::new(store.clone(), config.guardian.to_core()?)
                .with_classifier(oracle.clone())
                .with_audit(audit.clone()),
        );
        info!(classifier = engine.has_classifier(), "Decision engine ready");
        let executor = Arc::new(
            StepExecutor::new(
                store,
                oracle.clone(),
                engine.clone(),
                Arc::new(SimulatedTools::new()),
                config.partner.to_core(),
            )
            .with_audit(audit.clone()),
        );

        let directory = match &config.services.directory_url {
            Some(url) => Some(Arc::new(DirectoryClient::new(
                url,
                config.manager.discovery_timeout(),
            )?)),
            None => None,
        };

        let (gate, runner): (Arc<dyn PolicyGate>, Arc<dyn StepRunner>) = match config.services.mode
        {
            ServiceMode::Local => {
                let gate: Arc<dyn PolicyGate> = engine.clone();
                let runner: Arc<dyn StepRunner> = executor.clone();
                (gate, runner)
            }
            ServiceMode::Remote => {
                let discovery: Arc<dyn Discovery> = match &directory {
                    Some(d) => d.clone(),
                    None => registry.clone(),
                };
                let manager = &config.manager;
                let guardian = PeerClient::new(
                    config.services.guardian.clone(),
                    discovery.clone(),
                    manager.retry(),
                    manager.discovery_timeout(),
                    Duration::from_secs(manager.validation_timeout_secs),
                )?;
                let partner = PeerClient::new(
                    config.services.partner.clone(),
                    discovery,
                    manager.retry(),
                    manager.discovery_timeout(),
                    Duration::from_secs(manager.step_timeout_secs),
                )?;
                info!(
                    guardian = %config.services.guardian,
                    partner = %config.services.partner,
                    "Using remote validator and executor"
                );
                let gate: Arc<dyn PolicyGate> = Arc::new(RemotePolicyGate::new(guardian));
                let runner: Arc<dyn StepRunner> = Arc::new(RemoteStepRunner::new(partner));
                (gate, runner)
            }
        };

        let orchestrator = Arc::new(
            Orchestrator::new(
                oracle,
                gate,
                runner,
                kill_switch.clone(),
                config.manager.to_core(),
            )
            .with_audit(audit.clone())
            .with_event_bus(event_bus.clone()),
        );

        Ok(Self {
            config,
            event_bus,
            registry,
            audit,
            kill_switch,
            hub,
            engine,
            executor,
            orchestrator,
            directory,
        })
    }

    /// Where this process registers itself: the remote directory when one
    /// is configured, otherwise its own registry.
    pub fn registrar(&self) -> Arc<dyn Registrar> {
        match &self.directory {
            Some(d) => d.clone(),
            None => self.registry.clone(),
        }
    }

    /// The HTTP application with every component attached
    pub fn router(&self) -> Router {
        crate::api::api_router()
            .layer(Extension(self.registry.clone()))
            .layer(Extension(self.engine.clone()))
            .layer(Extension(self.executor.clone()))
            .layer(Extension(self.orchestrator.clone()))
            .layer(Extension(self.audit.clone()))
            .layer(Extension(self.kill_switch.clone()))
            .layer(Extension(self.hub.clone()))
            .layer(Extension(self.event_bus.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }
}
