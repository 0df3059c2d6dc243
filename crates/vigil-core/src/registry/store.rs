use super::client::{Discovery, Registrar};
use super::types::{RegistryConfig, ServiceRecord};
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// In-memory service directory with lazy TTL expiry.
///
/// Each name is its own DashMap entry, so concurrent registrations for
/// different services never contend on a shared lock.
pub struct ServiceRegistry {
    services: DashMap<String, ServiceRecord>,
    config: RegistryConfig,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl ServiceRegistry {
    /// Create a registry
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            services: DashMap::new(),
            config,
        }
    }

    /// Registry configuration
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Upsert a record and reset its expiry clock.
    pub fn register(
        &self,
        name: &str,
        address: &str,
        ttl: Option<Duration>,
    ) -> Result<ServiceRecord> {
        let name = name.trim();
        let address = address.trim().trim_end_matches('/');
        if name.is_empty() {
            return Err(Error::InvalidInput("service name is empty".to_string()));
        }
        if address.is_empty() {
            return Err(Error::InvalidInput("service address is empty".to_string()));
        }

        let ttl = ttl
            .filter(|t| !t.is_zero())
            .unwrap_or(self.config.default_ttl);
        let record = ServiceRecord::new(name.to_string(), address.to_string(), ttl);
        self.services.insert(name.to_string(), record.clone());

        info!(service = %name, address = %address, ttl_secs = ttl.as_secs(), "Service registered");
        Ok(record)
    }

    /// Resolve a live record, trying the usual name spellings in order.
    pub fn lookup(&self, name: &str) -> Result<ServiceRecord> {
        let now = Instant::now();
        for candidate in name_variants(name.trim()) {
            if let Some(entry) = self.services.get(&candidate) {
                if !entry.is_expired_at(now) {
                    return Ok(entry.clone());
                }
            }
        }
        Err(Error::NotFound(format!("service '{}'", name)))
    }

    /// Address of a live service, or `NotFound` if missing or expired.
    pub fn discover(&self, name: &str) -> Result<String> {
        self.lookup(name).map(|r| r.address)
    }

    /// Unexpired records, sorted by name
    #[must_use]
    pub fn list(&self) -> Vec<ServiceRecord> {
        let now = Instant::now();
        let mut records: Vec<ServiceRecord> = self
            .services
            .iter()
            .filter(|e| !e.is_expired_at(now))
            .map(|e| e.value().clone())
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Remove a record by exact name
    pub fn deregister(&self, name: &str) -> Result<()> {
        match self.services.remove(name.trim()) {
            Some(_) => {
                info!(service = %name, "Service deregistered");
                Ok(())
            }
            None => Err(Error::NotFound(format!("service '{}'", name))),
        }
    }

    /// Drop expired records, returning their names
    pub fn purge_expired(&self) -> Vec<String> {
        let now = Instant::now();
        let mut removed = Vec::new();
        self.services.retain(|name, record| {
            let keep = !record.is_expired_at(now);
            if !keep {
                removed.push(name.clone());
            }
            keep
        });
        if !removed.is_empty() {
            debug!(services = ?removed, "Purged expired services");
        }
        removed
    }

    /// Spawn the periodic purge; stops when `token` is cancelled.
    pub fn spawn_sweeper(self: &Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        registry.purge_expired();
                    }
                }
            }
            debug!("Registry sweeper stopped");
        })
    }
}

/// Exact name, `{name}-service`, then `_`/`-` swapped spellings.
fn name_variants(name: &str) -> Vec<String> {
    let mut variants = vec![
        name.to_string(),
        format!("{}-service", name),
        name.replace('_', "-"),
        name.replace('-', "_"),
    ];
    let mut seen = std::collections::HashSet::new();
    variants.retain(|v| seen.insert(v.clone()));
    variants
}

#[async_trait::async_trait]
impl Discovery for ServiceRegistry {
    async fn discover(&self, name: &str) -> Result<String> {
        ServiceRegistry::discover(self, name)
    }
}

#[async_trait::async_trait]
impl Registrar for ServiceRegistry {
    async fn register(&self, name: &str, address: &str, ttl: Duration) -> Result<()> {
        ServiceRegistry::register(self, name, address, Some(ttl)).map(|_| ())
    }

    async fn deregister(&self, name: &str) -> Result<()> {
        ServiceRegistry::deregister(self, name)
    }
}
