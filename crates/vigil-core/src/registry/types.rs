use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// A registered service.
///
/// `refreshed` is the monotonic instant of the last register/heartbeat and
/// is what expiry is computed from; `registered_at` is for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Unique service name
    pub name: String,
    /// Base URL or socket address
    pub address: String,
    /// Wall-clock time of the last refresh
    pub registered_at: DateTime<Utc>,
    /// Time to live in seconds
    pub ttl_secs: u64,
    #[serde(skip, default = "Instant::now")]
    pub(crate) refreshed: Instant,
}

impl ServiceRecord {
    pub(crate) fn new(name: String, address: String, ttl: Duration) -> Self {
        Self {
            name,
            address,
            registered_at: Utc::now(),
            ttl_secs: ttl.as_secs(),
            refreshed: Instant::now(),
        }
    }

    /// Whether `registered_at + ttl` has elapsed at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.refreshed) >= Duration::from_secs(self.ttl_secs)
    }

    /// Seconds until expiry (zero once expired)
    #[must_use]
    pub fn remaining_secs(&self) -> u64 {
        Duration::from_secs(self.ttl_secs)
            .saturating_sub(self.refreshed.elapsed())
            .as_secs()
    }
}

/// Registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// TTL applied when a registration does not carry one
    pub default_ttl: Duration,
    /// Interval of the background purge; expiry is enforced on read regardless
    pub sweep_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(10),
        }
    }
}

impl RegistryConfig {
    /// Set the default TTL
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the sweep interval
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// Timing of the self-registration heartbeat
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// TTL sent with every registration
    pub ttl: Duration,
    /// Interval between refreshes once registered
    pub interval: Duration,
    /// Pause between failed registration attempts
    pub retry_every: Duration,
    /// Deadline for a single register or deregister call
    pub call_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            interval: Duration::from_secs(45),
            retry_every: Duration::from_secs(5),
            call_timeout: Duration::from_secs(10),
        }
    }
}

impl HeartbeatConfig {
    /// Set the registration TTL
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the refresh interval
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the retry pause
    #[must_use]
    pub fn with_retry_every(mut self, retry_every: Duration) -> Self {
        self.retry_every = retry_every;
        self
    }

    /// Set the per-call deadline
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}
