use std::fmt;
use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::gateway::ReadinessGate;

/// Where and how to reach the durable store.
#[derive(Clone)]
pub struct StoreConfig {
    /// SurrealDB endpoint, e.g. `ws://db:8000` or `mem://`.
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    /// Empty means no sign-in.
    pub username: String,
    pub password: String,
}

// Keeps the password out of logs.
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("endpoint", &self.endpoint)
            .field("namespace", &self.namespace)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub endpoints: Vec<Endpoint>,
    pub interval: Duration,
    pub read_timeout: Duration,
    pub store_attempts: u32,
    pub store_retry_delay: Duration,
    pub store: StoreConfig,
}

impl CollectorConfig {
    pub fn readiness_gate(&self) -> ReadinessGate {
        ReadinessGate::new(self.store_attempts, self.store_retry_delay)
    }
}
