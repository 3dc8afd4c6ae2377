//! Startup readiness gate and the steady-state write path.

use std::time::Duration;

use shopfloor_core::Snapshot;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::store::{StoreConnector, StoreError, TelemetryRow, TelemetryStore};

#[derive(Debug, Error)]
pub enum GateError {
    #[error("store not ready after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        last: StoreError,
    },
}

/// Bounded retry of store connection plus schema setup.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessGate {
    max_attempts: u32,
    delay: Duration,
}

impl ReadinessGate {
    /// At least one attempt is always made.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Try to connect until it works or the attempts run out, sleeping
    /// `delay` between attempts. Exhaustion must abort startup.
    pub async fn open<C: StoreConnector>(
        &self,
        connector: &C,
    ) -> Result<PersistenceGateway<C::Store>, GateError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match connector.connect().await {
                Ok(store) => {
                    info!(attempt, "store ready");
                    return Ok(PersistenceGateway::new(store));
                }
                Err(err) if attempt >= self.max_attempts => {
                    error!(attempt, error = %err, "store never became ready");
                    return Err(GateError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        retry_in_ms = self.delay.as_millis() as u64,
                        error = %err,
                        "store not ready"
                    );
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}

/// Write path for write-worthy snapshots. At most one attempt per snapshot;
/// the caller decides what a failure means.
#[derive(Debug)]
pub struct PersistenceGateway<S> {
    store: S,
}

impl<S: TelemetryStore> PersistenceGateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn write(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.store.insert(TelemetryRow::from(snapshot)).await
    }
}
