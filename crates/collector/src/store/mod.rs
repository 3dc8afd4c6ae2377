//! Durable store abstraction for persisted telemetry rows.

use std::future::Future;

use serde::{Deserialize, Serialize};
use shopfloor_core::Snapshot;
use thiserror::Error;

pub mod memory;
pub mod surreal;

pub use memory::{MemoryStore, StoredRow};
pub use surreal::{SurrealConnector, SurrealStore};

/// One append-only row. Ids and insertion timestamps are assigned by the
/// store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRow {
    pub machine_id: String,
    pub status: String,
    pub production_total: i64,
    pub axis_x: f64,
    /// JSON array of alarm codes.
    pub active_alarms: String,
}

impl From<&Snapshot> for TelemetryRow {
    fn from(snapshot: &Snapshot) -> Self {
        let reading = &snapshot.reading;
        Self {
            machine_id: reading.machine_id.clone(),
            status: reading.status.as_str().to_string(),
            production_total: i64::try_from(reading.production_total).unwrap_or(i64::MAX),
            axis_x: reading.axis.x,
            active_alarms: reading.alarms_json(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("schema setup failed: {0}")]
    Schema(String),
    #[error("insert failed: {0}")]
    Insert(String),
}

/// Append-only sink for telemetry rows.
pub trait TelemetryStore: Send + Sync {
    fn insert(&self, row: TelemetryRow) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Opens a store with its schema in place. Called once per readiness attempt.
pub trait StoreConnector: Send + Sync {
    type Store: TelemetryStore;

    fn connect(&self) -> impl Future<Output = Result<Self::Store, StoreError>> + Send;
}
