#![forbid(unsafe_code)]

//! Telemetry collector: reads every machine endpoint on a fixed period and
//! persists snapshots that changed since the last successful write.

pub mod config;
pub mod cycle;
pub mod endpoint;
pub mod gateway;
pub mod pipeline;
pub mod reader;
pub mod store;

pub use config::{CollectorConfig, StoreConfig};
pub use cycle::{CollectorCycle, CycleBatch};
pub use endpoint::{Endpoint, EndpointError};
pub use gateway::{GateError, PersistenceGateway, ReadinessGate};
pub use pipeline::{Collector, CycleReport};
pub use reader::{CollectError, DeviceReader, HttpDeviceReader};
pub use store::{MemoryStore, StoreConnector, StoreError, TelemetryRow, TelemetryStore};
