use std::future::Future;

use surrealdb::engine::any::{connect, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::debug;

use super::{StoreConnector, StoreError, TelemetryRow, TelemetryStore};
use crate::config::StoreConfig;

const SCHEMA: &str = include_str!("schema.surql");

/// SurrealDB-backed store. The `any` engine picks the transport from the
/// endpoint scheme (`ws://`, `mem://`).
#[derive(Clone)]
pub struct SurrealStore {
    inner: Surreal<Any>,
}

impl SurrealStore {
    /// Connect, sign in when a user is configured, select the namespace and
    /// database, then apply the schema.
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let inner = connect(config.endpoint.as_str()).await.map_err(unavailable)?;

        if !config.username.is_empty() {
            inner
                .signin(Root {
                    username: &config.username,
                    password: &config.password,
                })
                .await
                .map_err(unavailable)?;
        }

        inner
            .use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await
            .map_err(unavailable)?;

        let store = Self { inner };
        store.apply_schema().await?;
        debug!(endpoint = %config.endpoint, "store schema applied");
        Ok(store)
    }

    pub fn inner(&self) -> &Surreal<Any> {
        &self.inner
    }

    async fn apply_schema(&self) -> Result<(), StoreError> {
        self.inner
            .query(SCHEMA)
            .await
            .and_then(|resp| resp.check())
            .map_err(|err| StoreError::Schema(err.to_string()))?;
        Ok(())
    }

    async fn create(&self, row: TelemetryRow) -> Result<(), StoreError> {
        self.inner
            .query("CREATE machine_telemetry CONTENT $row RETURN NONE;")
            .bind(("row", row))
            .await
            .and_then(|resp| resp.check())
            .map_err(|err| StoreError::Insert(err.to_string()))?;
        Ok(())
    }
}

fn unavailable(err: surrealdb::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

impl TelemetryStore for SurrealStore {
    fn insert(&self, row: TelemetryRow) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.create(row)
    }
}

/// Opens a [`SurrealStore`] per readiness attempt.
#[derive(Debug, Clone)]
pub struct SurrealConnector {
    config: StoreConfig,
}

impl SurrealConnector {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }
}

impl StoreConnector for SurrealConnector {
    type Store = SurrealStore;

    fn connect(&self) -> impl Future<Output = Result<Self::Store, StoreError>> + Send {
        SurrealStore::open(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_config() -> StoreConfig {
        StoreConfig {
            endpoint: "mem://".to_string(),
            namespace: "shopfloor".to_string(),
            database: "test".to_string(),
            username: String::new(),
            password: String::new(),
        }
    }

    fn row(status: &str) -> TelemetryRow {
        TelemetryRow {
            machine_id: "cnc_1".to_string(),
            status: status.to_string(),
            production_total: 3,
            axis_x: 1.25,
            active_alarms: "[]".to_string(),
        }
    }

    #[tokio::test]
    async fn inserts_append_rows() {
        let store = SurrealConnector::new(mem_config()).connect().await.unwrap();
        store.insert(row("RUNNING")).await.unwrap();
        store.insert(row("IDLE")).await.unwrap();

        let mut resp = store
            .inner()
            .query(
                "SELECT machine_id, status, production_total, axis_x, active_alarms \
                 FROM machine_telemetry",
            )
            .await
            .unwrap();
        let mut rows: Vec<TelemetryRow> = resp.take(0).unwrap();
        rows.sort_by(|a, b| a.status.cmp(&b.status));
        assert_eq!(rows, vec![row("IDLE"), row("RUNNING")]);
    }

    #[tokio::test]
    async fn store_stamps_each_row() {
        let store = SurrealConnector::new(mem_config()).connect().await.unwrap();
        store.insert(row("RUNNING")).await.unwrap();

        let mut resp = store
            .inner()
            .query(
                "SELECT VALUE type::is::datetime(timestamp) \
                 AND timestamp <= time::now() FROM machine_telemetry",
            )
            .await
            .unwrap();
        let stamped: Vec<bool> = resp.take(0).unwrap();
        assert_eq!(stamped, vec![true]);
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let store = SurrealStore::open(&mem_config()).await.unwrap();
        store.apply_schema().await.unwrap();
    }

    #[tokio::test]
    async fn schema_rejects_wrong_types() {
        let store = SurrealStore::open(&mem_config()).await.unwrap();
        let res = store
            .inner()
            .query("CREATE machine_telemetry CONTENT { machine_id: 'cnc_1', status: 'IDLE', production_total: 'many', axis_x: 0.0, active_alarms: '[]' };")
            .await
            .unwrap()
            .check();
        assert!(res.is_err());
    }
}
