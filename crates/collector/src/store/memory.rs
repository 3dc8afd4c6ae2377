use std::future::Future;
use std::sync::{Arc, Mutex};

use shopfloor_core::{now_ms, EpochMs};

use super::{StoreConnector, StoreError, TelemetryRow, TelemetryStore};

/// A row as the store saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: u64,
    pub row: TelemetryRow,
    pub inserted_at_ms: EpochMs,
}

/// In-memory store for tests and local runs. Not durable.
///
/// Clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    rows: Vec<StoredRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> Vec<StoredRow> {
        self.inner
            .lock()
            .map(|inner| inner.rows.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn append(&self, row: TelemetryRow) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Insert("memory store lock poisoned".to_string()))?;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.push(StoredRow {
            id,
            row,
            inserted_at_ms: now_ms(),
        });
        Ok(())
    }
}

impl TelemetryStore for MemoryStore {
    fn insert(&self, row: TelemetryRow) -> impl Future<Output = Result<(), StoreError>> + Send {
        std::future::ready(self.append(row))
    }
}

/// Always ready; hands out a handle to the same rows.
impl StoreConnector for MemoryStore {
    type Store = MemoryStore;

    fn connect(&self) -> impl Future<Output = Result<Self::Store, StoreError>> + Send {
        std::future::ready(Ok(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(machine_id: &str, total: i64) -> TelemetryRow {
        TelemetryRow {
            machine_id: machine_id.to_string(),
            status: "RUNNING".to_string(),
            production_total: total,
            axis_x: 0.0,
            active_alarms: "[]".to_string(),
        }
    }

    #[tokio::test]
    async fn ids_increase_in_insertion_order() {
        let store = MemoryStore::new();
        store.insert(row("cnc_1", 1)).await.unwrap();
        store.insert(row("cnc_2", 4)).await.unwrap();
        store.insert(row("cnc_1", 2)).await.unwrap();

        let rows = store.rows();
        let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(rows[2].row, row("cnc_1", 2));
    }

    #[tokio::test]
    async fn connected_handle_shares_rows() {
        let store = MemoryStore::new();
        let handle = store.connect().await.unwrap();
        handle.insert(row("cnc_1", 0)).await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
