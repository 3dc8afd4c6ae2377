//! Suppresses writes of snapshots that match the last persisted one.

use std::collections::HashMap;

use crate::snapshot::Snapshot;

/// Last successfully persisted snapshot per machine.
///
/// Entries are created on the first successful write for a machine and are
/// only replaced, never removed. Callers record a snapshot *after* the store
/// accepted it, so a failed write is retried on the next cycle.
#[derive(Debug, Default)]
pub struct ChangeFilter {
    last_persisted: HashMap<String, Snapshot>,
}

impl ChangeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the snapshot differs from the last persisted one for its
    /// machine, or when the machine has never been persisted.
    pub fn is_write_worthy(&self, snapshot: &Snapshot) -> bool {
        self.last_persisted
            .get(snapshot.machine_id())
            .map_or(true, |last| last != snapshot)
    }

    /// Remember `snapshot` as the last one the store accepted.
    pub fn record_persisted(&mut self, snapshot: Snapshot) {
        self.last_persisted
            .insert(snapshot.machine_id().to_string(), snapshot);
    }

    pub fn last_persisted(&self, machine_id: &str) -> Option<&Snapshot> {
        self.last_persisted.get(machine_id)
    }

    /// Machines with a persisted snapshot.
    pub fn len(&self) -> usize {
        self.last_persisted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_persisted.is_empty()
    }
}
