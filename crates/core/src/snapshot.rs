use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::machine::{AxisPosition, MachineStatus};
use crate::time::EpochMs;

/// Every observable field of one machine, without a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MachineReading {
    /// Stable machine identifier.
    pub machine_id: String,
    /// Operating status.
    pub status: MachineStatus,
    /// Parts completed since start.
    pub production_total: u64,
    /// Axis coordinates.
    pub axis: AxisPosition,
    /// Spindle speed; zero unless running.
    pub spindle_speed: f64,
    /// Active alarm codes.
    pub active_alarms: BTreeSet<String>,
}

impl MachineReading {
    /// Alarm codes as a JSON array string, e.g. `["E101"]`.
    pub fn alarms_json(&self) -> String {
        serde_json::to_string(&self.active_alarms).unwrap_or_else(|_| "[]".to_string())
    }
}

/// A reading stamped with the instant it was observed.
///
/// Two snapshots are equal when their readings are equal; the timestamp is
/// ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the collector observed the reading.
    pub observed_at_ms: EpochMs,
    /// The observed fields.
    pub reading: MachineReading,
}

impl Snapshot {
    /// Stamp a reading.
    pub fn new(reading: MachineReading, observed_at_ms: EpochMs) -> Self {
        Self {
            observed_at_ms,
            reading,
        }
    }

    pub fn machine_id(&self) -> &str {
        &self.reading.machine_id
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.reading == other.reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::MachineState;

    #[test]
    fn equality_ignores_timestamp() {
        let reading = MachineState::new("cnc_1").reading();
        let a = Snapshot::new(reading.clone(), 1_000);
        let b = Snapshot::new(reading, 11_000);
        assert_eq!(a, b);
    }

    #[test]
    fn equality_sees_every_field() {
        let base = MachineState::new("cnc_1").reading();

        let mut moved = base.clone();
        moved.axis.z = 0.1;
        assert_ne!(Snapshot::new(base.clone(), 0), Snapshot::new(moved, 0));

        let mut spun = base.clone();
        spun.spindle_speed = 500.0;
        assert_ne!(Snapshot::new(base.clone(), 0), Snapshot::new(spun, 0));

        let mut other = base.clone();
        other.machine_id = "cnc_2".into();
        assert_ne!(Snapshot::new(base, 0), Snapshot::new(other, 0));
    }

    #[test]
    fn alarms_serialize_as_json_array() {
        let mut reading = MachineState::new("cnc_1").reading();
        assert_eq!(reading.alarms_json(), "[]");
        reading.active_alarms.insert("E101".into());
        assert_eq!(reading.alarms_json(), r#"["E101"]"#);
    }
}
