//! Simulated machine state and its transition rules.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::entropy::Entropy;
use crate::snapshot::MachineReading;

/// Alarm codes the operator can raise.
pub const ALARM_CODES: [&str; 3] = ["E101", "E205", "F303"];

/// Max per-tick drift of each axis while running.
pub const AXIS_DRIFT: f64 = 0.5;

/// Chance per running tick that a part completes.
pub const PART_COMPLETION_PROBABILITY: f64 = 0.005;

/// Spindle speed while running.
pub const RUNNING_SPINDLE_SPEED: f64 = 500.0;

/// Operating status of a machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineStatus {
    /// Powered and waiting for work.
    #[default]
    Idle,
    /// Producing parts.
    Running,
    /// Stopped on an active alarm.
    Alarm,
    /// Repair failed; blocked until parts arrive.
    WaitingForRepair,
}

impl MachineStatus {
    /// Wire form, as exposed on the device channel and persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Alarm => "ALARM",
            Self::WaitingForRepair => "WAITING_FOR_REPAIR",
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status string is not one of the four known values.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown machine status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for MachineStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDLE" => Ok(Self::Idle),
            "RUNNING" => Ok(Self::Running),
            "ALARM" => Ok(Self::Alarm),
            "WAITING_FOR_REPAIR" => Ok(Self::WaitingForRepair),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Axis coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct AxisPosition {
    /// X axis.
    pub x: f64,
    /// Y axis.
    pub y: f64,
    /// Z axis.
    pub z: f64,
}

/// A state change requested by an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Operator starts a production cycle. IDLE -> RUNNING.
    Start,
    /// Operator stops the cycle. RUNNING -> IDLE.
    Stop,
    /// Operator reports a fault. RUNNING -> ALARM.
    Fault {
        /// Alarm code raised.
        code: String,
    },
    /// Technician repair succeeded. ALARM -> IDLE.
    Repair,
    /// Technician repair failed. ALARM -> WAITING_FOR_REPAIR.
    RepairFailed,
    /// Spare parts arrived. WAITING_FOR_REPAIR -> ALARM.
    PartsArrived,
}

impl Transition {
    /// The only status this transition may fire from.
    pub fn required_status(&self) -> MachineStatus {
        match self {
            Self::Start => MachineStatus::Idle,
            Self::Stop | Self::Fault { .. } => MachineStatus::Running,
            Self::Repair | Self::RepairFailed => MachineStatus::Alarm,
            Self::PartsArrived => MachineStatus::WaitingForRepair,
        }
    }

    /// Status after the transition.
    pub fn target_status(&self) -> MachineStatus {
        match self {
            Self::Start => MachineStatus::Running,
            Self::Stop | Self::Repair => MachineStatus::Idle,
            Self::Fault { .. } | Self::PartsArrived => MachineStatus::Alarm,
            Self::RepairFailed => MachineStatus::WaitingForRepair,
        }
    }
}

/// Mutable record for one simulated machine.
///
/// Invariant: `active_alarms` is non-empty exactly when the status is
/// [`MachineStatus::Alarm`]. While WAITING_FOR_REPAIR the alarm that caused
/// the block is held off the observable set and re-raised when parts arrive.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineState {
    machine_id: String,
    status: MachineStatus,
    production_total: u64,
    axis: AxisPosition,
    spindle_speed: f64,
    active_alarms: BTreeSet<String>,
    held_alarms: BTreeSet<String>,
}

impl MachineState {
    /// New machine, IDLE, at the origin.
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            status: MachineStatus::Idle,
            production_total: 0,
            axis: AxisPosition::default(),
            spindle_speed: 0.0,
            active_alarms: BTreeSet::new(),
            held_alarms: BTreeSet::new(),
        }
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    pub fn status(&self) -> MachineStatus {
        self.status
    }

    pub fn production_total(&self) -> u64 {
        self.production_total
    }

    pub fn axis(&self) -> AxisPosition {
        self.axis
    }

    pub fn spindle_speed(&self) -> f64 {
        self.spindle_speed
    }

    pub fn active_alarms(&self) -> &BTreeSet<String> {
        &self.active_alarms
    }

    /// Apply a transition if its guard holds. Returns whether anything
    /// changed; a failed guard is a silent no-op.
    pub fn apply(&mut self, transition: &Transition) -> bool {
        if self.status != transition.required_status() {
            return false;
        }

        match transition {
            Transition::Start => {
                info!(machine = %self.machine_id, "production cycle started");
            }
            Transition::Stop => {
                info!(machine = %self.machine_id, "production cycle stopped");
            }
            Transition::Fault { code } => {
                self.active_alarms.clear();
                self.active_alarms.insert(code.clone());
                info!(machine = %self.machine_id, alarm = %code, "alarm raised");
            }
            Transition::Repair => {
                self.active_alarms.clear();
                info!(machine = %self.machine_id, "repair succeeded; alarm cleared");
            }
            Transition::RepairFailed => {
                self.held_alarms = std::mem::take(&mut self.active_alarms);
                info!(machine = %self.machine_id, "repair failed; waiting for parts");
            }
            Transition::PartsArrived => {
                self.active_alarms = std::mem::take(&mut self.held_alarms);
                info!(machine = %self.machine_id, "repair parts arrived");
            }
        }

        self.status = transition.target_status();
        if self.status != MachineStatus::Running {
            self.spindle_speed = 0.0;
        }
        true
    }

    /// Continuous evolution for one tick. Only a running machine moves or
    /// produces.
    pub fn evolve<E: Entropy + ?Sized>(&mut self, rng: &mut E) {
        if self.status != MachineStatus::Running {
            self.spindle_speed = 0.0;
            return;
        }

        self.axis.x += rng.uniform(-AXIS_DRIFT, AXIS_DRIFT);
        self.axis.y += rng.uniform(-AXIS_DRIFT, AXIS_DRIFT);
        self.axis.z += rng.uniform(-AXIS_DRIFT, AXIS_DRIFT);
        self.spindle_speed = RUNNING_SPINDLE_SPEED;

        if rng.chance(PART_COMPLETION_PROBABILITY) {
            self.production_total += 1;
            info!(
                machine = %self.machine_id,
                part = self.production_total,
                "part completed"
            );
        }
    }

    /// Fixed-shape copy of every observable field.
    pub fn reading(&self) -> MachineReading {
        MachineReading {
            machine_id: self.machine_id.clone(),
            status: self.status,
            production_total: self.production_total,
            axis: self.axis,
            spindle_speed: self.spindle_speed,
            active_alarms: self.active_alarms.clone(),
        }
    }
}
