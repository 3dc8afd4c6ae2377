#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared models and logic for the shopfloor simulator and collector.

pub mod agent;
pub mod change_filter;
pub mod channel;
pub mod clock;
pub mod entropy;
pub mod machine;
pub mod snapshot;

mod time;

pub use agent::{ActionAgent, AgentOrder, Role};
pub use change_filter::ChangeFilter;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entropy::{Entropy, ScriptedEntropy, SimRng};
pub use machine::{AxisPosition, MachineState, MachineStatus, Transition, ALARM_CODES};
pub use snapshot::{MachineReading, Snapshot};
pub use time::{now_ms, EpochMs};
