use std::net::SocketAddr;
use std::time::Duration;

use shopfloor_core::AgentOrder;

/// Settings for one simulated machine.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub machine_id: String,
    pub listen: SocketAddr,
    pub tick: Duration,
    /// Fixed seed for reproducible runs; OS entropy when absent.
    pub seed: Option<u64>,
    pub agent_order: AgentOrder,
}

impl SimulatorConfig {
    pub fn new(machine_id: impl Into<String>, listen: SocketAddr) -> Self {
        Self {
            machine_id: machine_id.into(),
            listen,
            tick: Duration::from_secs(1),
            seed: None,
            agent_order: AgentOrder::default(),
        }
    }
}
