#![forbid(unsafe_code)]

//! Simulated CNC machine exposed over the device access channel.

pub mod address_space;
pub mod config;
pub mod engine;
pub mod http;
pub mod node;

pub use address_space::{AddressSpace, ChannelError};
pub use config::SimulatorConfig;
pub use engine::SimulationLoop;
pub use node::{MachineNode, Publisher};

use shopfloor_core::{MachineState, SimRng, SystemClock};

/// A simulation loop on the wall clock, publishing into an address space.
pub type Machine = SimulationLoop<SystemClock, SimRng, MachineNode>;

/// Build the address space and the machine's loop. The machine object is
/// registered with its initial reading before this returns.
pub fn build(config: &SimulatorConfig) -> Result<(AddressSpace, Machine), ChannelError> {
    let machine = MachineState::new(config.machine_id.clone());
    let space = AddressSpace::new();
    let node = MachineNode::register(space.clone(), &machine.reading())?;

    let mut root = config.seed.map_or_else(SimRng::from_os, SimRng::new);
    let agents_rng = root.fork();
    let physics_rng = root.fork();

    let sim = SimulationLoop::new(machine, SystemClock, agents_rng, physics_rng, node)
        .with_order(config.agent_order);
    Ok((space, sim))
}
