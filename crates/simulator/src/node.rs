use shopfloor_core::channel::{encode_reading, machine_namespace};
use shopfloor_core::MachineReading;

use crate::address_space::{AddressSpace, ChannelError};

/// Destination for a machine's per-tick reading.
pub trait Publisher: Send {
    /// Write every field. Any error is fatal for the simulated machine.
    fn publish(&mut self, reading: &MachineReading) -> Result<(), ChannelError>;
}

/// A machine's object in the address space.
#[derive(Debug, Clone)]
pub struct MachineNode {
    space: AddressSpace,
    ns: u16,
    object: String,
}

impl MachineNode {
    /// Register the machine's namespace and object and declare every variable
    /// with the reading's values, so the object is complete before the first
    /// tick.
    pub fn register(space: AddressSpace, reading: &MachineReading) -> Result<Self, ChannelError> {
        let object = reading.machine_id.clone();
        let ns = space.register_namespace(&machine_namespace(&object))?;
        space.add_object(ns, &object)?;
        for (name, value) in encode_reading(reading) {
            space.add_variable(ns, &object, name, value)?;
        }
        Ok(Self { space, ns, object })
    }

    pub fn namespace_index(&self) -> u16 {
        self.ns
    }

    pub fn object(&self) -> &str {
        &self.object
    }
}

impl Publisher for MachineNode {
    fn publish(&mut self, reading: &MachineReading) -> Result<(), ChannelError> {
        self.space
            .write_all(self.ns, &self.object, encode_reading(reading))
    }
}
