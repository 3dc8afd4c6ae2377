use std::time::Duration;

use shopfloor_core::{ActionAgent, AgentOrder, Clock, Entropy, MachineState, Transition};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::address_space::ChannelError;
use crate::node::Publisher;

/// Drives one simulated machine: agents act, physics evolve, the reading is
/// published. One call to [`SimulationLoop::tick`] per period.
///
/// Agents and physics draw from separate streams so a change in how often
/// agents fire does not shift the physics sequence.
pub struct SimulationLoop<C, E, P> {
    machine: MachineState,
    operator: ActionAgent,
    technician: ActionAgent,
    order: AgentOrder,
    clock: C,
    agents_rng: E,
    physics_rng: E,
    publisher: P,
    ticks: u64,
}

impl<C: Clock, E: Entropy, P: Publisher> SimulationLoop<C, E, P> {
    /// Agents are scheduled from the clock's current instant.
    pub fn new(machine: MachineState, clock: C, mut agents_rng: E, physics_rng: E, publisher: P) -> Self {
        let now = clock.now();
        let operator = ActionAgent::operator(now, &mut agents_rng);
        let technician = ActionAgent::technician(now, &mut agents_rng);
        Self {
            machine,
            operator,
            technician,
            order: AgentOrder::default(),
            clock,
            agents_rng,
            physics_rng,
            publisher,
            ticks: 0,
        }
    }

    pub fn with_order(mut self, order: AgentOrder) -> Self {
        self.order = order;
        self
    }

    pub fn machine(&self) -> &MachineState {
        &self.machine
    }

    pub fn operator(&self) -> &ActionAgent {
        &self.operator
    }

    pub fn technician(&self) -> &ActionAgent {
        &self.technician
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick and return the transitions the agents applied.
    pub fn tick(&mut self) -> Result<Vec<Transition>, ChannelError> {
        let now = self.clock.now();
        let applied = self.order.step(
            &mut self.operator,
            &mut self.technician,
            &mut self.machine,
            now,
            &mut self.agents_rng,
        );
        self.machine.evolve(&mut self.physics_rng);
        self.publisher.publish(&self.machine.reading())?;
        self.ticks += 1;

        debug!(
            machine = self.machine.machine_id(),
            tick = self.ticks,
            status = %self.machine.status(),
            production_total = self.machine.production_total(),
            "tick"
        );
        Ok(applied)
    }

    /// Tick every `period` until publishing fails.
    ///
    /// The first tick runs one period after the call; the initial state is
    /// already visible from registration.
    pub async fn run(mut self, period: Duration) -> Result<(), ChannelError> {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            if let Err(err) = self.tick() {
                error!(
                    machine = self.machine.machine_id(),
                    error = %err,
                    "publish failed, stopping machine"
                );
                return Err(err);
            }
        }
    }
}
