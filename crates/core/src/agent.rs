//! Randomized actors that push a machine through its state machine.
//!
//! Each [`ActionAgent`] owns its next eligible firing time. On every tick the
//! simulation hands it the current instant and a random source; if the agent
//! is due it picks one legal action for the machine's current status, applies
//! it and reschedules itself `uniform(min, max)` into the future.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::entropy::Entropy;
use crate::machine::{MachineState, MachineStatus, Transition, ALARM_CODES};

/// Chance a technician inspection clears an alarm.
pub const REPAIR_SUCCESS_PROBABILITY: f64 = 0.8;

/// Chance that awaited repair parts have arrived at an inspection.
pub const PARTS_ARRIVAL_PROBABILITY: f64 = 0.5;

/// Who is acting on the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Starts and stops production; occasionally reports a fault.
    Operator,
    /// Inspects alarms and attempts repairs.
    Technician,
}

impl Role {
    /// Rescheduling window `(min, max)`.
    pub fn window(&self) -> (Duration, Duration) {
        match self {
            Self::Operator => (Duration::from_secs(10), Duration::from_secs(30)),
            Self::Technician => (Duration::from_secs(30), Duration::from_secs(60)),
        }
    }

    fn choose<E: Entropy + ?Sized>(
        &self,
        machine: &MachineState,
        rng: &mut E,
    ) -> Option<Transition> {
        match self {
            Self::Operator => {
                let legal: &[OperatorAction] = match machine.status() {
                    MachineStatus::Idle => &[OperatorAction::Start],
                    MachineStatus::Running => &[OperatorAction::Stop, OperatorAction::Fault],
                    MachineStatus::Alarm | MachineStatus::WaitingForRepair => &[],
                };
                let transition = match legal[rng.pick(legal.len())?] {
                    OperatorAction::Start => Transition::Start,
                    OperatorAction::Stop => Transition::Stop,
                    OperatorAction::Fault => Transition::Fault {
                        code: ALARM_CODES[rng.pick(ALARM_CODES.len())?].to_string(),
                    },
                };
                Some(transition)
            }
            Self::Technician => match machine.status() {
                MachineStatus::Alarm => {
                    info!(machine = %machine.machine_id(), "technician inspecting alarm");
                    if rng.chance(REPAIR_SUCCESS_PROBABILITY) {
                        Some(Transition::Repair)
                    } else {
                        Some(Transition::RepairFailed)
                    }
                }
                MachineStatus::WaitingForRepair => {
                    if rng.chance(PARTS_ARRIVAL_PROBABILITY) {
                        Some(Transition::PartsArrived)
                    } else {
                        info!(machine = %machine.machine_id(), "repair parts not yet arrived");
                        None
                    }
                }
                MachineStatus::Idle | MachineStatus::Running => None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum OperatorAction {
    Start,
    Stop,
    Fault,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operator => f.write_str("operator"),
            Self::Technician => f.write_str("technician"),
        }
    }
}

/// An actor with its own randomized firing schedule.
#[derive(Debug, Clone)]
pub struct ActionAgent {
    role: Role,
    min_delay: Duration,
    max_delay: Duration,
    next_eligible: Instant,
}

impl ActionAgent {
    /// Agent with the role's default window, first eligible
    /// `uniform(min, max)` after `now`.
    pub fn new<E: Entropy + ?Sized>(role: Role, now: Instant, rng: &mut E) -> Self {
        let (min, max) = role.window();
        Self::with_window(role, min, max, now, rng)
    }

    pub fn operator<E: Entropy + ?Sized>(now: Instant, rng: &mut E) -> Self {
        Self::new(Role::Operator, now, rng)
    }

    pub fn technician<E: Entropy + ?Sized>(now: Instant, rng: &mut E) -> Self {
        Self::new(Role::Technician, now, rng)
    }

    /// Agent with a custom rescheduling window.
    pub fn with_window<E: Entropy + ?Sized>(
        role: Role,
        min_delay: Duration,
        max_delay: Duration,
        now: Instant,
        rng: &mut E,
    ) -> Self {
        let mut agent = Self {
            role,
            min_delay,
            max_delay,
            next_eligible: now,
        };
        agent.reschedule(now, rng);
        agent
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Earliest instant at which the agent will act.
    pub fn next_eligible(&self) -> Instant {
        self.next_eligible
    }

    /// Fire if due. Returns the transition applied, if any.
    ///
    /// A due agent always reschedules, whether or not the machine's status
    /// allowed it to do anything.
    pub fn act<E: Entropy + ?Sized>(
        &mut self,
        machine: &mut MachineState,
        now: Instant,
        rng: &mut E,
    ) -> Option<Transition> {
        if now < self.next_eligible {
            return None;
        }

        let applied = self
            .role
            .choose(machine, rng)
            .filter(|transition| machine.apply(transition));
        if applied.is_none() {
            debug!(machine = %machine.machine_id(), role = %self.role, "no action taken");
        }

        self.reschedule(now, rng);
        applied
    }

    fn reschedule<E: Entropy + ?Sized>(&mut self, now: Instant, rng: &mut E) {
        self.next_eligible = now + rng.duration_between(self.min_delay, self.max_delay);
    }
}

/// Which agent gets the first chance to act within a tick.
///
/// With `OperatorFirst` a single tick can chain one operator transition
/// followed by one technician transition, but never the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentOrder {
    /// Operator, then technician.
    #[default]
    OperatorFirst,
    /// Technician, then operator.
    TechnicianFirst,
}

impl AgentOrder {
    /// Run both agents once in this order.
    pub fn step<E: Entropy + ?Sized>(
        self,
        operator: &mut ActionAgent,
        technician: &mut ActionAgent,
        machine: &mut MachineState,
        now: Instant,
        rng: &mut E,
    ) -> Vec<Transition> {
        let agents = match self {
            Self::OperatorFirst => [operator, technician],
            Self::TechnicianFirst => [technician, operator],
        };
        agents
            .into_iter()
            .filter_map(|agent| agent.act(machine, now, rng))
            .collect()
    }
}

/// Returned for an unrecognised `AgentOrder` name.
#[derive(Debug, Error)]
#[error("unknown agent order {0:?} (expected operator-first or technician-first)")]
pub struct UnknownAgentOrder(pub String);

impl FromStr for AgentOrder {
    type Err = UnknownAgentOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "operator-first" => Ok(Self::OperatorFirst),
            "technician-first" => Ok(Self::TechnicianFirst),
            other => Err(UnknownAgentOrder(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::ScriptedEntropy;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn first_firing_lands_inside_window() {
        let now = Instant::now();
        let mut rng = ScriptedEntropy::new([0.0]);
        let op = ActionAgent::operator(now, &mut rng);
        assert_eq!(op.next_eligible(), now + secs(10));

        let mut rng = ScriptedEntropy::new([0.5]);
        let tech = ActionAgent::technician(now, &mut rng);
        assert_eq!(tech.next_eligible(), now + secs(45));
    }

    #[test]
    fn not_due_is_a_no_op() {
        let now = Instant::now();
        let mut rng = ScriptedEntropy::new([0.0]);
        let mut op = ActionAgent::operator(now, &mut rng);
        let mut machine = MachineState::new("cnc_1");

        assert_eq!(op.act(&mut machine, now + secs(9), &mut rng), None);
        assert_eq!(machine.status(), MachineStatus::Idle);
        assert_eq!(op.next_eligible(), now + secs(10));
    }

    #[test]
    fn operator_only_picks_legal_actions() {
        let now = Instant::now();
        // schedule, pick (only start is legal), reschedule
        let mut rng = ScriptedEntropy::new([0.0, 0.99, 0.0]);
        let mut op = ActionAgent::operator(now, &mut rng);
        let mut machine = MachineState::new("cnc_1");

        let t = op.act(&mut machine, now + secs(10), &mut rng);
        assert_eq!(t, Some(Transition::Start));
        assert_eq!(machine.status(), MachineStatus::Running);
        assert_eq!(op.next_eligible(), now + secs(20));
    }

    #[test]
    fn operator_has_nothing_to_do_during_alarm() {
        let now = Instant::now();
        let mut rng = ScriptedEntropy::new([0.0]);
        let mut op = ActionAgent::operator(now, &mut rng);
        let mut machine = MachineState::new("cnc_1");
        machine.apply(&Transition::Start);
        machine.apply(&Transition::Fault { code: "F303".into() });

        let mut rng = ScriptedEntropy::new([0.5]);
        assert_eq!(op.act(&mut machine, now + secs(10), &mut rng), None);
        assert_eq!(machine.status(), MachineStatus::Alarm);
        // still rescheduled: 10 + 10 + 0.5 * 20
        assert_eq!(op.next_eligible(), now + secs(30));
    }

    #[test]
    fn technician_repairs_or_blocks() {
        let now = Instant::now();
        let mut machine = MachineState::new("cnc_1");
        machine.apply(&Transition::Start);
        machine.apply(&Transition::Fault { code: "E101".into() });

        let mut rng = ScriptedEntropy::new([0.0, 0.9, 0.0]);
        let mut tech = ActionAgent::technician(now, &mut rng);
        assert_eq!(
            tech.act(&mut machine, now + secs(30), &mut rng),
            Some(Transition::RepairFailed)
        );
        assert_eq!(machine.status(), MachineStatus::WaitingForRepair);

        let mut rng = ScriptedEntropy::new([0.4, 0.0]);
        assert_eq!(
            tech.act(&mut machine, now + secs(60), &mut rng),
            Some(Transition::PartsArrived)
        );
        assert_eq!(machine.status(), MachineStatus::Alarm);

        let mut rng = ScriptedEntropy::new([0.1, 0.0]);
        assert_eq!(
            tech.act(&mut machine, now + secs(90), &mut rng),
            Some(Transition::Repair)
        );
        assert_eq!(machine.status(), MachineStatus::Idle);
        assert!(machine.active_alarms().is_empty());
    }

    #[test]
    fn order_policy_decides_who_acts_first() {
        let now = Instant::now();
        let build = || {
            let mut rng = ScriptedEntropy::new([0.0]);
            let op = ActionAgent::operator(now, &mut rng);
            let tech = ActionAgent::with_window(Role::Technician, secs(10), secs(10), now, &mut rng);
            let mut machine = MachineState::new("cnc_1");
            machine.apply(&Transition::Start);
            machine.apply(&Transition::Fault { code: "E205".into() });
            (op, tech, machine)
        };

        // Technician first: repair to IDLE, then the operator can start.
        let (mut op, mut tech, mut machine) = build();
        let mut rng = ScriptedEntropy::new([0.1, 0.0, 0.0, 0.0]);
        let applied =
            AgentOrder::TechnicianFirst.step(&mut op, &mut tech, &mut machine, now + secs(10), &mut rng);
        assert_eq!(applied, vec![Transition::Repair, Transition::Start]);
        assert_eq!(machine.status(), MachineStatus::Running);

        // Operator first: nothing legal for the operator, then the repair.
        let (mut op, mut tech, mut machine) = build();
        let mut rng = ScriptedEntropy::new([0.0, 0.1, 0.0]);
        let applied =
            AgentOrder::OperatorFirst.step(&mut op, &mut tech, &mut machine, now + secs(10), &mut rng);
        assert_eq!(applied, vec![Transition::Repair]);
        assert_eq!(machine.status(), MachineStatus::Idle);
    }

    #[test]
    fn agent_order_parses_cli_names() {
        assert_eq!("operator-first".parse::<AgentOrder>().unwrap(), AgentOrder::OperatorFirst);
        assert_eq!(
            "technician-first".parse::<AgentOrder>().unwrap(),
            AgentOrder::TechnicianFirst
        );
        assert!("random".parse::<AgentOrder>().is_err());
    }
}
