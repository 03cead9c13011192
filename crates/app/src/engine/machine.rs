//! The rule machine seam: one state machine per rule kind.

use std::time::Instant;

use relayseq_domain::rule::{Rule, RuleKind};

use super::command::{DeviceCommand, TickContext};
use super::production_line::ProductionLineMachine;
use super::simple::SimpleMachine;
use super::station::StationMachine;
use super::tool_picking::ToolPickingMachine;

/// What a machine produced on one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub commands: Vec<DeviceCommand>,
    /// The machine finished a full cycle on this tick. The owner applies the
    /// rule's end states (or re-applies its initial states).
    pub cycle_completed: bool,
}

impl TickOutcome {
    #[must_use]
    pub fn commands(commands: Vec<DeviceCommand>) -> Self {
        Self {
            commands,
            cycle_completed: false,
        }
    }
}

/// Runtime state of one enabled rule.
///
/// The controller never looks at the rule kind; it only ticks and aborts.
pub trait RuleMachine: Send + std::fmt::Debug {
    /// Advance by one poll tick.
    fn tick(&mut self, ctx: &TickContext, now: Instant) -> TickOutcome;

    /// Stop immediately and forget all progress and timers.
    ///
    /// Returns the writes needed to leave the outputs this machine drives
    /// in a safe state.
    fn abort(&mut self) -> Vec<DeviceCommand>;
}

/// Build the machine for `rule`.
#[must_use]
pub fn machine_for(rule: &Rule) -> Box<dyn RuleMachine> {
    let name = rule.display_name();
    match &rule.kind {
        RuleKind::Simple(simple) => Box::new(SimpleMachine::new(name, simple.clone())),
        RuleKind::Station(station) => Box::new(StationMachine::new(name, station.clone())),
        RuleKind::ToolPicking(station) => {
            Box::new(ToolPickingMachine::new(name, station.clone()))
        }
        RuleKind::ProductionLine(line) => {
            Box::new(ProductionLineMachine::new(name, line.steps.clone()))
        }
    }
}
