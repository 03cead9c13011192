//! A configured rule together with its runtime state.

use std::time::Instant;

use relayseq_domain::rule::Rule;

use super::command::{DeviceCommand, TickContext};
use super::machine::{RuleMachine, machine_for};

/// One entry of the controller's rule list.
///
/// Initial states are applied once per enable cycle: the first tick after
/// the rule is enabled applies them and sets the `initialized` flag,
/// disabling clears it again.
#[derive(Debug)]
pub struct RuleSlot {
    rule: Rule,
    enabled: bool,
    initialized: bool,
    machine: Box<dyn RuleMachine>,
}

impl RuleSlot {
    #[must_use]
    pub fn new(rule: Rule, enabled: bool) -> Self {
        let machine = machine_for(&rule);
        Self {
            rule,
            enabled,
            initialized: false,
            machine,
        }
    }

    #[must_use]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Initial states, the first time this is called in an enable cycle.
    pub fn apply_initial_state(&mut self) -> Vec<DeviceCommand> {
        if self.initialized {
            return Vec::new();
        }
        self.initialized = true;
        let commands = DeviceCommand::from_states(&self.rule.initial_states);
        if !commands.is_empty() {
            tracing::info!(
                rule = %self.rule.display_name(),
                states = %self.rule.initial_states,
                "initial state"
            );
        }
        commands
    }

    /// Initial states, regardless of the `initialized` flag.
    #[must_use]
    pub fn reapply_initial_state(&self) -> Vec<DeviceCommand> {
        if !self.rule.initial_states.is_empty() {
            tracing::info!(
                rule = %self.rule.display_name(),
                states = %self.rule.initial_states,
                "return to initial state"
            );
        }
        DeviceCommand::from_states(&self.rule.initial_states)
    }

    #[must_use]
    pub fn apply_end_state(&self) -> Vec<DeviceCommand> {
        if !self.rule.end_states.is_empty() {
            tracing::info!(
                rule = %self.rule.display_name(),
                states = %self.rule.end_states,
                "end state"
            );
        }
        DeviceCommand::from_states(&self.rule.end_states)
    }

    /// Run the machine for one tick. Disabled slots do nothing.
    ///
    /// When the machine completes a cycle the initial states are re-applied
    /// (`return_to_initial`) or the end states applied.
    pub fn tick(&mut self, ctx: &TickContext, now: Instant) -> Vec<DeviceCommand> {
        if !self.enabled {
            return Vec::new();
        }
        let outcome = self.machine.tick(ctx, now);
        let mut commands = outcome.commands;
        if outcome.cycle_completed {
            if self.rule.return_to_initial {
                commands.extend(self.reapply_initial_state());
            } else {
                commands.extend(self.apply_end_state());
            }
        }
        commands
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stop the rule: abort its machine, then apply the end states unless
    /// the rule returns to its initial states. Disabled slots do nothing.
    pub fn disable(&mut self) -> Vec<DeviceCommand> {
        if !self.enabled {
            return Vec::new();
        }
        self.enabled = false;
        self.initialized = false;
        let mut commands = self.machine.abort();
        if !self.rule.return_to_initial {
            commands.extend(self.apply_end_state());
        }
        commands
    }

    /// Swap in an edited rule, keeping the enabled flag.
    ///
    /// The running machine is aborted and progress starts over; end states
    /// are not applied.
    pub fn replace(&mut self, rule: Rule) -> Vec<DeviceCommand> {
        let commands = if self.enabled {
            self.machine.abort()
        } else {
            Vec::new()
        };
        self.machine = machine_for(&rule);
        self.rule = rule;
        self.initialized = false;
        commands
    }

    /// Take the rule out, with the writes needed to stop it.
    #[must_use]
    pub fn retire(mut self) -> (Rule, Vec<DeviceCommand>) {
        let commands = self.disable();
        (self.rule, commands)
    }
}
