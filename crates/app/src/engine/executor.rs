//! Turns a parsed [`Action`] into device commands and timers.

use std::time::Instant;

use relayseq_domain::sequence::{Action, Mode};

use super::command::DeviceCommand;
use super::timers::{RuleTimers, StepIndex};

/// Executes actions on behalf of one rule.
#[derive(Debug, Clone, Copy)]
pub struct ActionExecutor<'a> {
    rule: &'a str,
}

impl<'a> ActionExecutor<'a> {
    /// `rule` is only used to label log lines.
    #[must_use]
    pub const fn new(rule: &'a str) -> Self {
        Self { rule }
    }

    /// Execute `action` fired by `step` at `now`.
    ///
    /// - `ON` switches the output on and, with a duration, schedules it OFF.
    /// - `OFF` switches the output off.
    /// - `BLINK` switches the output on and blinks it until the duration
    ///   ends. Without a duration it does nothing.
    ///
    /// `ON` and `OFF` stop a blink this rule runs on the same output.
    #[must_use]
    pub fn execute(
        &self,
        action: &Action,
        step: StepIndex,
        now: Instant,
        timers: &mut RuleTimers,
    ) -> Vec<DeviceCommand> {
        let mut commands = Vec::with_capacity(action.directives.len());
        for directive in &action.directives {
            let channel = directive.channel;
            match directive.mode {
                Mode::On => {
                    timers.stop_blink(channel);
                    commands.push(DeviceCommand::on(channel));
                    if let Some(duration) = action.duration() {
                        timers.schedule_off(step, channel, now + duration);
                        tracing::debug!(
                            rule = self.rule,
                            step,
                            %channel,
                            secs = action.duration_secs,
                            "scheduled OFF"
                        );
                    }
                }
                Mode::Off => {
                    timers.stop_blink(channel);
                    commands.push(DeviceCommand::off(channel));
                }
                Mode::Blink => match action.duration() {
                    Some(duration) => {
                        commands.push(DeviceCommand::on(channel));
                        timers.start_blink(channel, now, Some(now + duration));
                    }
                    None => {
                        tracing::warn!(
                            rule = self.rule,
                            step,
                            %channel,
                            "BLINK without duration ignored"
                        );
                    }
                },
            }
        }
        commands
    }
}
