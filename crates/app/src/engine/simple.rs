//! Simple gate machine.

use std::time::Instant;

use relayseq_domain::rule::SimpleRule;
use relayseq_domain::time::seconds;

use super::command::{DeviceCommand, TickContext};
use super::machine::{RuleMachine, TickOutcome};
use super::timers::{RuleTimers, TimerEvent};

/// Drives one output from a gate over one or two inputs.
///
/// With a duration the output is held ON for that long and the gate is not
/// looked at again until it goes OFF. Without a duration the output is
/// switched ON whenever the gate is open and the output reads OFF.
#[derive(Debug)]
pub struct SimpleMachine {
    name: String,
    rule: SimpleRule,
    holding: bool,
    timers: RuleTimers,
}

impl SimpleMachine {
    #[must_use]
    pub fn new(name: String, rule: SimpleRule) -> Self {
        Self {
            name,
            rule,
            holding: false,
            timers: RuleTimers::new(),
        }
    }

    #[must_use]
    pub const fn is_holding(&self) -> bool {
        self.holding
    }
}

impl RuleMachine for SimpleMachine {
    fn tick(&mut self, ctx: &TickContext, now: Instant) -> TickOutcome {
        let mut commands = Vec::new();
        let output = self.rule.output;

        if self.rule.gate(&ctx.state) && !self.holding {
            if self.rule.duration > 0 {
                commands.push(DeviceCommand::on(output));
                self.timers
                    .schedule_off(0, output, now + seconds(self.rule.duration));
                self.holding = true;
                tracing::info!(rule = %self.name, %output, secs = self.rule.duration, "gate open");
            } else if !ctx.output(output) {
                commands.push(DeviceCommand::on(output));
                tracing::info!(rule = %self.name, %output, "gate open");
            }
        }

        for event in self.timers.expire(now) {
            if let TimerEvent::TurnOff(channel) = event {
                commands.push(DeviceCommand::off(channel));
                self.holding = false;
                tracing::info!(rule = %self.name, %channel, "hold time elapsed");
            }
        }
        TickOutcome::commands(commands)
    }

    fn abort(&mut self) -> Vec<DeviceCommand> {
        self.holding = false;
        self.timers
            .clear()
            .into_iter()
            .map(DeviceCommand::off)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use relayseq_domain::channel::Channel;
    use relayseq_domain::io::{DigitalState, EdgeSamples};
    use relayseq_domain::rule::SimpleLogic;

    fn ch(n: u8) -> Channel {
        Channel::new(n).unwrap()
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn state(inputs: u8, outputs: u8) -> TickContext {
        TickContext::new(DigitalState::from_masks(inputs, outputs), EdgeSamples::none())
    }

    fn gate(logic: SimpleLogic, duration: u64) -> SimpleMachine {
        SimpleMachine::new(
            "gate".to_string(),
            SimpleRule {
                logic,
                di1: ch(1),
                di2: Some(ch(2)),
                output: ch(3),
                duration,
            },
        )
    }

    #[test]
    fn should_hold_output_for_duration_then_release() {
        let t0 = Instant::now();
        let mut machine = gate(SimpleLogic::And, 2);

        assert!(machine.tick(&state(0b01, 0), t0).commands.is_empty());
        assert_eq!(
            machine.tick(&state(0b11, 0), t0 + ms(250)).commands,
            vec![DeviceCommand::on(ch(3))]
        );
        assert!(machine.is_holding());
        assert!(machine.tick(&state(0b11, 0b100), t0 + ms(1_000)).commands.is_empty());
        assert_eq!(
            machine.tick(&state(0b11, 0b100), t0 + ms(2_250)).commands,
            vec![DeviceCommand::off(ch(3))]
        );
        assert!(!machine.is_holding());
        assert_eq!(
            machine.tick(&state(0b11, 0), t0 + ms(2_500)).commands,
            vec![DeviceCommand::on(ch(3))]
        );
    }

    #[test]
    fn should_switch_on_only_when_output_reads_off_without_duration() {
        let t0 = Instant::now();
        let mut machine = gate(SimpleLogic::Or, 0);

        assert_eq!(
            machine.tick(&state(0b10, 0), t0).commands,
            vec![DeviceCommand::on(ch(3))]
        );
        assert!(machine.tick(&state(0b10, 0b100), t0 + ms(250)).commands.is_empty());
        assert!(machine.tick(&state(0, 0b100), t0 + ms(500)).commands.is_empty());
    }

    #[test]
    fn should_release_held_output_on_abort() {
        let mut machine = gate(SimpleLogic::Single, 10);
        let _ = machine.tick(&state(0b01, 0), Instant::now());
        assert_eq!(machine.abort(), vec![DeviceCommand::off(ch(3))]);
        assert!(!machine.is_holding());
    }
}
