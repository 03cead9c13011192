//! Tool-picking machine: guide the operator through two tool picks.
//!
//! Tool sensors are read as rising edges so that a tool which stays
//! lifted is only counted once.

use std::time::Instant;

use relayseq_domain::rule::ToolPickingRule;
use relayseq_domain::time::seconds;

use super::command::{DeviceCommand, TickContext};
use super::machine::{RuleMachine, TickOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickPhase {
    WaitingForPart,
    FirstTool { since: Instant },
    FirstToolAlarm,
    SecondTool { since: Instant },
    SecondToolAlarm,
    WaitingForClear,
}

#[derive(Debug)]
pub struct ToolPickingMachine {
    name: String,
    station: ToolPickingRule,
    phase: PickPhase,
}

impl ToolPickingMachine {
    #[must_use]
    pub fn new(name: String, station: ToolPickingRule) -> Self {
        Self {
            name,
            station,
            phase: PickPhase::WaitingForPart,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> PickPhase {
        self.phase
    }

    fn timed_out(&self, since: Instant, now: Instant) -> bool {
        self.station.timeout > 0
            && now.saturating_duration_since(since) >= seconds(self.station.timeout)
    }

    fn raise_alarm(&mut self, next: PickPhase, reason: &str, commands: &mut Vec<DeviceCommand>) {
        tracing::warn!(rule = %self.name, reason, "tool picking alarm");
        commands.push(DeviceCommand::on(self.station.alarm_device));
        self.phase = next;
    }

    fn to_second_tool(&mut self, now: Instant, commands: &mut Vec<DeviceCommand>) {
        commands.push(DeviceCommand::off(self.station.first_tool_lamp));
        commands.push(DeviceCommand::on(self.station.second_tool_lamp));
        tracing::info!(rule = %self.name, "first tool picked");
        self.phase = PickPhase::SecondTool { since: now };
    }

    fn to_clear(&mut self, commands: &mut Vec<DeviceCommand>) {
        commands.push(DeviceCommand::off(self.station.first_tool_lamp));
        commands.push(DeviceCommand::off(self.station.second_tool_lamp));
        tracing::info!(rule = %self.name, "second tool picked");
        self.phase = PickPhase::WaitingForClear;
    }
}

impl RuleMachine for ToolPickingMachine {
    fn tick(&mut self, ctx: &TickContext, now: Instant) -> TickOutcome {
        let mut commands = Vec::new();
        let first = ctx.rose(self.station.first_tool_sensor);
        let second = ctx.rose(self.station.second_tool_sensor);

        match self.phase {
            PickPhase::WaitingForPart => {
                if ctx.input(self.station.part_sensor) {
                    commands.push(DeviceCommand::on(self.station.first_tool_lamp));
                    tracing::info!(rule = %self.name, "part detected, pick first tool");
                    self.phase = PickPhase::FirstTool { since: now };
                }
            }
            PickPhase::FirstTool { since } => {
                if first {
                    self.to_second_tool(now, &mut commands);
                } else if second {
                    self.raise_alarm(PickPhase::FirstToolAlarm, "wrong tool", &mut commands);
                } else if self.timed_out(since, now) {
                    self.raise_alarm(PickPhase::FirstToolAlarm, "timeout", &mut commands);
                }
            }
            PickPhase::FirstToolAlarm => {
                if first {
                    commands.push(DeviceCommand::off(self.station.alarm_device));
                    self.to_second_tool(now, &mut commands);
                }
            }
            PickPhase::SecondTool { since } => {
                if second {
                    self.to_clear(&mut commands);
                } else if first {
                    self.raise_alarm(PickPhase::SecondToolAlarm, "wrong tool", &mut commands);
                } else if self.timed_out(since, now) {
                    self.raise_alarm(PickPhase::SecondToolAlarm, "timeout", &mut commands);
                }
            }
            PickPhase::SecondToolAlarm => {
                if second {
                    commands.push(DeviceCommand::off(self.station.alarm_device));
                    self.to_clear(&mut commands);
                }
            }
            PickPhase::WaitingForClear => {
                if !ctx.input(self.station.part_sensor) {
                    self.phase = PickPhase::WaitingForPart;
                }
            }
        }
        TickOutcome::commands(commands)
    }

    fn abort(&mut self) -> Vec<DeviceCommand> {
        self.phase = PickPhase::WaitingForPart;
        vec![
            DeviceCommand::off(self.station.first_tool_lamp),
            DeviceCommand::off(self.station.second_tool_lamp),
            DeviceCommand::off(self.station.alarm_device),
        ]
    }
}
