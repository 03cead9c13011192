//! Station machine: part arrives, device runs, part leaves.

use std::time::{Duration, Instant};

use relayseq_domain::rule::StationRule;
use relayseq_domain::time::seconds;

use super::command::{DeviceCommand, TickContext};
use super::machine::{RuleMachine, TickOutcome};
use super::timers::{RuleTimers, TimerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationPhase {
    WaitingForPart,
    Processing { started: Instant },
    WaitingForClear,
}

#[derive(Debug)]
pub struct StationMachine {
    name: String,
    station: StationRule,
    phase: StationPhase,
    timers: RuleTimers,
    skip_reported: bool,
}

impl StationMachine {
    #[must_use]
    pub fn new(name: String, station: StationRule) -> Self {
        Self {
            name,
            station,
            phase: StationPhase::WaitingForPart,
            timers: RuleTimers::new(),
            skip_reported: false,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> StationPhase {
        self.phase
    }

    fn start(&mut self, now: Instant, commands: &mut Vec<DeviceCommand>) {
        let device = self.station.process_device;
        commands.push(DeviceCommand::on(device));
        if self.station.blink_mode {
            let end = (self.station.duration > 0).then(|| now + seconds(self.station.duration));
            self.timers.start_blink(device, now, end);
        }
        tracing::info!(
            rule = %self.name,
            operation = %self.station.operation_type,
            %device,
            "part detected, processing"
        );
        self.phase = StationPhase::Processing { started: now };
    }

    fn is_complete(&self, ctx: &TickContext, elapsed: Duration) -> bool {
        if self.station.duration > 0 {
            elapsed >= seconds(self.station.duration)
        } else {
            self.station
                .feedback_sensor
                .is_some_and(|sensor| ctx.input(sensor))
        }
    }

    fn is_timed_out(&self, elapsed: Duration) -> bool {
        self.station.timeout > 0 && elapsed >= seconds(self.station.timeout)
    }

    fn stop_device(&mut self, commands: &mut Vec<DeviceCommand>) {
        let device = self.station.process_device;
        self.timers.stop_blink(device);
        commands.push(DeviceCommand::off(device));
    }
}

impl RuleMachine for StationMachine {
    fn tick(&mut self, ctx: &TickContext, now: Instant) -> TickOutcome {
        let mut commands = Vec::new();
        for event in self.timers.expire(now) {
            match event {
                TimerEvent::BlinkToggle { channel, on } => {
                    commands.push(DeviceCommand::set(channel, on));
                }
                TimerEvent::BlinkEnded(channel) | TimerEvent::TurnOff(channel) => {
                    commands.push(DeviceCommand::off(channel));
                }
                TimerEvent::WaitElapsed { .. } => {}
            }
        }

        let part = ctx.input(self.station.part_sensor);
        match self.phase {
            StationPhase::WaitingForPart if part => {
                let skip = self
                    .station
                    .skip_sensor
                    .is_some_and(|sensor| ctx.input(sensor));
                if skip {
                    if !self.skip_reported {
                        tracing::info!(rule = %self.name, "skip sensor active, part not processed");
                        self.skip_reported = true;
                    }
                } else {
                    self.start(now, &mut commands);
                }
            }
            StationPhase::WaitingForPart => self.skip_reported = false,
            StationPhase::Processing { started } => {
                let elapsed = now.saturating_duration_since(started);
                if self.is_complete(ctx, elapsed) {
                    if !self.station.blinks_unbounded() {
                        self.stop_device(&mut commands);
                    }
                    tracing::info!(rule = %self.name, elapsed = ?elapsed, "processing complete");
                    self.phase = StationPhase::WaitingForClear;
                } else if self.is_timed_out(elapsed) {
                    self.stop_device(&mut commands);
                    tracing::warn!(
                        rule = %self.name,
                        timeout = self.station.timeout,
                        "processing timed out"
                    );
                    self.phase = StationPhase::WaitingForPart;
                }
            }
            StationPhase::WaitingForClear => {
                if !part {
                    if self.timers.is_blinking(self.station.process_device) {
                        self.stop_device(&mut commands);
                    }
                    tracing::debug!(rule = %self.name, "part cleared");
                    self.phase = StationPhase::WaitingForPart;
                    self.skip_reported = false;
                }
            }
        }
        TickOutcome::commands(commands)
    }

    fn abort(&mut self) -> Vec<DeviceCommand> {
        self.timers.clear();
        self.phase = StationPhase::WaitingForPart;
        self.skip_reported = false;
        vec![DeviceCommand::off(self.station.process_device)]
    }
}
