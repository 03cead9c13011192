//! Production-line machine: walks a step program, looping while enabled.

use std::collections::BTreeSet;
use std::time::Instant;

use relayseq_domain::sequence::{Effect, Step, StepKind, WaitStep};

use super::command::{DeviceCommand, TickContext};
use super::executor::ActionExecutor;
use super::machine::{RuleMachine, TickOutcome};
use super::timers::{RuleTimers, StepIndex, TimerEvent};

/// How far the current cycle got.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    pub current_step: StepIndex,
    pub completed: BTreeSet<StepIndex>,
}

impl Progress {
    fn advance_past(&mut self, step: StepIndex) {
        self.completed.insert(step);
        self.current_step = step + 1;
    }
}

#[derive(Debug)]
pub struct ProductionLineMachine {
    name: String,
    steps: Vec<Step>,
    progress: Progress,
    timers: RuleTimers,
}

impl ProductionLineMachine {
    #[must_use]
    pub fn new(name: String, steps: Vec<Step>) -> Self {
        Self {
            name,
            steps,
            progress: Progress::default(),
            timers: RuleTimers::new(),
        }
    }

    #[must_use]
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    #[must_use]
    pub fn timers(&self) -> &RuleTimers {
        &self.timers
    }

    fn is_final(&self, step: StepIndex) -> bool {
        step + 1 == self.steps.len()
    }

    fn finish_cycle(&mut self) {
        tracing::info!(rule = %self.name, "sequence completed");
        self.progress = Progress::default();
    }

    fn on_timer(&mut self, event: TimerEvent, now: Instant, outcome: &mut TickOutcome) {
        match event {
            TimerEvent::TurnOff(channel) | TimerEvent::BlinkEnded(channel) => {
                outcome.commands.push(DeviceCommand::off(channel));
            }
            TimerEvent::BlinkToggle { channel, on } => {
                outcome.commands.push(DeviceCommand::set(channel, on));
            }
            TimerEvent::WaitElapsed { step, then } => {
                tracing::info!(rule = %self.name, step = step + 1, "wait completed");
                if let Some(action) = then {
                    let executor = ActionExecutor::new(&self.name);
                    outcome
                        .commands
                        .extend(executor.execute(&action, step, now, &mut self.timers));
                }
                if self.is_final(step) {
                    outcome.cycle_completed = true;
                }
            }
        }
    }

    /// Evaluate pending steps from the cursor on. The first step that fires
    /// ends the evaluation for this tick.
    fn run_steps(&mut self, ctx: &TickContext, now: Instant, outcome: &mut TickOutcome) {
        let executor = ActionExecutor::new(&self.name);
        for index in self.progress.current_step..self.steps.len() {
            if self.progress.completed.contains(&index) {
                continue;
            }
            let step = &self.steps[index];
            let wait = match step.kind() {
                StepKind::Inert => continue,
                StepKind::Wait(wait) => wait,
                StepKind::Guarded { condition, effect } => {
                    if !condition.evaluate(&ctx.state, &ctx.edges) {
                        continue;
                    }
                    match effect {
                        Effect::Wait(wait) => wait,
                        Effect::Act(action) => {
                            tracing::info!(
                                rule = %self.name,
                                step = index + 1,
                                source = step.source(),
                                "step fired"
                            );
                            outcome
                                .commands
                                .extend(executor.execute(action, index, now, &mut self.timers));
                            self.progress.advance_past(index);
                            outcome.cycle_completed = index + 1 == self.steps.len();
                            return;
                        }
                    }
                }
            };
            start_wait(&self.name, &mut self.timers, index, wait, now);
            self.progress.advance_past(index);
            return;
        }
    }
}

fn start_wait(rule: &str, timers: &mut RuleTimers, step: StepIndex, wait: &WaitStep, now: Instant) {
    tracing::info!(rule, step = step + 1, secs = wait.seconds, "waiting");
    timers.start_wait(step, now + wait.duration(), wait.then.clone());
}

impl RuleMachine for ProductionLineMachine {
    fn tick(&mut self, ctx: &TickContext, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        for event in self.timers.expire(now) {
            self.on_timer(event, now, &mut outcome);
        }
        if !outcome.cycle_completed && !self.timers.is_waiting() {
            self.run_steps(ctx, now, &mut outcome);
        }
        if outcome.cycle_completed {
            self.finish_cycle();
        }
        outcome
    }

    fn abort(&mut self) -> Vec<DeviceCommand> {
        self.progress = Progress::default();
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
    use relayseq_domain::sequence::parse_program;

    fn ch(n: u8) -> Channel {
        Channel::new(n).unwrap()
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn inputs(mask: u8) -> TickContext {
        TickContext::new(DigitalState::from_masks(mask, 0), EdgeSamples::none())
    }

    fn machine(program: &str) -> ProductionLineMachine {
        ProductionLineMachine::new("line".to_string(), parse_program(program))
    }

    #[test]
    fn should_loop_two_step_program_on_repeated_cycles() {
        let t0 = Instant::now();
        let mut line = machine("DI1->DO1(ON)\nDI2->DO1(OFF)");

        for cycle in 0..3u64 {
            let base = t0 + Duration::from_secs(cycle * 10);

            let first = line.tick(&inputs(0b01), base);
            assert_eq!(first.commands, vec![DeviceCommand::on(ch(1))], "cycle {cycle}");
            assert!(!first.cycle_completed);
            assert_eq!(line.progress().current_step, 1);

            let held = line.tick(&inputs(0b01), base + ms(250));
            assert!(held.commands.is_empty());

            let second = line.tick(&inputs(0b10), base + ms(500));
            assert_eq!(second.commands, vec![DeviceCommand::off(ch(1))]);
            assert!(second.cycle_completed);
            assert_eq!(line.progress(), &Progress::default());
        }
    }

    #[test]
    fn should_fire_only_first_true_step_per_tick() {
        let t0 = Instant::now();
        let mut line = machine("DI1->DO1(ON)\nDI1->DO2(ON)\nDI3->DO3(ON)");

        let outcome = line.tick(&inputs(0b001), t0);
        assert_eq!(outcome.commands, vec![DeviceCommand::on(ch(1))]);
        let outcome = line.tick(&inputs(0b001), t0 + ms(250));
        assert_eq!(outcome.commands, vec![DeviceCommand::on(ch(2))]);
    }

    #[test]
    fn should_look_past_false_steps() {
        let t0 = Instant::now();
        let mut line = machine("DI1->DO1(ON)\nDI2->DO2(ON)\nDI3->DO3(ON)");

        let outcome = line.tick(&inputs(0b010), t0);
        assert_eq!(outcome.commands, vec![DeviceCommand::on(ch(2))]);
        assert_eq!(line.progress().current_step, 2);
    }

    #[test]
    fn should_turn_timed_output_off_after_duration() {
        let t0 = Instant::now();
        let mut line = machine("DI1->DO3(ON):5s\nDI2->DO4(ON)");

        assert_eq!(
            line.tick(&inputs(0b01), t0).commands,
            vec![DeviceCommand::on(ch(3))]
        );
        assert!(line.tick(&inputs(0), t0 + ms(4_900)).commands.is_empty());
        assert_eq!(
            line.tick(&inputs(0), t0 + ms(5_100)).commands,
            vec![DeviceCommand::off(ch(3))]
        );
    }

    #[test]
    fn should_blink_and_force_off_at_end() {
        let t0 = Instant::now();
        let mut line = machine("DI1->DO4(BLINK):3s\nDI2->DO5(ON)");

        assert_eq!(
            line.tick(&inputs(0b01), t0).commands,
            vec![DeviceCommand::on(ch(4))]
        );
        assert_eq!(
            line.tick(&inputs(0), t0 + ms(1_000)).commands,
            vec![DeviceCommand::off(ch(4))]
        );
        assert_eq!(
            line.tick(&inputs(0), t0 + ms(2_000)).commands,
            vec![DeviceCommand::on(ch(4))]
        );
        assert_eq!(
            line.tick(&inputs(0), t0 + ms(3_000)).commands,
            vec![DeviceCommand::off(ch(4))]
        );
        assert!(!line.timers().is_blinking(ch(4)));
    }

    #[test]
    fn should_hold_steps_while_waiting() {
        let t0 = Instant::now();
        let mut line = machine("DI1->DO1(ON)\nWAIT:2s\nDI2->DO1(OFF)");

        let _ = line.tick(&inputs(0b01), t0);
        let waiting = line.tick(&inputs(0b00), t0 + ms(250));
        assert!(waiting.commands.is_empty());
        assert!(line.timers().is_waiting());

        let blocked = line.tick(&inputs(0b10), t0 + ms(1_000));
        assert!(blocked.commands.is_empty());

        let resumed = line.tick(&inputs(0b10), t0 + ms(2_250));
        assert_eq!(resumed.commands, vec![DeviceCommand::off(ch(1))]);
        assert!(resumed.cycle_completed);
    }

    #[test]
    fn should_run_action_after_guarded_wait() {
        let t0 = Instant::now();
        let mut line = machine("DI1->WAIT:1s->DO2(ON)\nDI2->DO2(OFF)");

        assert!(line.tick(&inputs(0b01), t0).commands.is_empty());
        let outcome = line.tick(&inputs(0b00), t0 + ms(1_000));
        assert_eq!(outcome.commands, vec![DeviceCommand::on(ch(2))]);
        assert!(!outcome.cycle_completed);
        assert_eq!(line.progress().current_step, 1);
    }

    #[test]
    fn should_complete_cycle_when_final_wait_elapses() {
        let t0 = Instant::now();
        let mut line = machine("DI1->DO1(ON)\nWAIT:1s->DO1(OFF)");

        let _ = line.tick(&inputs(0b01), t0);
        let _ = line.tick(&inputs(0b00), t0 + ms(250));
        let outcome = line.tick(&inputs(0b00), t0 + ms(1_250));
        assert_eq!(outcome.commands, vec![DeviceCommand::off(ch(1))]);
        assert!(outcome.cycle_completed);
        assert_eq!(line.progress(), &Progress::default());
    }

    #[test]
    fn should_never_fire_inert_steps() {
        let t0 = Instant::now();
        let mut line = machine("garbage\nDI1->DO1(ON)");

        let outcome = line.tick(&inputs(0xFF), t0);
        assert_eq!(outcome.commands, vec![DeviceCommand::on(ch(1))]);
        assert!(outcome.cycle_completed);
    }

    #[test]
    fn should_release_driven_outputs_on_abort() {
        let t0 = Instant::now();
        let mut line = machine("DI1->DO3(ON)&DO4(BLINK):5s\nDI2->DO5(ON)");

        let _ = line.tick(&inputs(0b01), t0);
        let released = line.abort();
        assert_eq!(
            released,
            vec![DeviceCommand::off(ch(3)), DeviceCommand::off(ch(4))]
        );
        assert!(line.timers().is_idle());
        assert_eq!(line.progress(), &Progress::default());
    }
}
