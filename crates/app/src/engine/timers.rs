//! Per-rule timer registry: scheduled OFFs, the wait timer and blinks.
//!
//! Each rule owns exactly one [`RuleTimers`]. Disabling, editing or removing
//! a rule drops its registry as a whole, so no timer outlives its rule.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use relayseq_domain::channel::Channel;
use relayseq_domain::sequence::Action;

/// Position of a step inside a production-line program.
pub type StepIndex = usize;

/// Half-period of a blinking output.
pub const BLINK_PERIOD: Duration = Duration::from_secs(1);

/// A pending `WAIT`. At most one exists per rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitTimer {
    pub deadline: Instant,
    pub step: StepIndex,
    pub then: Option<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkTimer {
    pub next_toggle: Instant,
    /// `None` blinks until stopped.
    pub end: Option<Instant>,
    pub level: bool,
}

/// Something that became due on this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// A timed `ON` ran out.
    TurnOff(Channel),
    WaitElapsed {
        step: StepIndex,
        then: Option<Action>,
    },
    BlinkToggle {
        channel: Channel,
        on: bool,
    },
    /// A bounded blink reached its end; the output must go OFF.
    BlinkEnded(Channel),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTimers {
    scheduled_off: BTreeMap<(StepIndex, Channel), Instant>,
    wait: Option<WaitTimer>,
    blinks: BTreeMap<Channel, BlinkTimer>,
}

impl RuleTimers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn `channel` OFF at `deadline`. Re-scheduling the same step and
    /// channel moves the deadline.
    pub fn schedule_off(&mut self, step: StepIndex, channel: Channel, deadline: Instant) {
        self.scheduled_off.insert((step, channel), deadline);
    }

    #[must_use]
    pub fn has_scheduled_off(&self, channel: Channel) -> bool {
        self.scheduled_off.keys().any(|(_, scheduled)| *scheduled == channel)
    }

    /// Start waiting, replacing any pending wait.
    pub fn start_wait(&mut self, step: StepIndex, deadline: Instant, then: Option<Action>) {
        self.wait = Some(WaitTimer {
            deadline,
            step,
            then,
        });
    }

    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.wait.is_some()
    }

    #[must_use]
    pub fn wait(&self) -> Option<&WaitTimer> {
        self.wait.as_ref()
    }

    /// Start blinking `channel`, assumed to have just been switched ON.
    pub fn start_blink(&mut self, channel: Channel, now: Instant, end: Option<Instant>) {
        self.blinks.insert(
            channel,
            BlinkTimer {
                next_toggle: now + BLINK_PERIOD,
                end,
                level: true,
            },
        );
    }

    /// Stop blinking `channel`. Returns whether it was blinking.
    pub fn stop_blink(&mut self, channel: Channel) -> bool {
        self.blinks.remove(&channel).is_some()
    }

    #[must_use]
    pub fn is_blinking(&self, channel: Channel) -> bool {
        self.blinks.contains_key(&channel)
    }

    #[must_use]
    pub fn blink(&self, channel: Channel) -> Option<&BlinkTimer> {
        self.blinks.get(&channel)
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.scheduled_off.is_empty() && self.wait.is_none() && self.blinks.is_empty()
    }

    /// Collect every timer due at `now`.
    ///
    /// Scheduled OFFs come first, then blinks, then the wait. Expired
    /// entries are removed; running blinks are advanced by one period.
    pub fn expire(&mut self, now: Instant) -> Vec<TimerEvent> {
        let mut events = Vec::new();

        let due: Vec<(StepIndex, Channel)> = self
            .scheduled_off
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(key, _)| *key)
            .collect();
        for key in due {
            self.scheduled_off.remove(&key);
            events.push(TimerEvent::TurnOff(key.1));
        }

        let mut ended = Vec::new();
        for (channel, blink) in &mut self.blinks {
            if blink.end.is_some_and(|end| now >= end) {
                ended.push(*channel);
            } else if now >= blink.next_toggle {
                blink.level = !blink.level;
                blink.next_toggle += BLINK_PERIOD;
                events.push(TimerEvent::BlinkToggle {
                    channel: *channel,
                    on: blink.level,
                });
            }
        }
        for channel in ended {
            self.blinks.remove(&channel);
            events.push(TimerEvent::BlinkEnded(channel));
        }

        if let Some(wait) = self.wait.take_if(|wait| now >= wait.deadline) {
            events.push(TimerEvent::WaitElapsed {
                step: wait.step,
                then: wait.then,
            });
        }

        events
    }

    /// Drop every timer. Returns the outputs that were still being driven
    /// (pending scheduled OFFs and blinks), in channel order.
    pub fn clear(&mut self) -> Vec<Channel> {
        let mut driven: Vec<Channel> = self
            .scheduled_off
            .keys()
            .map(|(_, channel)| *channel)
            .chain(self.blinks.keys().copied())
            .collect();
        driven.sort_unstable();
        driven.dedup();

        self.scheduled_off.clear();
        self.wait = None;
        self.blinks.clear();
        driven
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(n: u8) -> Channel {
        Channel::new(n).unwrap()
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn should_fire_scheduled_off_only_after_deadline() {
        let t0 = Instant::now();
        let mut timers = RuleTimers::new();
        timers.schedule_off(0, ch(3), t0 + ms(5_000));

        assert!(timers.expire(t0 + ms(4_900)).is_empty());
        assert!(timers.has_scheduled_off(ch(3)));
        assert_eq!(
            timers.expire(t0 + ms(5_100)),
            vec![TimerEvent::TurnOff(ch(3))]
        );
        assert!(timers.is_idle());
    }

    #[test]
    fn should_keep_separate_offs_per_step() {
        let t0 = Instant::now();
        let mut timers = RuleTimers::new();
        timers.schedule_off(0, ch(1), t0 + ms(1_000));
        timers.schedule_off(1, ch(1), t0 + ms(3_000));

        assert_eq!(timers.expire(t0 + ms(1_000)), vec![TimerEvent::TurnOff(ch(1))]);
        assert!(timers.has_scheduled_off(ch(1)));
    }

    #[test]
    fn should_toggle_blink_each_period_and_end_off() {
        let t0 = Instant::now();
        let mut timers = RuleTimers::new();
        timers.start_blink(ch(4), t0, Some(t0 + ms(3_000)));

        assert!(timers.expire(t0 + ms(500)).is_empty());
        assert_eq!(
            timers.expire(t0 + ms(1_000)),
            vec![TimerEvent::BlinkToggle {
                channel: ch(4),
                on: false
            }]
        );
        assert!(timers.expire(t0 + ms(1_500)).is_empty());
        assert_eq!(
            timers.expire(t0 + ms(2_000)),
            vec![TimerEvent::BlinkToggle {
                channel: ch(4),
                on: true
            }]
        );
        assert_eq!(
            timers.expire(t0 + ms(3_000)),
            vec![TimerEvent::BlinkEnded(ch(4))]
        );
        assert!(!timers.is_blinking(ch(4)));
    }

    #[test]
    fn should_blink_forever_without_end() {
        let t0 = Instant::now();
        let mut timers = RuleTimers::new();
        timers.start_blink(ch(2), t0, None);

        for second in 1..=10u64 {
            let events = timers.expire(t0 + Duration::from_secs(second));
            assert_eq!(events.len(), 1);
        }
        assert!(timers.is_blinking(ch(2)));
    }

    #[test]
    fn should_elapse_wait_once() {
        let t0 = Instant::now();
        let mut timers = RuleTimers::new();
        timers.start_wait(2, t0 + ms(2_000), None);
        assert!(timers.is_waiting());

        assert!(timers.expire(t0 + ms(1_999)).is_empty());
        assert_eq!(
            timers.expire(t0 + ms(2_000)),
            vec![TimerEvent::WaitElapsed {
                step: 2,
                then: None
            }]
        );
        assert!(!timers.is_waiting());
        assert!(timers.expire(t0 + ms(3_000)).is_empty());
    }

    #[test]
    fn should_report_driven_outputs_on_clear() {
        let t0 = Instant::now();
        let mut timers = RuleTimers::new();
        timers.schedule_off(0, ch(5), t0 + ms(1_000));
        timers.schedule_off(1, ch(5), t0 + ms(2_000));
        timers.start_blink(ch(2), t0, None);
        timers.start_wait(3, t0 + ms(1_000), None);

        assert_eq!(timers.clear(), vec![ch(2), ch(5)]);
        assert!(timers.is_idle());
    }
}
