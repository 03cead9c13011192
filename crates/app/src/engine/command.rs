//! Device commands and the per-tick view handed to rule machines.

use std::fmt;

use relayseq_domain::channel::{Channel, StateMap};
use relayseq_domain::io::{DigitalState, EdgeSamples};

/// An output write requested by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCommand {
    pub channel: Channel,
    pub on: bool,
}

impl DeviceCommand {
    #[must_use]
    pub const fn set(channel: Channel, on: bool) -> Self {
        Self { channel, on }
    }

    #[must_use]
    pub const fn on(channel: Channel) -> Self {
        Self::set(channel, true)
    }

    #[must_use]
    pub const fn off(channel: Channel) -> Self {
        Self::set(channel, false)
    }

    /// One command per entry of a state map, in channel order.
    #[must_use]
    pub fn from_states(states: &StateMap) -> Vec<Self> {
        states.iter().map(|(channel, on)| Self::set(channel, on)).collect()
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DO{}={}", self.channel, if self.on { "ON" } else { "OFF" })
    }
}

/// What a rule sees on one tick: the snapshot and the edges sampled for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickContext {
    pub state: DigitalState,
    pub edges: EdgeSamples,
}

impl TickContext {
    #[must_use]
    pub const fn new(state: DigitalState, edges: EdgeSamples) -> Self {
        Self { state, edges }
    }

    #[must_use]
    pub fn input(&self, channel: Channel) -> bool {
        self.state.input(channel)
    }

    #[must_use]
    pub fn output(&self, channel: Channel) -> bool {
        self.state.output(channel)
    }

    #[must_use]
    pub const fn rose(&self, channel: Channel) -> bool {
        self.edges.rose(channel)
    }
}
