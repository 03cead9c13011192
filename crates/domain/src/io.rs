//! Digital I/O snapshot and per-tick edge samples.

use crate::channel::{CHANNEL_COUNT, Channel};

/// The last known state of the relay box's eight inputs and eight outputs.
///
/// Refreshed once per poll tick. When a read fails the previous value is
/// kept; there is no interpolation beyond "last known value".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigitalState {
    pub inputs: [bool; CHANNEL_COUNT as usize],
    pub outputs: [bool; CHANNEL_COUNT as usize],
}

impl DigitalState {
    /// Decode an input bitmask and an output bitmask (bit `n-1` ↔ channel `n`).
    #[must_use]
    pub fn from_masks(inputs: u8, outputs: u8) -> Self {
        let mut state = Self::default();
        state.set_input_mask(inputs);
        state.set_output_mask(outputs);
        state
    }

    #[must_use]
    pub fn input(&self, channel: Channel) -> bool {
        self.inputs[channel.index()]
    }

    #[must_use]
    pub fn output(&self, channel: Channel) -> bool {
        self.outputs[channel.index()]
    }

    pub fn set_input(&mut self, channel: Channel, on: bool) {
        self.inputs[channel.index()] = on;
    }

    pub fn set_output(&mut self, channel: Channel, on: bool) {
        self.outputs[channel.index()] = on;
    }

    pub fn set_input_mask(&mut self, mask: u8) {
        for channel in Channel::all() {
            self.inputs[channel.index()] = mask & channel.bit() != 0;
        }
    }

    pub fn set_output_mask(&mut self, mask: u8) {
        for channel in Channel::all() {
            self.outputs[channel.index()] = mask & channel.bit() != 0;
        }
    }

    #[must_use]
    pub fn input_mask(&self) -> u8 {
        encode(&self.inputs)
    }

    #[must_use]
    pub fn output_mask(&self) -> u8 {
        encode(&self.outputs)
    }
}

fn encode(levels: &[bool; CHANNEL_COUNT as usize]) -> u8 {
    Channel::all()
        .filter(|channel| levels[channel.index()])
        .fold(0, |mask, channel| mask | channel.bit())
}

/// Rising edges observed on the inputs for one poll tick.
///
/// Computed once per tick before any rule runs; evaluation only reads it,
/// so evaluating the same edge atom several times within a tick always
/// gives the same answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeSamples {
    rising: u8,
}

impl EdgeSamples {
    /// No edges at all.
    #[must_use]
    pub const fn none() -> Self {
        Self { rising: 0 }
    }

    /// Edges between the previous tick's input mask and the current one.
    #[must_use]
    pub const fn between(previous: u8, current: u8) -> Self {
        Self {
            rising: current & !previous,
        }
    }

    /// Whether `channel` went from OFF to ON on this tick.
    #[must_use]
    pub const fn rose(&self, channel: Channel) -> bool {
        self.rising & channel.bit() != 0
    }

    #[must_use]
    pub const fn mask(&self) -> u8 {
        self.rising
    }
}
