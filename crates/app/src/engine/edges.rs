//! Rising-edge memory for the `DI<n>(EDGE)` atoms.

use relayseq_domain::io::EdgeSamples;

/// Remembers the input mask of the previous tick.
///
/// [`sample`](Self::sample) is called once per tick before any rule runs
/// and [`commit`](Self::commit) once after all of them ran. Inputs are
/// considered OFF before the first commit, so an input that is already ON
/// on the very first tick counts as a rising edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeTracker {
    previous: u8,
}

impl EdgeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Edges of `inputs` relative to the last committed mask.
    #[must_use]
    pub const fn sample(&self, inputs: u8) -> EdgeSamples {
        EdgeSamples::between(self.previous, inputs)
    }

    pub fn commit(&mut self, inputs: u8) {
        self.previous = inputs;
    }

    #[must_use]
    pub const fn previous(&self) -> u8 {
        self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayseq_domain::channel::Channel;

    #[test]
    fn should_report_edge_only_on_transition_tick() {
        let di1 = Channel::new(1).unwrap();
        let mut tracker = EdgeTracker::new();

        let first = tracker.sample(0b0);
        assert!(!first.rose(di1));
        tracker.commit(0b0);

        let second = tracker.sample(0b1);
        assert!(second.rose(di1));
        assert!(tracker.sample(0b1).rose(di1), "sampling twice must agree");
        tracker.commit(0b1);

        let third = tracker.sample(0b1);
        assert!(!third.rose(di1));
    }

    #[test]
    fn should_treat_inputs_as_off_before_first_commit() {
        let tracker = EdgeTracker::new();
        assert_eq!(tracker.sample(0b1010).mask(), 0b1010);
    }
}
