//! Simple gate rule: one or two inputs drive one output.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::io::DigitalState;

/// How the inputs of a [`SimpleRule`] are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimpleLogic {
    #[serde(rename = "Single DI", alias = "single")]
    Single,
    #[serde(rename = "AND Gate", alias = "and")]
    And,
    #[serde(rename = "OR Gate", alias = "or")]
    Or,
}

impl SimpleLogic {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Single => "Single DI",
            Self::And => "AND Gate",
            Self::Or => "OR Gate",
        }
    }
}

impl fmt::Display for SimpleLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleRule {
    pub logic: SimpleLogic,
    pub di1: Channel,
    /// Required by [`SimpleLogic::And`] and [`SimpleLogic::Or`].
    #[serde(default)]
    pub di2: Option<Channel>,
    #[serde(rename = "do")]
    pub output: Channel,
    /// Seconds the output stays ON. `0` keeps it ON.
    #[serde(default)]
    pub duration: u64,
}

impl SimpleRule {
    /// Whether the gate is open for this snapshot.
    ///
    /// A gate missing its second input is closed.
    #[must_use]
    pub fn gate(&self, state: &DigitalState) -> bool {
        let first = state.input(self.di1);
        match (self.logic, self.di2) {
            (SimpleLogic::Single, _) => first,
            (SimpleLogic::And, Some(second)) => first && state.input(second),
            (SimpleLogic::Or, Some(second)) => first || state.input(second),
            (_, None) => false,
        }
    }
}

impl fmt::Display for SimpleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: DI{}", self.logic, self.di1)?;
        match (self.logic, self.di2) {
            (SimpleLogic::And, Some(second)) => write!(f, " & DI{second}")?,
            (SimpleLogic::Or, Some(second)) => write!(f, " | DI{second}")?,
            _ => {}
        }
        write!(f, " -> DO{} ({}s)", self.output, self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(n: u8) -> Channel {
        Channel::new(n).unwrap()
    }

    fn rule(logic: SimpleLogic) -> SimpleRule {
        SimpleRule {
            logic,
            di1: ch(1),
            di2: Some(ch(2)),
            output: ch(3),
            duration: 5,
        }
    }

    #[test]
    fn should_open_gate_per_logic() {
        let only_first = DigitalState::from_masks(0b01, 0);
        let both = DigitalState::from_masks(0b11, 0);

        assert!(rule(SimpleLogic::Single).gate(&only_first));
        assert!(!rule(SimpleLogic::And).gate(&only_first));
        assert!(rule(SimpleLogic::And).gate(&both));
        assert!(rule(SimpleLogic::Or).gate(&only_first));
        assert!(!rule(SimpleLogic::Or).gate(&DigitalState::default()));
    }

    #[test]
    fn should_keep_gate_closed_without_second_input() {
        let mut gate = rule(SimpleLogic::Or);
        gate.di2 = None;
        assert!(!gate.gate(&DigitalState::from_masks(0xFF, 0)));
    }

    #[test]
    fn should_read_persisted_labels() {
        let rule: SimpleRule = serde_json::from_str(
            r#"{"logic": "AND Gate", "di1": 1, "di2": 2, "do": 3, "duration": 5}"#,
        )
        .unwrap();
        assert_eq!(rule.logic, SimpleLogic::And);
        assert_eq!(rule.output, ch(3));
    }

    #[test]
    fn should_accept_null_second_input() {
        let rule: SimpleRule = serde_json::from_str(
            r#"{"logic": "Single DI", "di1": 4, "di2": null, "do": 1, "duration": 0}"#,
        )
        .unwrap();
        assert_eq!(rule.di2, None);
    }

    #[test]
    fn should_display_summary() {
        assert_eq!(
            rule(SimpleLogic::Or).to_string(),
            "OR Gate: DI1 | DI2 -> DO3 (5s)"
        );
    }
}
