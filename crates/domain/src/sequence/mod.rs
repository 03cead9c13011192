//! The step mini-language used by production-line rules.
//!
//! A program is a list of steps, one per line:
//!
//! ```text
//! DI1 -> DO1(ON)
//! DI2(EDGE) & DO1 -> DO1(OFF) & DO2(BLINK):3s
//! WAIT:5s -> DO3(ON):2s
//! DI4 -> WAIT:2s
//! ```
//!
//! Parsing never fails. Text that is not a recognisable step becomes
//! [`StepKind::Inert`]; malformed atoms and directives degrade to "false"
//! and "skipped" respectively and are reported through `diagnostics()`.

mod action;
mod condition;
mod lexeme;

use std::fmt;
use std::time::Duration;

pub use action::{Action, Directive, Mode};
pub use condition::{Atom, Condition};

use crate::time::seconds;

/// A timed pause, optionally followed by an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitStep {
    pub seconds: u64,
    pub then: Option<Action>,
}

impl WaitStep {
    #[must_use]
    pub fn duration(&self) -> Duration {
        seconds(self.seconds)
    }
}

/// What a guarded step does once its condition holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Act(Action),
    Wait(WaitStep),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// `WAIT:<n>s[->action]`, fires unconditionally.
    Wait(WaitStep),
    /// `condition -> action` or `condition -> WAIT:<n>s[->action]`.
    Guarded { condition: Condition, effect: Effect },
    /// Unrecognised text. Never fires but keeps its position.
    Inert,
}

/// One line of a production-line program, with its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    source: String,
    kind: StepKind,
}

impl Step {
    /// Parse a single step. Never fails.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let source = line.trim().to_string();
        let kind = parse_kind(&source);
        Self { source, kind }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        let action_notes = |action: Option<&Action>| {
            action.map(Action::diagnostics).unwrap_or_default()
        };
        match &self.kind {
            StepKind::Inert => vec![format!("unrecognised step `{}`", self.source)],
            StepKind::Wait(wait) => action_notes(wait.then.as_ref()),
            StepKind::Guarded { condition, effect } => {
                let mut notes = condition.diagnostics();
                notes.extend(match effect {
                    Effect::Act(action) => action.diagnostics(),
                    Effect::Wait(wait) => action_notes(wait.then.as_ref()),
                });
                notes
            }
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse a whole program: one step per non-blank line.
#[must_use]
pub fn parse_program(text: &str) -> Vec<Step> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Step::parse)
        .collect()
}

fn parse_kind(text: &str) -> StepKind {
    if is_wait(text) {
        return parse_wait(text).map_or(StepKind::Inert, StepKind::Wait);
    }
    let Some((condition, effect)) = text.split_once("->") else {
        return StepKind::Inert;
    };
    let effect = effect.trim();
    let effect = if is_wait(effect) {
        match parse_wait(effect) {
            Some(wait) => Effect::Wait(wait),
            None => return StepKind::Inert,
        }
    } else {
        Effect::Act(Action::parse(effect))
    };
    StepKind::Guarded {
        condition: Condition::parse(condition),
        effect,
    }
}

fn is_wait(text: &str) -> bool {
    text.get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("WAIT:"))
}

fn parse_wait(text: &str) -> Option<WaitStep> {
    let rest = text.get(5..)?;
    let (duration, then) = match rest.split_once("->") {
        Some((duration, then)) => (duration, Some(Action::parse(then))),
        None => (rest, None),
    };
    let compact: String = duration.chars().filter(|c| !c.is_whitespace()).collect();
    let seconds = lexeme::parse_seconds(&compact)?;
    Some(WaitStep { seconds, then })
}

/// Serde helper: a program is persisted as newline-separated text, and
/// also accepted as an array of lines.
pub mod program_text {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Step, parse_program};

    pub fn serialize<S: Serializer>(steps: &[Step], serializer: S) -> Result<S::Ok, S::Error> {
        let text = steps
            .iter()
            .map(Step::source)
            .collect::<Vec<_>>()
            .join("\n");
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Step>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Lines(Vec<String>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(text) => parse_program(&text),
            Repr::Lines(lines) => lines.iter().flat_map(|line| parse_program(line)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;

    fn ch(n: u8) -> Channel {
        Channel::new(n).unwrap()
    }

    #[test]
    fn should_parse_guarded_action() {
        let step = Step::parse("DI1 -> DO1(ON)");
        let StepKind::Guarded { condition, effect } = step.kind() else {
            panic!("expected guarded step, got {:?}", step.kind());
        };
        assert_eq!(condition, &Condition::Single(Atom::Input(ch(1))));
        let Effect::Act(action) = effect else {
            panic!("expected action");
        };
        assert_eq!(action.directives[0].channel, ch(1));
        assert_eq!(step.source(), "DI1 -> DO1(ON)");
    }

    #[test]
    fn should_parse_bare_wait_case_insensitively() {
        for text in ["WAIT:5s", "wait:5s", "Wait: 5s"] {
            let step = Step::parse(text);
            assert_eq!(
                step.kind(),
                &StepKind::Wait(WaitStep {
                    seconds: 5,
                    then: None
                }),
                "`{text}`"
            );
        }
    }

    #[test]
    fn should_parse_wait_with_follow_up_action() {
        let step = Step::parse("WAIT:2s->DO3(ON):4s");
        let StepKind::Wait(wait) = step.kind() else {
            panic!("expected wait");
        };
        assert_eq!(wait.seconds, 2);
        assert_eq!(wait.duration(), Duration::from_secs(2));
        let then = wait.then.as_ref().unwrap();
        assert_eq!(then.directives[0].channel, ch(3));
        assert_eq!(then.duration_secs, 4);
    }

    #[test]
    fn should_parse_guarded_wait() {
        let step = Step::parse("DI4 -> WAIT:3s -> DO2(OFF)");
        let StepKind::Guarded {
            condition,
            effect: Effect::Wait(wait),
        } = step.kind()
        else {
            panic!("expected guarded wait, got {:?}", step.kind());
        };
        assert_eq!(condition, &Condition::Single(Atom::Input(ch(4))));
        assert_eq!(wait.seconds, 3);
        assert_eq!(wait.then.as_ref().unwrap().directives[0].mode, Mode::Off);
    }

    #[test]
    fn should_mark_unrecognised_text_inert() {
        for text in ["hello", "DI1 DO1", "WAIT:xs", "WAIT:", "DI1 -> WAIT:abc"] {
            let step = Step::parse(text);
            assert_eq!(step.kind(), &StepKind::Inert, "`{text}`");
            assert_eq!(step.diagnostics().len(), 1);
        }
    }

    #[test]
    fn should_collect_diagnostics_from_condition_and_action() {
        let step = Step::parse("DI9 -> DO1(ON)&DO0");
        assert_eq!(
            step.diagnostics(),
            vec![
                "invalid condition atom `DI9`".to_string(),
                "invalid action token `DO0`".to_string()
            ]
        );
    }

    #[test]
    fn should_skip_blank_lines_in_program() {
        let steps = parse_program("DI1->DO1(ON)\n\n   \nDI2->DO1(OFF)\n");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].source(), "DI2->DO1(OFF)");
    }

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Program {
        #[serde(with = "program_text")]
        steps: Vec<Step>,
    }

    #[test]
    fn should_persist_program_as_newline_text() {
        let program = Program {
            steps: parse_program("DI1->DO1(ON)\nWAIT:1s"),
        };
        let json = serde_json::to_value(&program).unwrap();
        assert_eq!(json, serde_json::json!({"steps": "DI1->DO1(ON)\nWAIT:1s"}));
    }

    #[test]
    fn should_accept_program_as_array_of_lines() {
        let program: Program =
            serde_json::from_str(r#"{"steps": ["DI1->DO1(ON)", "DI2->DO1(OFF)"]}"#).unwrap();
        assert_eq!(program.steps.len(), 2);
    }
}
