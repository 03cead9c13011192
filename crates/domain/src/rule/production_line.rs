//! Production line: an ordered program in the step language.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sequence::{Step, parse_program, program_text};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionLine {
    #[serde(with = "program_text")]
    pub steps: Vec<Step>,
}

impl ProductionLine {
    /// Parse a newline-separated program.
    #[must_use]
    pub fn parse(program: &str) -> Self {
        Self {
            steps: parse_program(program),
        }
    }

    /// Per-step diagnostics, prefixed with the 1-based step number.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        self.steps
            .iter()
            .enumerate()
            .flat_map(|(index, step)| {
                step.diagnostics()
                    .into_iter()
                    .map(move |note| format!("step {}: {note}", index + 1))
            })
            .collect()
    }
}

impl fmt::Display for ProductionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, step) in self.steps.iter().enumerate() {
            if position > 0 {
                f.write_str("; ")?;
            }
            step.fmt(f)?;
        }
        Ok(())
    }
}
