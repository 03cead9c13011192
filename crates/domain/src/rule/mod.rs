//! Rule: a configured behaviour driving the relay outputs.
//!
//! Every rule carries the states to force when it starts
//! (`initial_states`) and when it stops (`end_states`), plus one of four
//! [`RuleKind`]s describing what it does while enabled.

mod production_line;
mod simple;
mod station;
mod tool_picking;

pub use production_line::ProductionLine;
pub use simple::{SimpleLogic, SimpleRule};
pub use station::StationRule;
pub use tool_picking::ToolPickingRule;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channel::{Channel, StateMap};
use crate::error::{RelaySeqError, ValidationError};
use crate::id::RuleId;

/// What a rule does on each poll tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    Simple(SimpleRule),
    Station(StationRule),
    ToolPicking(ToolPickingRule),
    #[serde(alias = "multi")]
    ProductionLine(ProductionLine),
}

impl RuleKind {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Simple(_) => "simple",
            Self::Station(_) => "station",
            Self::ToolPicking(_) => "tool_picking",
            Self::ProductionLine(_) => "production_line",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(rule) => rule.fmt(f),
            Self::Station(rule) => rule.fmt(f),
            Self::ToolPicking(rule) => rule.fmt(f),
            Self::ProductionLine(line) => line.fmt(f),
        }
    }
}

impl From<SimpleRule> for RuleKind {
    fn from(rule: SimpleRule) -> Self {
        Self::Simple(rule)
    }
}

impl From<StationRule> for RuleKind {
    fn from(rule: StationRule) -> Self {
        Self::Station(rule)
    }
}

impl From<ToolPickingRule> for RuleKind {
    fn from(rule: ToolPickingRule) -> Self {
        Self::ToolPicking(rule)
    }
}

impl From<ProductionLine> for RuleKind {
    fn from(line: ProductionLine) -> Self {
        Self::ProductionLine(line)
    }
}

/// A configured rule, as persisted in the rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub id: RuleId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(flatten)]
    pub kind: RuleKind,
    #[serde(default)]
    pub initial_states: StateMap,
    #[serde(default)]
    pub end_states: StateMap,
    /// On cycle completion re-apply `initial_states` instead of
    /// `end_states`; on disable leave the outputs untouched.
    #[serde(default)]
    pub return_to_initial: bool,
}

impl Rule {
    /// Create a builder for constructing a [`Rule`] of the given kind.
    #[must_use]
    pub fn builder(kind: impl Into<RuleKind>) -> RuleBuilder {
        RuleBuilder {
            id: None,
            name: String::new(),
            kind: kind.into(),
            initial_states: StateMap::new(),
            end_states: StateMap::new(),
            return_to_initial: false,
        }
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RelaySeqError::Validation`] when:
    /// - an AND/OR gate has no second input ([`ValidationError::MissingSecondInput`])
    /// - a station without duration has no feedback sensor
    ///   ([`ValidationError::MissingFeedbackSensor`])
    /// - both tool sensors are the same channel ([`ValidationError::SameToolSensor`])
    /// - a production line has no steps ([`ValidationError::NoSteps`])
    pub fn validate(&self) -> Result<(), RelaySeqError> {
        match &self.kind {
            RuleKind::Simple(rule) => {
                if rule.logic != SimpleLogic::Single && rule.di2.is_none() {
                    return Err(ValidationError::MissingSecondInput(rule.logic.label()).into());
                }
            }
            RuleKind::Station(station) => {
                if station.duration == 0 && station.feedback_sensor.is_none() {
                    return Err(ValidationError::MissingFeedbackSensor.into());
                }
            }
            RuleKind::ToolPicking(station) => {
                if station.first_tool_sensor == station.second_tool_sensor {
                    return Err(ValidationError::SameToolSensor.into());
                }
            }
            RuleKind::ProductionLine(line) => {
                if line.steps.is_empty() {
                    return Err(ValidationError::NoSteps.into());
                }
            }
        }
        Ok(())
    }

    /// Notes about parts of the rule that will never fire.
    ///
    /// Rules with diagnostics are still accepted.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        match &self.kind {
            RuleKind::ProductionLine(line) => line.diagnostics(),
            _ => Vec::new(),
        }
    }

    /// Name for logs: the configured name, else the short id.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("{}#{}", self.kind.label(), self.id.short())
        } else {
            self.name.clone()
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)?;
        if self.return_to_initial {
            f.write_str(" [Return to Initial]")?;
        }
        if !self.initial_states.is_empty() {
            write!(f, " | Init: {}", self.initial_states)?;
        }
        if !self.end_states.is_empty() {
            write!(f, " | End: {}", self.end_states)?;
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug)]
pub struct RuleBuilder {
    id: Option<RuleId>,
    name: String,
    kind: RuleKind,
    initial_states: StateMap,
    end_states: StateMap,
    return_to_initial: bool,
}

impl RuleBuilder {
    #[must_use]
    pub fn id(mut self, id: RuleId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn initial_state(mut self, channel: Channel, on: bool) -> Self {
        self.initial_states.insert(channel, on);
        self
    }

    #[must_use]
    pub fn end_state(mut self, channel: Channel, on: bool) -> Self {
        self.end_states.insert(channel, on);
        self
    }

    #[must_use]
    pub fn return_to_initial(mut self, value: bool) -> Self {
        self.return_to_initial = value;
        self
    }

    /// Consume the builder, validate, and return a [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns [`RelaySeqError::Validation`] if the rule breaks an invariant.
    pub fn build(self) -> Result<Rule, RelaySeqError> {
        let rule = Rule {
            id: self.id.unwrap_or_default(),
            name: self.name,
            kind: self.kind,
            initial_states: self.initial_states,
            end_states: self.end_states,
            return_to_initial: self.return_to_initial,
        };
        rule.validate()?;
        Ok(rule)
    }
}
