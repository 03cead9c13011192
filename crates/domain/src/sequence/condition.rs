//! Conditions: the left-hand side of a step.

use std::fmt;

use super::lexeme;
use crate::channel::Channel;
use crate::io::{DigitalState, EdgeSamples};

/// A single term of a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    /// `DI<n>`: input `n` is ON.
    Input(Channel),
    /// `DI<n>(EDGE)` or `DI<n>(ONCE)`: input `n` rose on this tick.
    Rising(Channel),
    /// `DO<n>`: output `n` is ON.
    Output(Channel),
    /// `DO<n>(ON)` or `DO<n>(OFF)`.
    OutputIs { channel: Channel, on: bool },
    /// Anything else. Always evaluates to `false`.
    Invalid(String),
}

impl Atom {
    /// Parse one whitespace-free token. Never fails.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        lexeme::parse_atom(token).unwrap_or_else(|| Self::Invalid(token.to_string()))
    }

    #[must_use]
    pub fn evaluate(&self, state: &DigitalState, edges: &EdgeSamples) -> bool {
        match self {
            Self::Input(channel) => state.input(*channel),
            Self::Rising(channel) => edges.rose(*channel),
            Self::Output(channel) => state.output(*channel),
            Self::OutputIs { channel, on } => state.output(*channel) == *on,
            Self::Invalid(_) => false,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid(_))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(channel) => write!(f, "DI{channel}"),
            Self::Rising(channel) => write!(f, "DI{channel}(EDGE)"),
            Self::Output(channel) => write!(f, "DO{channel}"),
            Self::OutputIs { channel, on: true } => write!(f, "DO{channel}(ON)"),
            Self::OutputIs { channel, on: false } => write!(f, "DO{channel}(OFF)"),
            Self::Invalid(text) => f.write_str(text),
        }
    }
}

/// A condition over the I/O snapshot.
///
/// A condition uses at most one operator type. When both `&` and `|` are
/// present `&` wins and any `|` stays inside an atom, which then parses as
/// [`Atom::Invalid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Single(Atom),
    All(Vec<Atom>),
    Any(Vec<Atom>),
}

impl Condition {
    /// Parse a condition. Whitespace anywhere is ignored. Never fails.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.contains('&') {
            Self::All(compact.split('&').map(Atom::parse).collect())
        } else if compact.contains('|') {
            Self::Any(compact.split('|').map(Atom::parse).collect())
        } else {
            Self::Single(Atom::parse(&compact))
        }
    }

    /// Evaluate against a snapshot and this tick's edge samples.
    ///
    /// Pure: repeated evaluation within one tick always agrees.
    #[must_use]
    pub fn evaluate(&self, state: &DigitalState, edges: &EdgeSamples) -> bool {
        match self {
            Self::Single(atom) => atom.evaluate(state, edges),
            Self::All(atoms) => atoms.iter().all(|atom| atom.evaluate(state, edges)),
            Self::Any(atoms) => atoms.iter().any(|atom| atom.evaluate(state, edges)),
        }
    }

    #[must_use]
    pub fn atoms(&self) -> &[Atom] {
        match self {
            Self::Single(atom) => std::slice::from_ref(atom),
            Self::All(atoms) | Self::Any(atoms) => atoms,
        }
    }

    /// Human-readable notes about atoms that will never be true.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        self.atoms()
            .iter()
            .filter_map(|atom| match atom {
                Atom::Invalid(text) => Some(format!("invalid condition atom `{text}`")),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = match self {
            Self::Single(_) | Self::All(_) => "&",
            Self::Any(_) => "|",
        };
        for (position, atom) in self.atoms().iter().enumerate() {
            if position > 0 {
                f.write_str(separator)?;
            }
            atom.fmt(f)?;
        }
        Ok(())
    }
}
