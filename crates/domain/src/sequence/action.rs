//! Actions: the right-hand side of a step.

use std::fmt;
use std::time::Duration;

use super::lexeme;
use crate::channel::Channel;
use crate::time::seconds;

/// What a directive does to its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    On,
    Off,
    Blink,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Blink => "BLINK",
        })
    }
}

/// One `DO<n>(MODE)` term. A bare `DO<n>` means [`Mode::On`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive {
    pub channel: Channel,
    pub mode: Mode,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DO{}({})", self.channel, self.mode)
    }
}

/// A parsed action: directives applied together, plus an optional duration.
///
/// The duration bounds `ON` directives (scheduled OFF) and `BLINK`
/// directives (blink end). `0` means no duration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    pub directives: Vec<Directive>,
    pub duration_secs: u64,
    /// Tokens that could not be parsed. They are skipped on execution.
    pub rejected: Vec<String>,
}

impl Action {
    /// Parse an action. Never fails; malformed pieces land in `rejected`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let mut rejected = Vec::new();

        let (body, duration_secs) = match compact.rsplit_once(':') {
            Some((body, suffix)) => {
                let secs = lexeme::parse_seconds(suffix).unwrap_or_else(|| {
                    rejected.push(format!(":{suffix}"));
                    0
                });
                (body, secs)
            }
            None => (compact.as_str(), 0),
        };

        let mut directives = Vec::new();
        for token in body.split(['&', '|']) {
            if token.is_empty() {
                continue;
            }
            match lexeme::parse_directive(token) {
                Some(directive) => directives.push(directive),
                None => rejected.push(token.to_string()),
            }
        }

        Self {
            directives,
            duration_secs,
            rejected,
        }
    }

    /// The duration, or `None` when it is zero.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        (self.duration_secs > 0).then(|| seconds(self.duration_secs))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        self.rejected
            .iter()
            .map(|token| format!("invalid action token `{token}`"))
            .collect()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, directive) in self.directives.iter().enumerate() {
            if position > 0 {
                f.write_str("&")?;
            }
            directive.fmt(f)?;
        }
        if self.duration_secs > 0 {
            write!(f, ":{}s", self.duration_secs)?;
        }
        Ok(())
    }
}
