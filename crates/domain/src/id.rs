//! Rule identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique identifier for a [`Rule`](crate::rule::Rule).
///
/// Records stored without an `id` get a fresh random one when loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(uuid::Uuid);

impl Default for RuleId {
    fn default() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl RuleId {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First eight hex digits, enough to tell rules apart in logs.
    #[must_use]
    pub fn short(self) -> String {
        let mut text = self.0.simple().to_string();
        text.truncate(8);
        text
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RuleId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}
