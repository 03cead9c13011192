//! Rule store port: persistence for the configured rule set.

use std::future::Future;

use relayseq_domain::error::RelaySeqError;
use relayseq_domain::rule::Rule;
use relayseq_domain::time::Timestamp;

/// A rule together with its enabled flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEntry {
    pub rule: Rule,
    pub enabled: bool,
}

/// The ordered rule set. Rules are evaluated in this order on every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub entries: Vec<RuleEntry>,
    /// When the set was last written, if it ever was.
    pub saved_at: Option<Timestamp>,
}

/// Loads and saves the rule set as a whole.
pub trait RuleStore {
    /// Load the rule set. A store that has never been written loads empty.
    fn load(&self) -> impl Future<Output = Result<RuleSet, RelaySeqError>> + Send;

    /// Replace the stored rule set.
    fn save(&self, rules: &RuleSet) -> impl Future<Output = Result<(), RelaySeqError>> + Send;
}
