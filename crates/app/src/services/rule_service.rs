//! Rule service: moves the rule set between the store and the controller.

use relayseq_domain::error::RelaySeqError;

use crate::controller::SequenceController;
use crate::ports::{RelayDevice, RuleStore};

/// Application service restoring and persisting the configured rules.
pub struct RuleService<S> {
    store: S,
}

impl<S: RuleStore> RuleService<S> {
    /// Create a new service backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load the stored rule set into `controller`, in stored order.
    ///
    /// Rules the controller rejects are logged and skipped so that one bad
    /// record does not keep the others from running. Returns how many rules
    /// were added.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the store.
    #[tracing::instrument(skip(self, controller))]
    pub async fn restore<D: RelayDevice>(
        &self,
        controller: &mut SequenceController<D>,
    ) -> Result<usize, RelaySeqError> {
        let set = self.store.load().await?;
        let total = set.entries.len();
        let mut added = 0;
        for entry in set.entries {
            let name = entry.rule.display_name();
            match controller.add_rule(entry.rule, entry.enabled) {
                Ok(_) => added += 1,
                Err(err) => tracing::warn!(rule = %name, error = %err, "skipping stored rule"),
            }
        }
        tracing::info!(added, total, saved_at = ?set.saved_at, "rules restored");
        Ok(added)
    }

    /// Write the controller's current rule set to the store.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the store.
    #[tracing::instrument(skip(self, controller))]
    pub async fn persist<D: RelayDevice>(
        &self,
        controller: &SequenceController<D>,
    ) -> Result<(), RelaySeqError> {
        let set = controller.rule_set();
        self.store.save(&set).await?;
        tracing::info!(rules = set.entries.len(), "rules saved");
        Ok(())
    }
}
