//! # relayseq-adapter-storage-json
//!
//! Rule persistence in a single pretty-printed JSON file.
//!
//! ## Responsibilities
//! - Implement the [`RuleStore`] port defined in `relayseq-app::ports`
//! - Map between the file layout (`sequences`, `enabled_states`,
//!   `saved_at`) and [`RuleSet`]
//! - Replace the file atomically so a crash mid-save keeps the old rules
//!
//! ## Dependency rule
//! Depends on `relayseq-app` (for port traits) and `relayseq-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod error;
mod file;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use relayseq_app::ports::{RuleSet, RuleStore};
use relayseq_domain::error::RelaySeqError;

pub use error::StoreError;

use file::RuleFile;

/// [`RuleStore`] backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonRuleStore {
    path: PathBuf,
}

impl JsonRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn read(&self) -> Result<RuleSet, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no rule file yet, starting empty");
                return Ok(RuleSet::default());
            }
            Err(err) => return Err(self.io_error(err)),
        };
        let file: RuleFile = serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        Ok(file.into())
    }

    async fn write(&self, rules: &RuleSet) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&RuleFile::from(rules)).map_err(|source| {
            StoreError::Json {
                path: self.path.clone(),
                source,
            }
        })?;

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| self.io_error(err))?;
        }
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, json)
            .await
            .map_err(|err| self.io_error(err))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|err| self.io_error(err))?;
        Ok(())
    }
}

impl RuleStore for JsonRuleStore {
    async fn load(&self) -> Result<RuleSet, RelaySeqError> {
        let set = self.read().await?;
        tracing::debug!(path = %self.path.display(), rules = set.entries.len(), "rule file loaded");
        Ok(set)
    }

    async fn save(&self, rules: &RuleSet) -> Result<(), RelaySeqError> {
        self.write(rules).await?;
        tracing::debug!(
            path = %self.path.display(),
            rules = rules.entries.len(),
            "rule file saved"
        );
        Ok(())
    }
}
