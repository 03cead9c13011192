//! Storage-specific error type wrapping file and JSON errors.

use std::path::PathBuf;

use relayseq_domain::error::RelaySeqError;

/// Errors originating from the JSON rule file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading, writing or renaming the file failed.
    #[error("rule file {path} is not accessible")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file content is not a valid rule set.
    #[error("rule file {path} is malformed")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<StoreError> for RelaySeqError {
    fn from(err: StoreError) -> Self {
        Self::Storage(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_into_storage_error() {
        let err: RelaySeqError = StoreError::Io {
            path: PathBuf::from("rules.json"),
            source: std::io::Error::other("boom"),
        }
        .into();
        assert!(matches!(err, RelaySeqError::Storage(_)));
    }

    #[test]
    fn should_name_the_file_in_the_message() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StoreError::Json {
            path: PathBuf::from("/tmp/rules.json"),
            source,
        };
        assert_eq!(err.to_string(), "rule file /tmp/rules.json is malformed");
    }
}
