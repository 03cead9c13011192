//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`RelaySeqError`] via `From`, so use-cases can propagate with `?`.

/// Base error for the relayseq workspace.
#[derive(Debug, thiserror::Error)]
pub enum RelaySeqError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced item does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The relay device failed (connection, read or write).
    #[error("device error")]
    Device(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The rule store failed to read or write.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Channel numbers are 1-indexed and the relay box has eight of each kind.
    #[error("channel {0} is out of range (expected 1..=8)")]
    ChannelOutOfRange(u64),

    /// A production line needs at least one step.
    #[error("production line has no steps")]
    NoSteps,

    /// AND/OR gates need a second input channel.
    #[error("{0} requires a second input channel")]
    MissingSecondInput(&'static str),

    /// A feedback-based station (duration 0) needs a feedback sensor.
    #[error("station without duration requires a feedback sensor")]
    MissingFeedbackSensor,

    /// Both tools of a tool-picking station are wired to the same sensor.
    #[error("first and second tool sensors must differ")]
    SameToolSensor,

    /// A rule with the same identifier is already configured.
    #[error("rule {0} already exists")]
    DuplicateRule(String),
}

/// Returned when a lookup by identifier finds nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}
