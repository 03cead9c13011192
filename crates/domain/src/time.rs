//! Time and timestamp helpers.
//!
//! Wall-clock [`Timestamp`]s are used for persisted records (`saved_at`).
//! Deadlines inside the engine use the monotonic [`std::time::Instant`]
//! and are always passed in explicitly so ticks stay deterministic.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// UTC timestamp used for persisted records.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Convert a whole number of seconds from the step language into a [`Duration`].
#[must_use]
pub const fn seconds(secs: u64) -> Duration {
    Duration::from_secs(secs)
}
