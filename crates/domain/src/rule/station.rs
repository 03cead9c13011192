//! Station rule: part sensor, process device and feedback sensor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;

/// A processing station driven by a part sensor.
///
/// When a part arrives the process device is switched on (or blinked) until
/// either `duration` seconds elapse or, with `duration == 0`, the feedback
/// sensor reports completion. `timeout == 0` disables the timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationRule {
    /// Free-form label shown in logs, e.g. `"Clamping"`.
    #[serde(default)]
    pub operation_type: String,
    pub part_sensor: Channel,
    pub process_device: Channel,
    #[serde(default)]
    pub feedback_sensor: Option<Channel>,
    #[serde(default)]
    pub skip_sensor: Option<Channel>,
    #[serde(default)]
    pub timeout: u64,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub blink_mode: bool,
}

impl StationRule {
    /// Blink with no duration keeps blinking after completion.
    #[must_use]
    pub const fn blinks_unbounded(&self) -> bool {
        self.blink_mode && self.duration == 0
    }
}

impl fmt::Display for StationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.operation_type.is_empty() {
            write!(f, "{}: ", self.operation_type)?;
        }
        write!(f, "DI{} -> DO{}", self.part_sensor, self.process_device)?;
        if self.blink_mode {
            f.write_str("(BLINK)")?;
        }
        if self.duration > 0 {
            write!(f, " for {}s", self.duration)?;
        } else if let Some(feedback) = self.feedback_sensor {
            write!(f, " until DI{feedback}")?;
        }
        if let Some(skip) = self.skip_sensor {
            write!(f, ", skip on DI{skip}")?;
        }
        if self.timeout > 0 {
            write!(f, ", timeout {}s", self.timeout)?;
        }
        Ok(())
    }
}
