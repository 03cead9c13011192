//! Tool-picking station: the operator must pick two tools in order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;

/// A poka-yoke station guiding the operator through two tool picks.
///
/// Each tool has a lamp telling the operator which tool to take and a
/// sensor reporting that it was taken. Taking the wrong tool, or taking
/// nothing within `timeout` seconds, raises the alarm. `timeout == 0`
/// disables the timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPickingRule {
    pub part_sensor: Channel,
    pub first_tool_sensor: Channel,
    pub first_tool_lamp: Channel,
    pub second_tool_sensor: Channel,
    pub second_tool_lamp: Channel,
    pub alarm_device: Channel,
    #[serde(default)]
    pub timeout: u64,
}

impl fmt::Display for ToolPickingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DI{} -> tool DI{} (lamp DO{}) then tool DI{} (lamp DO{}), alarm DO{}",
            self.part_sensor,
            self.first_tool_sensor,
            self.first_tool_lamp,
            self.second_tool_sensor,
            self.second_tool_lamp,
            self.alarm_device
        )?;
        if self.timeout > 0 {
            write!(f, ", timeout {}s", self.timeout)?;
        }
        Ok(())
    }
}
