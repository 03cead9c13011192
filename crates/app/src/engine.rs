//! The rule engine: everything that happens to a rule inside one poll tick.
//!
//! Nothing in here performs IO. Rule machines turn a [`TickContext`] into
//! [`DeviceCommand`]s; the controller writes them to the device.

pub mod command;
pub mod edges;
pub mod executor;
pub mod machine;
pub mod production_line;
pub mod simple;
pub mod slot;
pub mod station;
pub mod timers;
pub mod tool_picking;

pub use command::{DeviceCommand, TickContext};
pub use edges::EdgeTracker;
pub use executor::ActionExecutor;
pub use machine::{RuleMachine, TickOutcome, machine_for};
pub use slot::RuleSlot;
pub use timers::{RuleTimers, StepIndex, TimerEvent};
