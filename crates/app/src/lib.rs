//! # relayseq-app
//!
//! Application layer: the rule engine, the poll controller and **port
//! definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `RelayDevice`: read inputs/outputs and drive coils on the relay box
//!   - `RuleStore`: load & save the configured rule set
//! - Run the **engine**: per-rule timers, the action executor and one state
//!   machine per rule kind
//! - Drive everything from the **`SequenceController`**, one poll tick at a time
//! - Provide the **`RuleService`** that restores and persists the rule set
//!
//! ## Dependency rule
//! Depends on `relayseq-domain` only.
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod controller;
pub mod engine;
pub mod ports;
pub mod services;
