//! # relayseq-domain
//!
//! Pure domain model for the relay sequence controller.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Channels** (1-indexed digital inputs/outputs of the relay box)
//! - Define the **Digital I/O snapshot** refreshed on every poll tick
//! - Define the **step language** (conditions, actions, steps) as a typed AST
//!   with a total parser and pure evaluation
//! - Define **Rules** (simple gates, stations, tool picking, production lines)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod channel;
pub mod io;
pub mod rule;
pub mod sequence;
