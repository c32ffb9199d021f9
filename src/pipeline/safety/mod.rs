//! Safety layer: red-flag detection and escalation.
//!
//! Conservative: when two escalation levels are plausible the higher one
//! wins, and callers never downgrade the result.

pub mod red_flags;

pub use red_flags::*;
