//! Domain model for owned arithmetic history.
//!
//! # Responsibility
//! - Define the acting principal shape supplied by the outer auth layer.
//! - Define the single persisted entity (`Calculation`) and its write draft.
//!
//! # Invariants
//! - `operand2` is present iff the operation is binary.
//! - `result` and `expression` are derived, never caller-supplied.

pub mod calculation;
pub mod principal;
