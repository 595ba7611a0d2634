//! Authorization decisions for calculation use-cases.
//!
//! # Invariants
//! - Anonymous callers are always `Unauthorized`, never `Forbidden`.
//! - Only staff receive `Scope::Global`.

pub mod access;
