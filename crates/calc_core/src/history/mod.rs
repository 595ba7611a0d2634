//! History views over calculations.
//!
//! # Responsibility
//! - Owned history: total counts and recent-N views scoped by policy.
//! - Anonymous history: a shared, bounded, unowned buffer kept apart from
//!   the calculation store.

pub mod anonymous;
pub mod statistics;
