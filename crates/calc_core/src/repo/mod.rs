//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define data access contracts for principals and calculations.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes validate the calculation shape before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Repositories never apply access policy; callers pass resolved scopes.

pub mod calculation_repo;
pub mod principal_repo;
