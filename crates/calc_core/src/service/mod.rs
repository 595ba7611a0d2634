//! Core use-case services.
//!
//! # Responsibility
//! - Gate every use-case through the access policy.
//! - Orchestrate engine and repository calls into stable entry points.
//! - Keep boundary layers decoupled from storage details.

pub mod calculation_service;
pub mod error;
