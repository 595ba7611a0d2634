//! Core domain logic for owned arithmetic history.
//! This crate is the single source of truth for calculation invariants.

pub mod api;
mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod history;
pub mod logging;
pub mod model;
pub mod policy;
pub mod repo;
pub mod service;

pub use config::{CalcConfig, ConfigError};
pub use engine::evaluator::{evaluate, parse_operand, EvalError, Evaluation};
pub use engine::render::render_expression;
pub use history::anonymous::{AnonymousHistory, HistoryEntry};
pub use history::statistics::{HistoryService, Statistics};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::calculation::{Calculation, CalculationDraft, CalculationId, Operation};
pub use model::principal::{Principal, PrincipalId};
pub use policy::access::{authorize, AccessError, AccessRequest, Scope};
pub use repo::calculation_repo::{
    CalculationListQuery, CalculationOrder, CalculationRepository, RepoError, RepoResult,
    SortField, SqliteCalculationRepository,
};
pub use repo::principal_repo::{PrincipalRepository, SqlitePrincipalRepository};
pub use service::calculation_service::{
    CalculationService, CalculationUpdate, ClearOutcome, ListFilters, OperandSet,
};
pub use service::error::{ErrorCategory, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
