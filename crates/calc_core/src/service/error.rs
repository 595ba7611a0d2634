//! Use-case error taxonomy and its response categories.

use crate::engine::evaluator::EvalError;
use crate::model::calculation::CalculationId;
use crate::model::principal::PrincipalId;
use crate::policy::access::AccessError;
use crate::repo::calculation_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Status category attached to every error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    BadInput,
    Unauthorized,
    Forbidden,
    NotFound,
    Internal,
}

impl ErrorCategory {
    /// HTTP-style status code for the category.
    pub fn status_code(self) -> u16 {
        match self {
            Self::BadInput => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadInput => "bad_input",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

/// Error returned by calculation and history use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Operand/operation validation failed; nothing was persisted.
    Evaluation(EvalError),
    /// An update changed some but not all of operand1/operand2/operation.
    IncompleteOperandSet,
    Unauthorized,
    Forbidden,
    NotFound(CalculationId),
    /// Owner principal is not registered with the store.
    OwnerNotFound(PrincipalId),
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl ServiceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Evaluation(_) | Self::IncompleteOperandSet => ErrorCategory::BadInput,
            Self::Unauthorized => ErrorCategory::Unauthorized,
            Self::Forbidden => ErrorCategory::Forbidden,
            Self::NotFound(_) | Self::OwnerNotFound(_) => ErrorCategory::NotFound,
            Self::Repo(_) | Self::InconsistentState(_) => ErrorCategory::Internal,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Evaluation(err) => write!(f, "{err}"),
            Self::IncompleteOperandSet => write!(
                f,
                "operand1, operand2 and operation must be supplied together"
            ),
            Self::Unauthorized => write!(f, "authentication required"),
            Self::Forbidden => write!(f, "permission denied"),
            Self::NotFound(id) => write!(f, "calculation not found: {id}"),
            Self::OwnerNotFound(id) => write!(f, "principal not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent calculation state: {details}")
            }
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Evaluation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EvalError> for ServiceError {
    fn from(value: EvalError) -> Self {
        Self::Evaluation(value)
    }
}

impl From<AccessError> for ServiceError {
    fn from(value: AccessError) -> Self {
        match value {
            AccessError::Unauthorized => Self::Unauthorized,
            AccessError::Forbidden => Self::Forbidden,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::PrincipalNotFound(id) => Self::OwnerNotFound(id),
            other => Self::Repo(other),
        }
    }
}
