//! Calculation domain model.
//!
//! # Responsibility
//! - Define the supported arithmetic operations and their stable codes.
//! - Define the persisted `Calculation` record and its write-side draft.
//!
//! # Invariants
//! - `operand2.is_some()` exactly when `operation.is_binary()`.
//! - `id` and `created_at` are assigned by the store and never change.

use crate::model::principal::PrincipalId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned calculation identifier.
pub type CalculationId = i64;

/// Supported arithmetic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Sqrt,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::Power,
        Self::Sqrt,
    ];

    /// Stable wire/storage code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Power => "power",
            Self::Sqrt => "sqrt",
        }
    }

    /// Parses a stable code. Matching is exact; `"ADD"` is not accepted.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|operation| operation.code() == code)
    }

    /// Symbol used by the canonical expression.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Power => "^",
            Self::Sqrt => "√",
        }
    }

    /// Human-readable label for views.
    pub fn display_label(self) -> &'static str {
        match self {
            Self::Add => "Addition",
            Self::Subtract => "Subtraction",
            Self::Multiply => "Multiplication",
            Self::Divide => "Division",
            Self::Power => "Exponentiation",
            Self::Sqrt => "Square root",
        }
    }

    /// Every operation except `Sqrt` takes two operands.
    pub fn is_binary(self) -> bool {
        !matches!(self, Self::Sqrt)
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Structural violation of the calculation invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalculationValidationError {
    /// Binary operation stored without its second operand.
    MissingOperand2(Operation),
    /// Unary operation stored with a second operand.
    UnexpectedOperand2(Operation),
    /// Derived expression is empty.
    EmptyExpression,
}

impl Display for CalculationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingOperand2(operation) => {
                write!(f, "operand2 is required for `{operation}`")
            }
            Self::UnexpectedOperand2(operation) => {
                write!(f, "operand2 must be absent for `{operation}`")
            }
            Self::EmptyExpression => write!(f, "expression must not be empty"),
        }
    }
}

impl Error for CalculationValidationError {}

fn validate_shape(
    operation: Operation,
    operand2: Option<f64>,
    expression: &str,
) -> Result<(), CalculationValidationError> {
    match (operation.is_binary(), operand2) {
        (true, None) => return Err(CalculationValidationError::MissingOperand2(operation)),
        (false, Some(_)) => {
            return Err(CalculationValidationError::UnexpectedOperand2(operation))
        }
        _ => {}
    }
    if expression.is_empty() {
        return Err(CalculationValidationError::EmptyExpression);
    }
    Ok(())
}

/// Evaluated, rendered calculation ready to be written.
///
/// Only the engine builds drafts, so `result`/`expression` always match the
/// operands they were derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationDraft {
    pub owner: PrincipalId,
    pub operand1: f64,
    pub operand2: Option<f64>,
    pub operation: Operation,
    pub result: f64,
    pub expression: String,
}

impl CalculationDraft {
    /// Checks the operand2/operation shape before persistence.
    pub fn validate(&self) -> Result<(), CalculationValidationError> {
        validate_shape(self.operation, self.operand2, &self.expression)
    }
}

/// Persisted calculation record.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub id: CalculationId,
    pub owner: PrincipalId,
    /// Owner display name, joined on read.
    pub owner_name: String,
    pub operand1: f64,
    pub operand2: Option<f64>,
    pub operation: Operation,
    pub result: f64,
    pub expression: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Calculation {
    /// Checks the operand2/operation shape of a stored row.
    pub fn validate(&self) -> Result<(), CalculationValidationError> {
        validate_shape(self.operation, self.operand2, &self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::{CalculationDraft, CalculationValidationError, Operation};
    use uuid::Uuid;

    #[test]
    fn codes_round_trip_for_every_operation() {
        for operation in Operation::ALL {
            assert_eq!(Operation::from_code(operation.code()), Some(operation));
        }
        assert_eq!(Operation::from_code("modulo"), None);
        assert_eq!(Operation::from_code("ADD"), None);
    }

    #[test]
    fn only_sqrt_is_unary() {
        let unary = Operation::ALL
            .into_iter()
            .filter(|operation| !operation.is_binary())
            .collect::<Vec<_>>();
        assert_eq!(unary, vec![Operation::Sqrt]);
    }

    #[test]
    fn draft_validation_enforces_operand2_shape() {
        let mut draft = CalculationDraft {
            owner: Uuid::new_v4(),
            operand1: 4.0,
            operand2: Some(1.0),
            operation: Operation::Sqrt,
            result: 2.0,
            expression: "√(4)".to_string(),
        };
        assert_eq!(
            draft.validate(),
            Err(CalculationValidationError::UnexpectedOperand2(Operation::Sqrt))
        );

        draft.operation = Operation::Add;
        draft.operand2 = None;
        assert_eq!(
            draft.validate(),
            Err(CalculationValidationError::MissingOperand2(Operation::Add))
        );
    }
}
