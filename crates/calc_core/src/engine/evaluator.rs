//! Operation evaluator.
//!
//! # Responsibility
//! - Validate operands against operation domain rules.
//! - Compute the result and round it to 10 fractional digits.
//!
//! # Invariants
//! - Validation order: operation code, missing operand, division by zero,
//!   negative square root, then computation.
//! - Rounding is half away from zero (`f64::round`) at a 1e10 scale.
//! - Returned results are finite and never `-0.0`.

use crate::model::calculation::Operation;
use std::error::Error;
use std::fmt::{Display, Formatter};

const ROUNDING_SCALE: f64 = 1e10;
// 2^53: past this magnitude every scaled f64 is already an integer.
const MAX_EXACT_SCALED: f64 = 9_007_199_254_740_992.0;

/// Evaluation failure kinds. All map to a bad-input response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Operation code is not one of the supported codes.
    InvalidOperation(String),
    /// Required operand absent (operand2 for binary operations).
    MissingOperand,
    DivisionByZero,
    NegativeSqrt,
    /// Operand text is not a finite decimal number.
    MalformedNumber(String),
    /// Result overflowed or is undefined (e.g. `(-8) ^ 0.5`).
    NonFiniteResult,
}

impl Display for EvalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidOperation(code) => write!(f, "invalid operation: `{code}`"),
            Self::MissingOperand => write!(f, "a required operand is missing"),
            Self::DivisionByZero => write!(f, "division by zero is not allowed"),
            Self::NegativeSqrt => write!(f, "square root of a negative number is not allowed"),
            Self::MalformedNumber(raw) => write!(f, "invalid number input: `{raw}`"),
            Self::NonFiniteResult => write!(f, "result is not a finite number"),
        }
    }
}

impl Error for EvalError {}

/// Successful evaluation outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub operation: Operation,
    /// Normalized second operand; always `None` for `sqrt`.
    pub operand2: Option<f64>,
    pub result: f64,
}

/// Evaluates a raw operation code.
pub fn evaluate(
    operand1: f64,
    operand2: Option<f64>,
    operation_code: &str,
) -> Result<Evaluation, EvalError> {
    let operation = Operation::from_code(operation_code)
        .ok_or_else(|| EvalError::InvalidOperation(operation_code.to_string()))?;
    evaluate_with(operand1, operand2, operation)
}

/// Evaluates an already-parsed operation.
pub fn evaluate_with(
    operand1: f64,
    operand2: Option<f64>,
    operation: Operation,
) -> Result<Evaluation, EvalError> {
    let (raw, operand2) = match (operation, operand2) {
        (Operation::Sqrt, _) if operand1 < 0.0 => return Err(EvalError::NegativeSqrt),
        (Operation::Sqrt, _) => (operand1.sqrt(), None),
        (_, None) => return Err(EvalError::MissingOperand),
        (Operation::Divide, Some(b)) if b == 0.0 => return Err(EvalError::DivisionByZero),
        (Operation::Add, Some(b)) => (operand1 + b, Some(b)),
        (Operation::Subtract, Some(b)) => (operand1 - b, Some(b)),
        (Operation::Multiply, Some(b)) => (operand1 * b, Some(b)),
        (Operation::Divide, Some(b)) => (operand1 / b, Some(b)),
        (Operation::Power, Some(b)) => (operand1.powf(b), Some(b)),
    };

    if !raw.is_finite() {
        return Err(EvalError::NonFiniteResult);
    }

    Ok(Evaluation {
        operation,
        operand2,
        result: round_result(raw),
    })
}

/// Rounds to 10 fractional digits, half away from zero.
pub fn round_result(value: f64) -> f64 {
    let scaled = value * ROUNDING_SCALE;
    if !scaled.is_finite() || scaled.abs() >= MAX_EXACT_SCALED {
        return normalize_zero(value);
    }
    normalize_zero(scaled.round() / ROUNDING_SCALE)
}

/// Parses one operand from user text.
pub fn parse_operand(raw: &str) -> Result<f64, EvalError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(EvalError::MalformedNumber(trimmed.to_string())),
    }
}

fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}
