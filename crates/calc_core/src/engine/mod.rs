//! Pure arithmetic engine: evaluation and canonical rendering.
//!
//! # Responsibility
//! - Validate operation domain constraints and compute rounded results.
//! - Render the canonical expression string stored with each record.
//! - Combine both into write-ready drafts for the store.
//!
//! # Invariants
//! - No function in this module has side effects.
//! - A draft is only produced when evaluation succeeded.

pub mod evaluator;
pub mod render;

use crate::model::calculation::{CalculationDraft, Operation};
use crate::model::principal::PrincipalId;
use evaluator::{evaluate, evaluate_with, EvalError, Evaluation};
use render::render_expression;

/// Evaluates a raw operation code and renders the draft for `owner`.
pub fn derive_draft(
    owner: PrincipalId,
    operand1: f64,
    operand2: Option<f64>,
    operation_code: &str,
) -> Result<CalculationDraft, EvalError> {
    let evaluation = evaluate(operand1, operand2, operation_code)?;
    Ok(build_draft(owner, operand1, evaluation))
}

/// Typed variant of [`derive_draft`] for already-parsed operations.
pub fn derive_draft_with(
    owner: PrincipalId,
    operand1: f64,
    operand2: Option<f64>,
    operation: Operation,
) -> Result<CalculationDraft, EvalError> {
    let evaluation = evaluate_with(operand1, operand2, operation)?;
    Ok(build_draft(owner, operand1, evaluation))
}

fn build_draft(owner: PrincipalId, operand1: f64, evaluation: Evaluation) -> CalculationDraft {
    CalculationDraft {
        owner,
        operand1,
        operand2: evaluation.operand2,
        operation: evaluation.operation,
        result: evaluation.result,
        expression: render_expression(operand1, evaluation.operand2, evaluation.operation),
    }
}
