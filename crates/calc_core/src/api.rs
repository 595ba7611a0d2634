//! JSON boundary for calculation use-cases.
//!
//! # Responsibility
//! - Decode loosely-typed request bodies (numbers or numeric strings).
//! - Shape successful results and errors into stable JSON envelopes.
//!
//! # Invariants
//! - Functions in this module never panic; every failure becomes
//!   `{"error": ...}` with a category status code.
//! - Views are built from stored records, never from request input.

use crate::engine::evaluator::{parse_operand, EvalError};
use crate::history::anonymous::{AnonymousHistory, HistoryEntry};
use crate::history::statistics::HistoryService;
use crate::model::calculation::{Calculation, CalculationId, Operation};
use crate::model::principal::{Principal, PrincipalId};
use crate::repo::calculation_repo::CalculationRepository;
use crate::repo::principal_repo::PrincipalRepository;
use crate::service::calculation_service::{
    CalculationService, CalculationUpdate, ListFilters, OperandSet,
};
use crate::service::error::{ErrorCategory, ServiceError};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Uniform boundary result: HTTP-style status plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status: 200, body },
            Err(err) => {
                error!("event=api_encode module=api status=error error={err}");
                Self::failure(ErrorCategory::Internal, "failed to encode response")
            }
        }
    }

    fn failure(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            status: category.status_code(),
            body: json!({ "error": message.into() }),
        }
    }

    fn from_error(err: &ServiceError) -> Self {
        let category = err.category();
        if category == ErrorCategory::Internal {
            error!(
                "event=api_error module=api status=error category={} error={err}",
                category.as_str()
            );
        } else {
            warn!(
                "event=api_error module=api status=rejected category={}",
                category.as_str()
            );
        }
        Self::failure(category, err.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Operand as received: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OperandInput {
    Number(f64),
    Text(String),
}

impl OperandInput {
    fn resolve(&self) -> Result<f64, EvalError> {
        match self {
            Self::Number(value) if value.is_finite() => Ok(*value),
            Self::Number(value) => Err(EvalError::MalformedNumber(value.to_string())),
            Self::Text(raw) => parse_operand(raw),
        }
    }
}

/// Body of calculate requests (owned and anonymous).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CalculateRequest {
    pub operand1: Option<OperandInput>,
    pub operand2: Option<OperandInput>,
    pub operation: Option<String>,
}

impl CalculateRequest {
    fn resolve(&self) -> Result<(f64, Option<f64>, &str), EvalError> {
        let operation = self.operation.as_deref().map(str::trim).unwrap_or_default();
        if Operation::from_code(operation).is_none() {
            return Err(EvalError::InvalidOperation(operation.to_string()));
        }
        let operand1 = self
            .operand1
            .as_ref()
            .ok_or(EvalError::MissingOperand)?
            .resolve()?;
        let operand2 = self.operand2.as_ref().map(OperandInput::resolve).transpose()?;
        Ok((operand1, operand2, operation))
    }
}

/// Body of update requests. Operand fields must come as a full set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpdateRequest {
    pub operand1: Option<OperandInput>,
    pub operand2: Option<OperandInput>,
    pub operation: Option<String>,
    pub owner_id: Option<PrincipalId>,
}

impl UpdateRequest {
    fn resolve(&self) -> Result<CalculationUpdate, ServiceError> {
        let operands = match (&self.operand1, &self.operation) {
            (None, None) if self.operand2.is_none() => None,
            (Some(_), Some(_)) => {
                let request = CalculateRequest {
                    operand1: self.operand1.clone(),
                    operand2: self.operand2.clone(),
                    operation: self.operation.clone(),
                };
                let (operand1, operand2, operation) = request.resolve()?;
                Some(OperandSet {
                    operand1,
                    operand2,
                    operation: operation.to_string(),
                })
            }
            _ => return Err(ServiceError::IncompleteOperandSet),
        };
        Ok(CalculationUpdate {
            operands,
            owner: self.owner_id,
        })
    }
}

/// Body of clear requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClearRequest {
    pub all_users: bool,
}

/// Public projection of a stored calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationView {
    pub id: CalculationId,
    pub owner_id: PrincipalId,
    /// Owner display name.
    pub username: String,
    pub operand1: f64,
    pub operand2: Option<f64>,
    pub operation: &'static str,
    pub operation_display: &'static str,
    pub result: f64,
    pub expression: String,
    /// RFC 3339, UTC, millisecond precision.
    pub created_at: String,
}

impl From<&Calculation> for CalculationView {
    fn from(calculation: &Calculation) -> Self {
        Self {
            id: calculation.id,
            owner_id: calculation.owner,
            username: calculation.owner_name.clone(),
            operand1: calculation.operand1,
            operand2: calculation.operand2,
            operation: calculation.operation.code(),
            operation_display: calculation.operation.display_label(),
            result: calculation.result,
            expression: calculation.expression.clone(),
            created_at: format_timestamp(calculation.created_at),
        }
    }
}

/// Anonymous history entry with its rendered expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntryView {
    #[serde(flatten)]
    pub entry: HistoryEntry,
    pub expression: String,
    pub created_at: String,
}

impl From<&HistoryEntry> for HistoryEntryView {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            entry: entry.clone(),
            expression: entry.expression(),
            created_at: format_timestamp(entry.timestamp),
        }
    }
}

#[derive(Serialize)]
struct CalculateResponse {
    result: f64,
    calculation: CalculationView,
}

#[derive(Serialize)]
struct StatisticsResponse {
    total_calculations: u64,
    recent_calculations: Vec<CalculationView>,
}

#[derive(Serialize)]
struct ClearResponse {
    message: &'static str,
    deleted: u64,
}

#[derive(Serialize)]
struct AnonymousCalculateResponse {
    result: f64,
    expression: String,
    history: Vec<HistoryEntryView>,
}

/// Decodes a JSON request body, mapping failures to a bad-input response.
pub fn decode_body<T: DeserializeOwned + Default>(body: &str) -> Result<T, ApiResponse> {
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(body).map_err(|err| {
        warn!("event=api_decode module=api status=rejected error={err}");
        ApiResponse::failure(ErrorCategory::BadInput, format!("invalid request body: {err}"))
    })
}

/// Evaluates and stores a calculation: `{result, calculation}`.
pub fn calculate<R: CalculationRepository, P: PrincipalRepository>(
    service: &CalculationService<R, P>,
    principal: Option<&Principal>,
    request: &CalculateRequest,
) -> ApiResponse {
    if principal.is_none() {
        return ApiResponse::from_error(&ServiceError::Unauthorized);
    }
    let outcome = request
        .resolve()
        .map_err(ServiceError::from)
        .and_then(|(operand1, operand2, operation)| {
            service.create(principal, operand1, operand2, operation)
        });
    match outcome {
        Ok(calculation) => ApiResponse::ok(CalculateResponse {
            result: calculation.result,
            calculation: CalculationView::from(&calculation),
        }),
        Err(err) => ApiResponse::from_error(&err),
    }
}

/// Returns one calculation view.
pub fn get_calculation<R: CalculationRepository, P: PrincipalRepository>(
    service: &CalculationService<R, P>,
    principal: Option<&Principal>,
    id: CalculationId,
) -> ApiResponse {
    match service.get(id, principal) {
        Ok(calculation) => ApiResponse::ok(CalculationView::from(&calculation)),
        Err(err) => ApiResponse::from_error(&err),
    }
}

/// Applies an update and returns the re-derived calculation view.
///
/// Access is checked before the body, so denials never surface as bad input.
pub fn update_calculation<R: CalculationRepository, P: PrincipalRepository>(
    service: &CalculationService<R, P>,
    principal: Option<&Principal>,
    id: CalculationId,
    request: &UpdateRequest,
) -> ApiResponse {
    if principal.is_none() {
        return ApiResponse::from_error(&ServiceError::Unauthorized);
    }
    let outcome = service
        .get(id, principal)
        .and_then(|_| request.resolve())
        .and_then(|update| service.update(id, principal, &update));
    match outcome {
        Ok(calculation) => ApiResponse::ok(CalculationView::from(&calculation)),
        Err(err) => ApiResponse::from_error(&err),
    }
}

/// Deletes one calculation: `{message}`.
pub fn delete_calculation<R: CalculationRepository, P: PrincipalRepository>(
    service: &CalculationService<R, P>,
    principal: Option<&Principal>,
    id: CalculationId,
) -> ApiResponse {
    match service.delete(id, principal) {
        Ok(()) => ApiResponse::ok(json!({ "message": "Calculation deleted" })),
        Err(err) => ApiResponse::from_error(&err),
    }
}

/// Lists calculations: `[CalculationView]`.
pub fn list_calculations<R: CalculationRepository, P: PrincipalRepository>(
    service: &CalculationService<R, P>,
    principal: Option<&Principal>,
    filters: &ListFilters,
) -> ApiResponse {
    match service.list(principal, filters) {
        Ok(calculations) => ApiResponse::ok(
            calculations
                .iter()
                .map(CalculationView::from)
                .collect::<Vec<_>>(),
        ),
        Err(err) => ApiResponse::from_error(&err),
    }
}

/// Clears history: `{message, deleted}`.
pub fn clear_history<R: CalculationRepository, P: PrincipalRepository>(
    service: &CalculationService<R, P>,
    principal: Option<&Principal>,
    request: &ClearRequest,
) -> ApiResponse {
    match service.clear(principal, request.all_users) {
        Ok(outcome) => ApiResponse::ok(ClearResponse {
            message: match outcome.scope.owner_filter() {
                Some(_) => "Your history has been cleared",
                None => "All history has been cleared",
            },
            deleted: outcome.deleted,
        }),
        Err(err) => ApiResponse::from_error(&err),
    }
}

/// Scoped statistics: `{total_calculations, recent_calculations}`.
pub fn statistics<R: CalculationRepository>(
    history: &HistoryService<R>,
    principal: Option<&Principal>,
) -> ApiResponse {
    match history.statistics(principal) {
        Ok(stats) => ApiResponse::ok(StatisticsResponse {
            total_calculations: stats.total_count,
            recent_calculations: stats.recent.iter().map(CalculationView::from).collect(),
        }),
        Err(err) => ApiResponse::from_error(&err),
    }
}

/// Unauthenticated calculate: evaluates, records in the shared buffer and
/// returns `{result, expression, history}`. Nothing is persisted.
pub fn anonymous_calculate(history: &AnonymousHistory, request: &CalculateRequest) -> ApiResponse {
    let outcome = request.resolve().and_then(|(operand1, operand2, operation)| {
        history.record_evaluation(operand1, operand2, operation)
    });
    match outcome {
        Ok(entry) => {
            let view = HistoryEntryView::from(&entry);
            ApiResponse::ok(AnonymousCalculateResponse {
                result: entry.result,
                expression: view.expression,
                history: anonymous_views(history),
            })
        }
        Err(err) => ApiResponse::from_error(&ServiceError::Evaluation(err)),
    }
}

/// Returns the anonymous buffer, newest first.
pub fn anonymous_history(history: &AnonymousHistory) -> ApiResponse {
    ApiResponse::ok(anonymous_views(history))
}

/// Resets the anonymous buffer.
pub fn anonymous_clear(history: &AnonymousHistory) -> ApiResponse {
    history.clear();
    ApiResponse::ok(json!({ "message": "History cleared" }))
}

fn anonymous_views(history: &AnonymousHistory) -> Vec<HistoryEntryView> {
    history.entries().iter().map(HistoryEntryView::from).collect()
}

fn format_timestamp(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| epoch_ms.to_string())
}
