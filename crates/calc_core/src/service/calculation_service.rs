//! Calculation use-case service.
//!
//! # Responsibility
//! - Evaluate, render and persist calculations for authenticated principals.
//! - Enforce owner/staff visibility on get, update, delete, list and clear.
//! - Resolve raw list filters (dates, ordering, search) into store queries.
//!
//! # Invariants
//! - Authorization runs before any write; evaluation runs before any write.
//! - Every write re-derives `result` and `expression` from the operands.
//! - Non-staff callers never observe or mutate another principal's records.

use crate::clock::now_epoch_ms;
use crate::engine::{derive_draft, derive_draft_with};
use crate::model::calculation::{Calculation, CalculationId, Operation};
use crate::model::principal::{Principal, PrincipalId};
use crate::policy::access::{authorize, require_principal, AccessRequest, Scope};
use crate::repo::calculation_repo::{
    CalculationListQuery, CalculationOrder, CalculationRepository, SortField,
};
use crate::repo::principal_repo::PrincipalRepository;
use crate::service::error::{ServiceError, ServiceResult};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Deserialize;

const DATE_FILTER_FORMAT: &str = "%Y-%m-%d";

/// Full operand triple for updates. Partial operand edits are not accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct OperandSet {
    pub operand1: f64,
    pub operand2: Option<f64>,
    pub operation: String,
}

/// Explicit update request.
///
/// `owner` is honored only for staff; non-staff updates keep the acting
/// principal as owner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculationUpdate {
    pub operands: Option<OperandSet>,
    pub owner: Option<PrincipalId>,
}

/// Raw list filters as received from the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListFilters {
    /// Exact operation code. Unknown codes match nothing.
    pub operation: Option<String>,
    /// `YYYY-MM-DD`, inclusive. Malformed values are ignored.
    pub date_from: Option<String>,
    /// `YYYY-MM-DD`, inclusive. Malformed values are ignored.
    pub date_to: Option<String>,
    pub search: Option<String>,
    /// `field` or `-field`; unknown fields fall back to `-created_at`.
    pub ordering: Option<String>,
    /// Staff only: exact owner id.
    pub owner_id: Option<PrincipalId>,
    /// Staff only: case-insensitive substring of the owner display name.
    pub username: Option<String>,
    pub limit: Option<u32>,
}

/// Outcome of a bulk clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearOutcome {
    pub deleted: u64,
    pub scope: Scope,
}

/// Use-case service over calculation and principal repositories.
pub struct CalculationService<R: CalculationRepository, P: PrincipalRepository> {
    calculations: R,
    principals: P,
}

impl<R: CalculationRepository, P: PrincipalRepository> CalculationService<R, P> {
    pub fn new(calculations: R, principals: P) -> Self {
        Self {
            calculations,
            principals,
        }
    }

    /// Registers or refreshes a principal supplied by the auth layer.
    pub fn register_principal(&self, principal: &Principal) -> ServiceResult<()> {
        self.principals.upsert_principal(principal)?;
        debug!(
            "event=principal_register module=service status=ok principal_id={} is_staff={}",
            principal.id, principal.is_staff
        );
        Ok(())
    }

    /// Removes a principal; its calculations are deleted with it.
    pub fn remove_principal(&self, id: PrincipalId) -> ServiceResult<()> {
        self.principals.delete_principal(id)?;
        info!("event=principal_remove module=service status=ok principal_id={id}");
        Ok(())
    }

    /// Evaluates and stores a calculation owned by the acting principal.
    ///
    /// # Errors
    /// - `Unauthorized` for anonymous callers.
    /// - `Evaluation(_)` when validation fails; nothing is persisted.
    /// - `OwnerNotFound` when the principal was never registered.
    pub fn create(
        &self,
        principal: Option<&Principal>,
        operand1: f64,
        operand2: Option<f64>,
        operation_code: &str,
    ) -> ServiceResult<Calculation> {
        let owner = require_principal(principal)?.id;
        authorize(principal, AccessRequest::Create)?;
        self.ensure_registered(owner)?;

        let draft = derive_draft(owner, operand1, operand2, operation_code).map_err(|err| {
            debug!(
                "event=calculation_create module=service status=rejected principal_id={owner} reason={err}"
            );
            err
        })?;
        let id = self.calculations.insert_calculation(&draft, now_epoch_ms())?;
        info!(
            "event=calculation_create module=service status=ok id={id} operation={}",
            draft.operation
        );

        self.read_back(id, "created calculation not found in read-back")
    }

    /// Gets one calculation visible to `principal`.
    pub fn get(
        &self,
        id: CalculationId,
        principal: Option<&Principal>,
    ) -> ServiceResult<Calculation> {
        require_principal(principal)?;
        let calculation = self.find(id)?;
        authorize(
            principal,
            AccessRequest::Read {
                owner: calculation.owner,
            },
        )?;
        Ok(calculation)
    }

    /// Applies an update and re-derives `result`/`expression`.
    pub fn update(
        &self,
        id: CalculationId,
        principal: Option<&Principal>,
        update: &CalculationUpdate,
    ) -> ServiceResult<Calculation> {
        let actor = require_principal(principal)?;
        let existing = self.find(id)?;
        authorize(
            principal,
            AccessRequest::Update {
                owner: existing.owner,
            },
        )?;

        let owner = if actor.is_staff {
            update.owner.unwrap_or(existing.owner)
        } else {
            actor.id
        };
        if owner != existing.owner {
            self.ensure_registered(owner)?;
        }

        let draft = match &update.operands {
            Some(set) => derive_draft(owner, set.operand1, set.operand2, &set.operation)?,
            None => derive_draft_with(
                owner,
                existing.operand1,
                existing.operand2,
                existing.operation,
            )?,
        };
        self.calculations.update_calculation(id, &draft)?;
        info!(
            "event=calculation_update module=service status=ok id={id} operation={} owner_changed={}",
            draft.operation,
            owner != existing.owner
        );

        self.read_back(id, "updated calculation not found in read-back")
    }

    /// Deletes one calculation owned by `principal`, or any one for staff.
    pub fn delete(&self, id: CalculationId, principal: Option<&Principal>) -> ServiceResult<()> {
        require_principal(principal)?;
        let calculation = self.find(id)?;
        authorize(
            principal,
            AccessRequest::Delete {
                owner: calculation.owner,
            },
        )?;
        self.calculations.delete_calculation(id)?;
        info!("event=calculation_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Lists calculations visible to `principal`.
    ///
    /// Non-staff results are always restricted to the caller; staff-only
    /// filters (`owner_id`, `username`) are ignored for them.
    pub fn list(
        &self,
        principal: Option<&Principal>,
        filters: &ListFilters,
    ) -> ServiceResult<Vec<Calculation>> {
        let actor = require_principal(principal)?;
        let request = if actor.is_staff {
            AccessRequest::ListAll
        } else {
            AccessRequest::ListOwn
        };
        let scope = authorize(principal, request)?;

        let operation = match non_empty(filters.operation.as_deref()) {
            Some(code) => match Operation::from_code(code) {
                Some(operation) => Some(operation),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let order = non_empty(filters.ordering.as_deref())
            .and_then(CalculationOrder::parse)
            .filter(|order| actor.is_staff || order.field != SortField::Username)
            .unwrap_or_default();

        let query = CalculationListQuery {
            owner: match scope {
                Scope::Owner(owner) => Some(owner),
                Scope::Global => filters.owner_id,
            },
            owner_name_contains: match scope {
                Scope::Owner(_) => None,
                Scope::Global => filters.username.clone(),
            },
            operation,
            created_from_ms: filters
                .date_from
                .as_deref()
                .and_then(|raw| parse_date_filter("date_from", raw))
                .map(start_of_day_ms),
            created_before_ms: filters
                .date_to
                .as_deref()
                .and_then(|raw| parse_date_filter("date_to", raw))
                .and_then(|date| date.succ_opt())
                .map(start_of_day_ms),
            search: filters.search.clone(),
            search_owner_name: actor.is_staff,
            order,
            limit: filters.limit,
        };

        let calculations = self.calculations.list_calculations(&query)?;
        debug!(
            "event=calculation_list module=service status=ok scope={} count={}",
            scope.label(),
            calculations.len()
        );
        Ok(calculations)
    }

    /// Deletes the caller's records, or every record for staff with
    /// `all_users`. Non-staff `all_users` requests stay self-scoped.
    pub fn clear(
        &self,
        principal: Option<&Principal>,
        all_users: bool,
    ) -> ServiceResult<ClearOutcome> {
        let actor = require_principal(principal)?;
        let request = if all_users && actor.is_staff {
            AccessRequest::ClearAll
        } else {
            AccessRequest::ClearOwn
        };
        let scope = authorize(principal, request)?;

        let deleted = self.calculations.delete_calculations(scope.owner_filter())?;
        if all_users && !actor.is_staff {
            warn!(
                "event=calculation_clear module=service status=downgraded principal_id={}",
                actor.id
            );
        }
        info!(
            "event=calculation_clear module=service status=ok scope={} deleted={deleted}",
            scope.label()
        );

        Ok(ClearOutcome { deleted, scope })
    }

    fn find(&self, id: CalculationId) -> ServiceResult<Calculation> {
        self.calculations
            .get_calculation(id)?
            .ok_or(ServiceError::NotFound(id))
    }

    fn read_back(&self, id: CalculationId, details: &'static str) -> ServiceResult<Calculation> {
        self.calculations
            .get_calculation(id)?
            .ok_or(ServiceError::InconsistentState(details))
    }

    fn ensure_registered(&self, id: PrincipalId) -> ServiceResult<()> {
        match self.principals.get_principal(id)? {
            Some(_) => Ok(()),
            None => Err(ServiceError::OwnerNotFound(id)),
        }
    }
}

fn parse_date_filter(name: &str, raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, DATE_FILTER_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            debug!("event=calculation_list module=service status=filter_ignored filter={name}");
            None
        }
    }
}

fn start_of_day_ms(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|start| start.and_utc().timestamp_millis())
        .unwrap_or(i64::MIN)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
