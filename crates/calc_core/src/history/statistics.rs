//! Owned history aggregation (statistics and recent-N).
//!
//! # Invariants
//! - Staff see global totals; everyone else sees their own.
//! - `recent` is newest first (`created_at DESC, id DESC`).

use crate::model::calculation::Calculation;
use crate::model::principal::Principal;
use crate::policy::access::{authorize, AccessRequest, Scope};
use crate::repo::calculation_repo::{CalculationListQuery, CalculationRepository};
use crate::service::error::ServiceResult;
use log::debug;

/// Number of records returned in `Statistics::recent`.
pub const RECENT_LIMIT: u32 = 5;

/// Scoped statistics snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub total_count: u64,
    pub recent: Vec<Calculation>,
    pub scope: Scope,
}

/// Read-only history service over a calculation repository.
pub struct HistoryService<R: CalculationRepository> {
    repo: R,
}

impl<R: CalculationRepository> HistoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns total count plus the five most recent calculations in scope.
    pub fn statistics(&self, principal: Option<&Principal>) -> ServiceResult<Statistics> {
        let scope = authorize(principal, AccessRequest::Statistics)?;
        let total_count = self.repo.count_calculations(scope.owner_filter())?;
        let recent = self.recent_in_scope(scope, RECENT_LIMIT)?;

        debug!(
            "event=history_statistics module=history status=ok scope={} total={total_count}",
            scope.label()
        );
        Ok(Statistics {
            total_count,
            recent,
            scope,
        })
    }

    /// Returns up to `limit` newest calculations in the caller's scope.
    pub fn recent(
        &self,
        principal: Option<&Principal>,
        limit: u32,
    ) -> ServiceResult<Vec<Calculation>> {
        let scope = authorize(principal, AccessRequest::Statistics)?;
        self.recent_in_scope(scope, limit)
    }

    fn recent_in_scope(&self, scope: Scope, limit: u32) -> ServiceResult<Vec<Calculation>> {
        let query = CalculationListQuery {
            owner: scope.owner_filter(),
            limit: Some(limit),
            ..CalculationListQuery::default()
        };
        Ok(self.repo.list_calculations(&query)?)
    }
}
