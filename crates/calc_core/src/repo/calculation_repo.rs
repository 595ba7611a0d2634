//! Calculation repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/update/get/list/count/delete APIs over `calculations`.
//! - Translate resolved list queries (scope, filters, ordering) into SQL.
//!
//! # Invariants
//! - Write paths call `CalculationDraft::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - List order always ends with `id` so equal sort keys stay deterministic.

use crate::db::DbError;
use crate::model::calculation::{
    Calculation, CalculationDraft, CalculationId, CalculationValidationError, Operation,
};
use crate::model::principal::PrincipalId;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const CALCULATION_SELECT_SQL: &str = "SELECT
    c.id,
    c.owner_id,
    p.display_name AS owner_name,
    c.operand1,
    c.operand2,
    c.operation,
    c.result,
    c.expression,
    c.created_at
FROM calculations c
JOIN principals p ON p.id = c.owner_id";

// Quoted phrases stay one term; everything else splits on whitespace.
static SEARCH_TERM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]*)"|(\S+)"#).expect("valid search term regex"));

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for principal and calculation persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(CalculationValidationError),
    Db(DbError),
    NotFound(CalculationId),
    PrincipalNotFound(PrincipalId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "calculation not found: {id}"),
            Self::PrincipalNotFound(id) => write!(f, "principal not found: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted calculation data: {message}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::PrincipalNotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<CalculationValidationError> for RepoError {
    fn from(value: CalculationValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Sortable calculation fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    Result,
    Operand1,
    Operand2,
    /// Owner display name.
    Username,
}

impl SortField {
    /// Parses a public ordering field name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "created_at" => Some(Self::CreatedAt),
            "result" => Some(Self::Result),
            "operand1" => Some(Self::Operand1),
            "operand2" => Some(Self::Operand2),
            "username" => Some(Self::Username),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "c.created_at",
            Self::Result => "c.result",
            Self::Operand1 => "c.operand1",
            Self::Operand2 => "c.operand2",
            Self::Username => "p.display_name COLLATE NOCASE",
        }
    }
}

/// Ordering for list queries. Defaults to `created_at` descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculationOrder {
    pub field: SortField,
    pub descending: bool,
}

impl Default for CalculationOrder {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

impl CalculationOrder {
    /// Parses `field` or `-field`. Unknown fields yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (name, descending) = match raw.strip_prefix('-') {
            Some(name) => (name, true),
            None => (raw, false),
        };
        SortField::from_name(name).map(|field| Self { field, descending })
    }

    fn to_sql(self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        match self.field {
            SortField::CreatedAt => format!("c.created_at {direction}, c.id {direction}"),
            other => format!("{} {direction}, c.created_at DESC, c.id DESC", other.column()),
        }
    }
}

/// Resolved query options for listing calculations.
///
/// Scope fields (`owner`, `owner_name_contains`) are already policy-checked
/// by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculationListQuery {
    /// Exact owner scope. `None` lists every owner.
    pub owner: Option<PrincipalId>,
    /// Case-insensitive substring over the owner display name.
    pub owner_name_contains: Option<String>,
    pub operation: Option<Operation>,
    /// Inclusive lower bound, epoch milliseconds.
    pub created_from_ms: Option<i64>,
    /// Exclusive upper bound, epoch milliseconds.
    pub created_before_ms: Option<i64>,
    /// Free-text terms; every term must match one searchable field.
    pub search: Option<String>,
    /// Includes the owner display name in the searchable fields.
    pub search_owner_name: bool,
    pub order: CalculationOrder,
    pub limit: Option<u32>,
}

/// Repository interface for calculation persistence.
pub trait CalculationRepository {
    /// Inserts a draft and returns the store-assigned id.
    fn insert_calculation(
        &self,
        draft: &CalculationDraft,
        created_at_ms: i64,
    ) -> RepoResult<CalculationId>;
    /// Replaces owner, operands and derived fields. `created_at` is kept.
    fn update_calculation(&self, id: CalculationId, draft: &CalculationDraft) -> RepoResult<()>;
    fn get_calculation(&self, id: CalculationId) -> RepoResult<Option<Calculation>>;
    fn list_calculations(&self, query: &CalculationListQuery) -> RepoResult<Vec<Calculation>>;
    /// Counts calculations for one owner, or all when `owner` is `None`.
    fn count_calculations(&self, owner: Option<PrincipalId>) -> RepoResult<u64>;
    fn delete_calculation(&self, id: CalculationId) -> RepoResult<()>;
    /// Deletes calculations for one owner, or all when `owner` is `None`.
    fn delete_calculations(&self, owner: Option<PrincipalId>) -> RepoResult<u64>;
}

/// SQLite-backed calculation repository.
pub struct SqliteCalculationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCalculationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CalculationRepository for SqliteCalculationRepository<'_> {
    fn insert_calculation(
        &self,
        draft: &CalculationDraft,
        created_at_ms: i64,
    ) -> RepoResult<CalculationId> {
        draft.validate()?;

        self.conn.execute(
            "INSERT INTO calculations (
                owner_id,
                operand1,
                operand2,
                operation,
                result,
                expression,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                draft.owner.to_string(),
                draft.operand1,
                draft.operand2,
                draft.operation.code(),
                draft.result,
                draft.expression.as_str(),
                created_at_ms,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_calculation(&self, id: CalculationId, draft: &CalculationDraft) -> RepoResult<()> {
        draft.validate()?;

        let changed = self.conn.execute(
            "UPDATE calculations
             SET
                owner_id = ?1,
                operand1 = ?2,
                operand2 = ?3,
                operation = ?4,
                result = ?5,
                expression = ?6
             WHERE id = ?7;",
            params![
                draft.owner.to_string(),
                draft.operand1,
                draft.operand2,
                draft.operation.code(),
                draft.result,
                draft.expression.as_str(),
                id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn get_calculation(&self, id: CalculationId) -> RepoResult<Option<Calculation>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CALCULATION_SELECT_SQL} WHERE c.id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_calculation_row(row)?));
        }

        Ok(None)
    }

    fn list_calculations(&self, query: &CalculationListQuery) -> RepoResult<Vec<Calculation>> {
        let mut sql = format!("{CALCULATION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(owner) = query.owner {
            sql.push_str(" AND c.owner_id = ?");
            bind_values.push(Value::Text(owner.to_string()));
        }

        if let Some(name) = non_empty(query.owner_name_contains.as_deref()) {
            sql.push_str(" AND p.display_name LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(like_pattern(name)));
        }

        if let Some(operation) = query.operation {
            sql.push_str(" AND c.operation = ?");
            bind_values.push(Value::Text(operation.code().to_string()));
        }

        if let Some(from) = query.created_from_ms {
            sql.push_str(" AND c.created_at >= ?");
            bind_values.push(Value::Integer(from));
        }

        if let Some(before) = query.created_before_ms {
            sql.push_str(" AND c.created_at < ?");
            bind_values.push(Value::Integer(before));
        }

        if let Some(search) = non_empty(query.search.as_deref()) {
            for term in search_terms(search) {
                let pattern = like_pattern(&term);
                sql.push_str(
                    " AND (c.expression LIKE ? ESCAPE '\\' OR c.operation LIKE ? ESCAPE '\\'",
                );
                bind_values.push(Value::Text(pattern.clone()));
                bind_values.push(Value::Text(pattern.clone()));
                if query.search_owner_name {
                    sql.push_str(" OR p.display_name LIKE ? ESCAPE '\\'");
                    bind_values.push(Value::Text(pattern));
                }
                sql.push(')');
            }
        }

        sql.push_str(" ORDER BY ");
        sql.push_str(&query.order.to_sql());

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut calculations = Vec::new();

        while let Some(row) = rows.next()? {
            calculations.push(parse_calculation_row(row)?);
        }

        Ok(calculations)
    }

    fn count_calculations(&self, owner: Option<PrincipalId>) -> RepoResult<u64> {
        let count: i64 = match owner {
            Some(owner) => self.conn.query_row(
                "SELECT COUNT(*) FROM calculations WHERE owner_id = ?1;",
                [owner.to_string()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM calculations;", [], |row| row.get(0))?,
        };

        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative calculation count {count}")))
    }

    fn delete_calculation(&self, id: CalculationId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM calculations WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn delete_calculations(&self, owner: Option<PrincipalId>) -> RepoResult<u64> {
        let deleted = match owner {
            Some(owner) => self.conn.execute(
                "DELETE FROM calculations WHERE owner_id = ?1;",
                [owner.to_string()],
            )?,
            None => self.conn.execute("DELETE FROM calculations;", [])?,
        };

        Ok(deleted as u64)
    }
}

fn parse_calculation_row(row: &Row<'_>) -> RepoResult<Calculation> {
    let owner_text: String = row.get("owner_id")?;
    let owner = Uuid::parse_str(&owner_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{owner_text}` in calculations.owner_id"
        ))
    })?;

    let operation_text: String = row.get("operation")?;
    let operation = Operation::from_code(&operation_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid operation `{operation_text}` in calculations.operation"
        ))
    })?;

    let calculation = Calculation {
        id: row.get("id")?,
        owner,
        owner_name: row.get("owner_name")?,
        operand1: row.get("operand1")?,
        operand2: row.get("operand2")?,
        operation,
        result: row.get("result")?,
        expression: row.get("expression")?,
        created_at: row.get("created_at")?,
    };
    calculation.validate()?;
    Ok(calculation)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn search_terms(search: &str) -> Vec<String> {
    SEARCH_TERM_RE
        .captures_iter(search)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|term| term.as_str().trim().to_string())
        .filter(|term| !term.is_empty())
        .collect()
}

fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::{like_pattern, search_terms, CalculationOrder, SortField};

    #[test]
    fn order_parses_direction_prefix() {
        assert_eq!(
            CalculationOrder::parse("-result"),
            Some(CalculationOrder {
                field: SortField::Result,
                descending: true,
            })
        );
        assert_eq!(
            CalculationOrder::parse("operand2"),
            Some(CalculationOrder {
                field: SortField::Operand2,
                descending: false,
            })
        );
        assert_eq!(CalculationOrder::parse("-owner_id"), None);
        assert_eq!(CalculationOrder::default().field, SortField::CreatedAt);
        assert!(CalculationOrder::default().descending);
    }

    #[test]
    fn search_terms_keep_quoted_phrases_together() {
        assert_eq!(
            search_terms(r#"  sqrt "2 ^ 10"  add "#),
            vec!["sqrt".to_string(), "2 ^ 10".to_string(), "add".to_string()]
        );
        assert!(search_terms(r#"  "" "#).is_empty());
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_x"), r"%50\%\_x%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }
}
