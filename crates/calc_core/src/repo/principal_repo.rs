//! Principal repository: the ownership anchor for calculations.
//!
//! # Invariants
//! - Deleting a principal cascades to its calculations (`ON DELETE CASCADE`).
//! - Upserts refresh `display_name` and `is_staff` but never the id.

use crate::model::principal::{Principal, PrincipalId};
use crate::repo::calculation_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Repository interface for registered principals.
pub trait PrincipalRepository {
    fn upsert_principal(&self, principal: &Principal) -> RepoResult<()>;
    fn get_principal(&self, id: PrincipalId) -> RepoResult<Option<Principal>>;
    /// Removes a principal and, through the foreign key, its calculations.
    fn delete_principal(&self, id: PrincipalId) -> RepoResult<()>;
}

/// SQLite-backed principal repository.
pub struct SqlitePrincipalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePrincipalRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PrincipalRepository for SqlitePrincipalRepository<'_> {
    fn upsert_principal(&self, principal: &Principal) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO principals (id, display_name, is_staff)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                is_staff = excluded.is_staff;",
            params![
                principal.id.to_string(),
                principal.display_name.as_str(),
                principal.is_staff,
            ],
        )?;
        Ok(())
    }

    fn get_principal(&self, id: PrincipalId) -> RepoResult<Option<Principal>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, display_name, is_staff FROM principals WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let id_text: String = row.get("id")?;
        let id = Uuid::parse_str(&id_text).map_err(|_| {
            RepoError::InvalidData(format!("invalid uuid value `{id_text}` in principals.id"))
        })?;

        Ok(Some(Principal {
            id,
            display_name: row.get("display_name")?,
            is_staff: row.get("is_staff")?,
        }))
    }

    fn delete_principal(&self, id: PrincipalId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM principals WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::PrincipalNotFound(id));
        }

        Ok(())
    }
}
