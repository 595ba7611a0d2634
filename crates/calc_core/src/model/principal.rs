//! Acting principal supplied by the outer authentication layer.
//!
//! The core never authenticates. Anonymous callers are modelled as the
//! absence of a principal (`Option<&Principal>::None`).

use uuid::Uuid;

/// Opaque principal identity.
pub type PrincipalId = Uuid;

/// Authenticated identity acting on a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    /// Rendered as `username` in calculation views.
    pub display_name: String,
    /// Grants cross-owner read/write and global clear.
    pub is_staff: bool,
}

impl Principal {
    /// Creates a regular (non-staff) principal with a generated id.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            is_staff: false,
        }
    }

    /// Creates a staff principal with a generated id.
    pub fn staff(display_name: impl Into<String>) -> Self {
        Self {
            is_staff: true,
            ..Self::new(display_name)
        }
    }

    /// Returns whether this principal owns a record with `owner`.
    pub fn owns(&self, owner: PrincipalId) -> bool {
        self.id == owner
    }
}
