//! Access policy table for calculation actions.
//!
//! | action                    | anonymous | owner      | staff        |
//! |---------------------------|-----------|------------|--------------|
//! | create                    | deny      | allow      | allow        |
//! | get/update/delete own     | deny      | allow      | allow        |
//! | get/update/delete others' | deny      | deny       | allow        |
//! | list own / clear own      | deny      | allow      | allow        |
//! | list all / clear all      | deny      | deny       | allow        |
//! | statistics                | deny      | self scope | global scope |

use crate::model::principal::{Principal, PrincipalId};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Action being authorized. Record actions carry the record owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRequest {
    Create,
    Read { owner: PrincipalId },
    Update { owner: PrincipalId },
    Delete { owner: PrincipalId },
    ListOwn,
    ListAll,
    ClearOwn,
    ClearAll,
    Statistics,
}

impl AccessRequest {
    /// Stable action name used in log events.
    pub fn action_name(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read { .. } => "read",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::ListOwn => "list_own",
            Self::ListAll => "list_all",
            Self::ClearOwn => "clear_own",
            Self::ClearAll => "clear_all",
            Self::Statistics => "statistics",
        }
    }
}

/// Record scope granted by a successful authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Restricted to records owned by this principal.
    Owner(PrincipalId),
    /// Unrestricted (staff only).
    Global,
}

impl Scope {
    /// Owner filter to apply to store queries.
    pub fn owner_filter(self) -> Option<PrincipalId> {
        match self {
            Self::Owner(id) => Some(id),
            Self::Global => None,
        }
    }

    /// Stable scope name used in log events.
    pub fn label(self) -> &'static str {
        match self {
            Self::Owner(_) => "owner",
            Self::Global => "global",
        }
    }
}

/// Authorization denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// No principal was supplied where one is required.
    Unauthorized,
    /// The principal may not perform this action on this target.
    Forbidden,
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "authentication required"),
            Self::Forbidden => write!(f, "permission denied"),
        }
    }
}

impl Error for AccessError {}

/// Decides whether `principal` may perform `request`.
pub fn authorize(
    principal: Option<&Principal>,
    request: AccessRequest,
) -> Result<Scope, AccessError> {
    let decision = decide(principal, request);
    if let Err(err) = decision {
        debug!(
            "event=access_denied module=policy status=denied action={} reason={err}",
            request.action_name()
        );
    }
    decision
}

fn decide(principal: Option<&Principal>, request: AccessRequest) -> Result<Scope, AccessError> {
    let principal = principal.ok_or(AccessError::Unauthorized)?;

    match request {
        AccessRequest::Create | AccessRequest::ListOwn | AccessRequest::ClearOwn => {
            Ok(Scope::Owner(principal.id))
        }
        AccessRequest::Read { owner }
        | AccessRequest::Update { owner }
        | AccessRequest::Delete { owner } => {
            if principal.owns(owner) {
                Ok(Scope::Owner(owner))
            } else if principal.is_staff {
                Ok(Scope::Global)
            } else {
                Err(AccessError::Forbidden)
            }
        }
        AccessRequest::ListAll | AccessRequest::ClearAll => {
            if principal.is_staff {
                Ok(Scope::Global)
            } else {
                Err(AccessError::Forbidden)
            }
        }
        AccessRequest::Statistics => Ok(if principal.is_staff {
            Scope::Global
        } else {
            Scope::Owner(principal.id)
        }),
    }
}

/// Returns the principal or `Unauthorized`.
pub fn require_principal(principal: Option<&Principal>) -> Result<&Principal, AccessError> {
    principal.ok_or(AccessError::Unauthorized)
}
