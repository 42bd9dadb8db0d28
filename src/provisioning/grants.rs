//! Access-level resolution for grant change lists.

use std::fmt;

use crate::access::AccessMapper;
use crate::remote::PermissionChange;

/// Kind of principal receiving a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalKind {
    Group,
    User,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::Group => "group",
            PrincipalKind::User => "user",
        }
    }
}

/// A principal whose access level is not in the access map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidGrant {
    pub kind: PrincipalKind,
    pub principal: String,
    pub access: String,
}

impl InvalidGrant {
    /// Log the skipped grant at WARN
    pub fn log(&self) {
        tracing::warn!(
            event = "invalid_access_level",
            principal_kind = self.kind.as_str(),
            principal = %self.principal,
            access = %self.access,
            "Invalid access level"
        );
    }
}

impl fmt::Display for InvalidGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid access level {} for {} {}",
            self.access,
            self.kind.as_str(),
            self.principal
        )
    }
}

/// Resolve `access` for `principal` into a change entry
pub fn resolve_grant<M: AccessMapper + ?Sized>(
    mapper: &M,
    kind: PrincipalKind,
    principal: &str,
    access: &str,
) -> Result<PermissionChange, InvalidGrant> {
    let permissions = mapper.resolve(access);
    if permissions.is_empty() {
        return Err(InvalidGrant {
            kind,
            principal: principal.to_string(),
            access: access.to_string(),
        });
    }
    Ok(PermissionChange {
        add: permissions.to_vec(),
        principal: principal.to_string(),
    })
}
