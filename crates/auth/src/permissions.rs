use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier (e.g. "catalog.read").
///
/// The wildcard `"*"` grants everything and is reserved for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const ALL: Permission = Permission(Cow::Borrowed("*"));
    pub const CATALOG_READ: Permission = Permission(Cow::Borrowed("catalog.read"));
    pub const CATALOG_WRITE: Permission = Permission(Cow::Borrowed("catalog.write"));
    pub const LOANS_READ: Permission = Permission(Cow::Borrowed("loans.read"));
    pub const LOANS_WRITE: Permission = Permission(Cow::Borrowed("loans.write"));
    /// The due-date ordered list of every open loan.
    pub const LOANS_READ_ALL: Permission = Permission(Cow::Borrowed("loans.read_all"));
    pub const REPORTS_READ: Permission = Permission(Cow::Borrowed("reports.read"));
    pub const ADMIN_USERS: Permission = Permission(Cow::Borrowed("admin.users"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role -> permission policy. Unknown roles grant nothing.
pub fn role_permissions(role: &Role) -> Vec<Permission> {
    match role.as_str() {
        "admin" => vec![Permission::ALL],
        "docente" => vec![
            Permission::CATALOG_READ,
            Permission::LOANS_READ,
            Permission::LOANS_WRITE,
            Permission::REPORTS_READ,
        ],
        "alumno" => vec![Permission::CATALOG_READ],
        _ => Vec::new(),
    }
}
