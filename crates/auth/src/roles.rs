use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use shelfwise_core::{DomainError, DomainResult};

/// Role identifier carried in tokens and stored on staff accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Full access, including user administration.
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    /// Teacher: lends and receives books, reads the catalog and reports.
    pub const TEACHER: Role = Role(Cow::Borrowed("docente"));
    /// Student: browses the catalog.
    pub const STUDENT: Role = Role(Cow::Borrowed("alumno"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a role name, accepting only roles the service knows about.
    pub fn parse(input: &str) -> DomainResult<Self> {
        match input.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::ADMIN),
            "docente" | "teacher" => Ok(Self::TEACHER),
            "alumno" | "student" => Ok(Self::STUDENT),
            other => Err(DomainError::validation(format!("unknown role: {other}"))),
        }
    }

    /// Roles an administrator may hand out through the staff directory.
    pub fn is_assignable(&self) -> bool {
        *self == Self::TEACHER || *self == Self::STUDENT
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
