//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure a caller of the catalog, the loan ledger or the staff directory
/// can observe maps onto one of these kinds. Infrastructure failures are wrapped
/// by the layers above.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input failed validation (missing field, out of range, bad format).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced item, loan or account does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The item has no copies on hand.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The loan was already closed.
    #[error("loan {0} was already returned")]
    AlreadyReturned(String),

    /// The operation is blocked by related records (e.g. open loans).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The record changed since it was read.
    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Authorization failure at the domain boundary.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn already_returned(loan: impl core::fmt::Display) -> Self {
        Self::AlreadyReturned(loan.to_string())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn concurrent_modification(msg: impl Into<String>) -> Self {
        Self::ConcurrentModification(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Stable machine-readable code, used by the HTTP layer and in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
            Self::AlreadyReturned(_) => "already_returned",
            Self::Conflict(_) => "conflict",
            Self::ConcurrentModification(_) => "concurrent_modification",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::InvalidId(_) => "invalid_id",
            Self::Unauthorized => "unauthorized",
        }
    }
}
