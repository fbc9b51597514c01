//! Application services: the use cases behind the HTTP routes.
//!
//! Each service loads records from the [`LibraryStore`](crate::store::LibraryStore),
//! runs the pure domain operation, and writes the result back with the version
//! it read. Services never hold a lock across an await.

use thiserror::Error;

use shelfwise_core::DomainError;
use shelfwise_documents::{DocumentError, ImportError};

use crate::store::StoreError;

pub mod catalog;
pub mod ledger;
pub mod reports;
pub mod staff;

pub use catalog::{CatalogListView, CatalogService, DeletionOutcome, ImportOutcome};
pub use ledger::{ActiveLoans, LoanLedger, LoanView};
pub use reports::ReportAggregator;
pub use staff::StaffDirectory;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => Self::Domain(DomainError::not_found(what)),
            StoreError::Concurrency(msg) => Self::Domain(DomainError::concurrent_modification(msg)),
            StoreError::Conflict(msg) | StoreError::Duplicate(msg) => {
                Self::Domain(DomainError::conflict(msg))
            }
            StoreError::Backend(msg) => Self::Storage(msg),
        }
    }
}

impl ServiceError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::Import(_) => "import_failed",
            Self::Document(_) => "document_failed",
            Self::Storage(_) => "storage_failure",
        }
    }
}
