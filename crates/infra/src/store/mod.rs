//! Persistence boundary.
//!
//! Catalog items, loans and staff accounts share one store so that the writes
//! of a checkout or a return (item + loan) commit as a single unit. Every
//! versioned write takes an [`ExpectedVersion`]; a mismatch is reported as
//! [`StoreError::Concurrency`] and nothing is written.

use async_trait::async_trait;
use thiserror::Error;

use shelfwise_auth::StaffAccount;
use shelfwise_catalog::CatalogItem;
use shelfwise_core::{CatalogItemId, ExpectedVersion, LoanId, UserId};
use shelfwise_loans::{Loan, LoanStatusFilter};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryLibraryStore;
pub use postgres::PostgresLibraryStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// The stored version did not match the expected one.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    /// The write is blocked by related rows (e.g. open loans on an item).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_item(&self, id: CatalogItemId) -> StoreResult<Option<CatalogItem>>;

    /// All records, ordered by title.
    async fn list_items(&self) -> StoreResult<Vec<CatalogItem>>;

    async fn count_items(&self) -> StoreResult<usize>;

    async fn insert_item(&self, item: &CatalogItem) -> StoreResult<()>;

    /// Insert a batch; either every item is stored or none is.
    async fn insert_items(&self, items: &[CatalogItem]) -> StoreResult<()>;

    async fn update_item(&self, item: &CatalogItem, expected: ExpectedVersion) -> StoreResult<()>;

    /// Remove a record. Fails with [`StoreError::Conflict`] while any open
    /// loan references it; the check and the delete are one unit.
    async fn remove_item(&self, id: CatalogItemId, expected: ExpectedVersion) -> StoreResult<()>;
}

#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn get_loan(&self, id: LoanId) -> StoreResult<Option<Loan>>;

    /// Loans matching `filter`, most recent checkout first.
    async fn list_loans(&self, filter: LoanStatusFilter) -> StoreResult<Vec<Loan>>;

    async fn list_loans_for_borrower(
        &self,
        borrower_id: UserId,
        filter: LoanStatusFilter,
    ) -> StoreResult<Vec<Loan>>;

    async fn count_open_loans(&self, item_id: CatalogItemId) -> StoreResult<usize>;
}

/// Writes that touch both an item and a loan.
#[async_trait]
pub trait LedgerWrites: Send + Sync {
    /// Store the decremented item and insert the new loan as one unit.
    async fn commit_checkout(
        &self,
        item: &CatalogItem,
        expected_item: ExpectedVersion,
        loan: &Loan,
    ) -> StoreResult<()>;

    /// Store the closed loan and, when the record still exists, the
    /// incremented item as one unit.
    async fn commit_return(
        &self,
        loan: &Loan,
        expected_loan: ExpectedVersion,
        item: Option<(&CatalogItem, ExpectedVersion)>,
    ) -> StoreResult<()>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_account(&self, id: UserId) -> StoreResult<Option<StaffAccount>>;

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<StaffAccount>>;

    /// All accounts, ordered by email.
    async fn list_accounts(&self) -> StoreResult<Vec<StaffAccount>>;

    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert_account(&self, account: &StaffAccount) -> StoreResult<()>;

    async fn update_account(
        &self,
        account: &StaffAccount,
        expected: ExpectedVersion,
    ) -> StoreResult<()>;
}

/// Everything the services need from persistence.
pub trait LibraryStore: CatalogRepository + LoanRepository + LedgerWrites + UserDirectory {}

impl<T> LibraryStore for T where T: CatalogRepository + LoanRepository + LedgerWrites + UserDirectory {}

pub(crate) fn check_version(
    what: &str,
    expected: ExpectedVersion,
    actual: u64,
) -> StoreResult<()> {
    if expected.matches(actual) {
        Ok(())
    } else {
        Err(StoreError::Concurrency(format!(
            "{what} changed since it was read (expected: {expected:?}, actual: {actual})"
        )))
    }
}
