//! Infrastructure for the library service: persistence, application
//! services, receipt archiving, configuration and startup seeding.
//!
//! Domain crates stay free of IO; everything here composes them behind the
//! store traits in [`store`].

pub mod config;
pub mod receipts;
pub mod seed;
pub mod services;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AppConfig, ConfigError};
pub use receipts::{FileReceiptArchive, InMemoryReceiptArchive, ReceiptArchive, ReceiptArchiveError};
pub use services::{
    ActiveLoans, CatalogListView, CatalogService, DeletionOutcome, ImportOutcome, LoanLedger,
    LoanView, ReportAggregator, ServiceError, ServiceResult, StaffDirectory,
};
pub use store::{
    CatalogRepository, InMemoryLibraryStore, LedgerWrites, LibraryStore, LoanRepository,
    PostgresLibraryStore, StoreError, StoreResult, UserDirectory,
};
