//! Loan ledger domain module.
//!
//! Loans are opened against a catalog item and closed exactly once. Opening
//! and closing go through the catalog reconciler so the item's on-hand
//! quantity moves in the same step. Pure domain logic.

pub mod borrower;
pub mod loan;
pub mod status;

pub use borrower::BorrowerInfo;
pub use loan::{Loan, LoanPolicy, LoanSnapshot, checkout, return_loan};
pub use status::LoanStatusFilter;
