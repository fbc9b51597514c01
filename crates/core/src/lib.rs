//! `shelfwise-core`: shared domain building blocks for the library service.
//!
//! Pure types only: identifiers, the domain error model, optimistic versioning
//! and the clock abstraction. No IO lives here.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod id;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{CatalogItemId, LoanId, UserId};
