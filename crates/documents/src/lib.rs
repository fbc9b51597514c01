//! Spreadsheet and PDF rendering for the library service.
//!
//! Everything here works on in-memory byte buffers; persisting or serving the
//! bytes is the caller's job.

pub mod error;
pub mod export;
pub mod import;
pub mod receipt;

pub use error::{DocumentError, ImportError};
pub use export::{catalog_workbook, import_template, summary_workbook};
pub use import::{COLUMNS, Cell, parse_row, read_workbook};
pub use receipt::{receipt_file_name, render_receipt};
