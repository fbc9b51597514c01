use thiserror::Error;

/// Failure while reading an uploaded catalog spreadsheet.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("could not read workbook: {0}")]
    Unreadable(String),

    #[error("the workbook has no worksheets")]
    NoWorksheet,

    #[error("the worksheet is empty or has no data rows")]
    Empty,

    /// `row` is the 1-based spreadsheet row number, as shown by spreadsheet apps.
    #[error("error in row {row}: {message}")]
    Row { row: u32, message: String },
}

impl ImportError {
    pub fn row(row: u32, message: impl Into<String>) -> Self {
        Self::Row {
            row,
            message: message.into(),
        }
    }
}

/// Failure while producing a spreadsheet or PDF.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("spreadsheet rendering failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("pdf rendering failed: {0}")]
    Pdf(String),
}
