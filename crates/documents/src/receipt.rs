//! Loan receipt PDF.

use printpdf::{BuiltinFont, Mm, PdfDocument};

use shelfwise_catalog::text::strip_accents;
use shelfwise_core::LoanId;
use shelfwise_loans::Loan;

use crate::error::DocumentError;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN_LEFT: Mm = Mm(25.0);
const LINE_HEIGHT: f32 = 9.0;

pub fn receipt_file_name(loan_id: LoanId) -> String {
    format!("receipt_{loan_id}.pdf")
}

/// The lines printed on a receipt, top to bottom.
pub(crate) fn receipt_lines(loan: &Loan) -> Vec<String> {
    let date = |d: chrono::DateTime<chrono::Utc>| d.format("%d/%m/%Y").to_string();
    let borrower = loan.borrower();
    vec![
        format!("Loan ID: {}", loan.id_typed()),
        format!("Loan date: {}", date(loan.checked_out_at())),
        format!(
            "Returned: {}",
            loan.returned_at().map_or_else(|| "Not returned".to_string(), date)
        ),
        format!("Due date: {}", date(loan.due_at())),
        format!("Book: {}", loan.item_title()),
        format!("Author: {}", loan.item_author()),
        format!("Borrower: {}", borrower.full_name()),
        format!("Grade: {}", borrower.grade),
    ]
}

fn pdf_err(e: impl core::fmt::Display) -> DocumentError {
    DocumentError::Pdf(e.to_string())
}

/// Render the receipt for `loan` as a single A4 page.
pub fn render_receipt(loan: &Loan) -> Result<Vec<u8>, DocumentError> {
    let (doc, page, layer) = PdfDocument::new("Loan receipt", PAGE_WIDTH, PAGE_HEIGHT, "receipt");
    let heading = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;
    let body = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let canvas = doc.get_page(page).get_layer(layer);

    let mut y = PAGE_HEIGHT.0 - 30.0;
    canvas.use_text("Loan receipt", 18.0, MARGIN_LEFT, Mm(y), &heading);
    y -= LINE_HEIGHT * 2.0;

    // Builtin fonts are not embedded and only cover a Latin-1 subset.
    for line in receipt_lines(loan) {
        canvas.use_text(strip_accents(&line), 12.0, MARGIN_LEFT, Mm(y), &body);
        y -= LINE_HEIGHT;
    }

    doc.save_to_bytes().map_err(pdf_err)
}
