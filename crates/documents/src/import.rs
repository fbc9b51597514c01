//! Catalog spreadsheet import.
//!
//! First worksheet only. Row 1 is the header; every following non-blank row
//! becomes one [`CatalogItemDraft`]. Parsing stops at the first malformed row
//! and reports its spreadsheet row number.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx, XlsxError, open_workbook_from_rs};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use shelfwise_catalog::CatalogItemDraft;
use shelfwise_catalog::text::split_list;

use crate::error::ImportError;

/// Fixed column order of the import sheet (and of catalog exports).
pub const COLUMNS: [&str; 16] = [
    "Catalog number",
    "Title",
    "Author",
    "Publisher",
    "Edition year",
    "Subjects",
    "Sub-subject",
    "Support type",
    "Support subtype",
    "Quantity",
    "Provenance",
    "Location",
    "Grades",
    "Rooms",
    "Intake date",
    "Retirement date",
];

/// A spreadsheet cell, decoupled from the reader library.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) if s.trim().is_empty() => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::DateTime(dt) => {
                excel_serial_to_utc(dt.as_f64()).map_or(Cell::Number(dt.as_f64()), Cell::Date)
            }
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Read every data row of the first worksheet.
///
/// Returns `(row_number, draft)` pairs so later validation failures can still
/// name the offending row.
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<(u32, CatalogItemDraft)>, ImportError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e: XlsxError| ImportError::Unreadable(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::NoWorksheet)?
        .map_err(|e| ImportError::Unreadable(e.to_string()))?;

    let first_row = range.start().map_or(0, |(row, _)| row);
    let mut drafts = Vec::new();

    // The header is the first used row; data rows follow.
    for (offset, row) in range.rows().enumerate().skip(1) {
        let cells: Vec<Cell> = row.iter().map(Cell::from).collect();
        if cells.iter().all(|c| *c == Cell::Empty) {
            continue;
        }
        let row_number = first_row + offset as u32 + 1;
        drafts.push((row_number, parse_row(row_number, &cells)?));
    }

    if drafts.is_empty() {
        return Err(ImportError::Empty);
    }
    tracing::debug!(rows = drafts.len(), "parsed catalog spreadsheet");
    Ok(drafts)
}

/// Turn one row of cells into a draft. Field-level catalog rules (required
/// title, quantity range, ...) are checked later when the item is created.
pub fn parse_row(row: u32, cells: &[Cell]) -> Result<CatalogItemDraft, ImportError> {
    let at = |i: usize| cells.get(i).unwrap_or(&Cell::Empty);
    let err = |column: usize, what: &str| ImportError::row(row, format!("{}: {what}", COLUMNS[column]));

    let text = |i: usize| -> String {
        match at(i) {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::Date(d) => d.date_naive().to_string(),
        }
    };
    let optional_text = |i: usize| Some(text(i)).filter(|s| !s.is_empty());

    let edition_year = match at(4) {
        Cell::Empty => None,
        cell => Some(
            whole_number(cell)
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| err(4, "expected a whole number"))?,
        ),
    };

    let quantity = match at(9) {
        Cell::Empty => return Err(err(9, "is required")),
        cell => whole_number(cell).ok_or_else(|| err(9, "expected a whole number"))?,
    };

    let intake_date = date(at(14)).map_err(|m| err(14, &m))?;
    let retirement_date = date(at(15)).map_err(|m| err(15, &m))?;

    let draft = CatalogItemDraft {
        catalog_number: text(0),
        title: text(1),
        author: text(2),
        publisher: text(3),
        edition_year,
        quantity,
        subjects: split_list(&text(5)),
        sub_subject: optional_text(6),
        support_type: optional_text(7),
        support_subtype: optional_text(8),
        provenance: text(10),
        location: text(11),
        grades: split_list(&text(12)),
        rooms: split_list(&text(13)),
        intake_date,
        retirement_date,
    };
    Ok(draft.with_accents_stripped())
}

fn whole_number(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
        Cell::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn date(cell: &Cell) -> Result<Option<DateTime<Utc>>, String> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Date(d) => Ok(Some(*d)),
        Cell::Number(serial) => excel_serial_to_utc(*serial)
            .map(Some)
            .ok_or_else(|| "not a valid date".to_string()),
        Cell::Text(s) => parse_date_text(s.trim())
            .map(Some)
            .ok_or_else(|| format!("unrecognized date '{s}' (use DD/MM/YYYY or YYYY-MM-DD)")),
    }
}

fn parse_date_text(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Spreadsheet serial dates count days from 1899-12-30.
pub(crate) fn excel_serial_to_utc(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch
        .checked_add_signed(Duration::milliseconds(millis))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn valid_row() -> Vec<Cell> {
        vec![
            t("A-100"),
            t("Cuentos de la selva"),
            t("Horacio Quiroga"),
            t("Losada"),
            Cell::Number(1918.0),
            t("Literatura, Ciencias-Naturales"),
            Cell::Empty,
            t("Libro"),
            Cell::Empty,
            Cell::Number(4.0),
            t("Ministerio de Educación"),
            t("Aula"),
            t("4°, 5°"),
            t("Moreno"),
            t("01/03/2024"),
            Cell::Empty,
        ]
    }

    #[test]
    fn parses_a_complete_row() {
        let d = parse_row(2, &valid_row()).unwrap();
        assert_eq!(d.catalog_number, "A-100");
        assert_eq!(d.edition_year, Some(1918));
        assert_eq!(d.quantity, 4);
        assert_eq!(d.subjects, vec!["Literatura", "Ciencias-Naturales"]);
        assert_eq!(d.grades, vec!["4°", "5°"]);
        assert_eq!(d.rooms, vec!["Moreno"]);
        assert_eq!(
            d.intake_date.map(|d| d.date_naive()),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(d.retirement_date, None);
    }

    #[test]
    fn malformed_year_names_the_row() {
        let mut row = valid_row();
        row[4] = t("mil novecientos");
        match parse_row(7, &row) {
            Err(ImportError::Row { row, message }) => {
                assert_eq!(row, 7);
                assert!(message.starts_with("Edition year"));
            }
            other => panic!("expected row error, got {other:?}"),
        }
    }

    #[test]
    fn fractional_quantity_is_rejected() {
        let mut row = valid_row();
        row[9] = Cell::Number(2.5);
        assert!(matches!(parse_row(3, &row), Err(ImportError::Row { row: 3, .. })));
    }

    #[test]
    fn missing_quantity_is_rejected() {
        let mut row = valid_row();
        row[9] = Cell::Empty;
        assert!(parse_row(3, &row).is_err());
    }

    #[test]
    fn short_rows_are_padded_with_empty_cells() {
        let row: Vec<Cell> = valid_row().into_iter().take(10).collect();
        let d = parse_row(2, &row).unwrap();
        assert!(d.provenance.is_empty());
        assert!(d.intake_date.is_none());
    }

    #[test]
    fn numeric_catalog_numbers_lose_the_decimal_point() {
        let mut row = valid_row();
        row[0] = Cell::Number(1234.0);
        assert_eq!(parse_row(2, &row).unwrap().catalog_number, "1234");
    }

    #[test]
    fn serial_dates_convert() {
        let d = excel_serial_to_utc(45352.0).unwrap();
        assert_eq!(d.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(excel_serial_to_utc(-3.0).is_none());
    }

    #[test]
    fn unreadable_bytes_are_reported() {
        assert!(matches!(
            read_workbook(b"definitely not a zip"),
            Err(ImportError::Unreadable(_))
        ));
    }
}
