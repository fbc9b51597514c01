//! Spreadsheet exports: catalog, summary report and the blank import template.

use rust_xlsxwriter::{Color, Format, Workbook, Worksheet, XlsxError};

use shelfwise_catalog::{CLASSROOMS, CatalogItem, GRADE_LEVELS, SUPPORT_TYPES};
use shelfwise_reports::LibrarySummary;

use crate::error::DocumentError;
use crate::import::COLUMNS;

const COLUMN_HINTS: [&str; 16] = [
    "Text",
    "Text",
    "Text",
    "Text",
    "Number",
    "Text, comma separated",
    "Text",
    "Text",
    "Text",
    "Number (0-9999)",
    "Text (Donación, Compra, Ministerio de la Nación, ...)",
    "Text (Aula requires rooms)",
    "Text, comma separated",
    "Text, comma separated",
    "Date DD/MM/YYYY (blank = today)",
    "Date DD/MM/YYYY (optional)",
];

fn write_header(sheet: &mut Worksheet, headers: &[&str]) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    for (col, title) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &bold)?;
    }
    Ok(())
}

fn join(values: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    values
        .into_iter()
        .map(|v| v.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The whole catalog in import column order, so an export can be re-imported.
pub fn catalog_workbook(items: &[CatalogItem]) -> Result<Vec<u8>, DocumentError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Catalog")?;
    write_header(sheet, &COLUMNS)?;

    for (i, item) in items.iter().enumerate() {
        let row = i as u32 + 1;
        let s = item.snapshot();
        sheet.write_string(row, 0, &s.catalog_number)?;
        sheet.write_string(row, 1, &s.title)?;
        sheet.write_string(row, 2, &s.author)?;
        sheet.write_string(row, 3, &s.publisher)?;
        if let Some(year) = s.edition_year {
            sheet.write_number(row, 4, year)?;
        }
        sheet.write_string(row, 5, join(&s.subjects))?;
        sheet.write_string(row, 6, s.sub_subject.as_deref().unwrap_or_default())?;
        sheet.write_string(row, 7, s.support_type.as_deref().unwrap_or_default())?;
        sheet.write_string(row, 8, s.support_subtype.as_deref().unwrap_or_default())?;
        sheet.write_number(row, 9, s.quantity as f64)?;
        sheet.write_string(row, 10, s.provenance.label())?;
        sheet.write_string(row, 11, &s.location)?;
        sheet.write_string(row, 12, join(&s.grades))?;
        sheet.write_string(row, 13, join(&s.rooms))?;
        sheet.write_string(row, 14, s.intake_date.format("%d/%m/%Y").to_string())?;
        if let Some(retired) = s.retirement_date {
            sheet.write_string(row, 15, retired.format("%d/%m/%Y").to_string())?;
        }
    }
    sheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

/// Summary report: headline counts plus per-subject and per-provenance tables.
pub fn summary_workbook(summary: &LibrarySummary) -> Result<Vec<u8>, DocumentError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_header(sheet, &["Metric", "Value"])?;
        let rows: [(&str, f64); 4] = [
            ("Catalog records", summary.item_count as f64),
            ("Copies on hand", summary.total_quantity as f64),
            ("Open loans", summary.open_loans as f64),
            ("Overdue loans", summary.overdue_loans as f64),
        ];
        for (i, (label, value)) in rows.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string_with_format(row, 0, *label, &bold)?;
            sheet.write_number(row, 1, *value)?;
        }
        if let Some(at) = summary.generated_at {
            sheet.write_string(rows.len() as u32 + 2, 0, format!("Generated {}", at.format("%d/%m/%Y %H:%M")))?;
        }
        sheet.autofit();
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("By subject")?;
        write_header(sheet, &["Subject", "Records"])?;
        for (i, (subject, count)) in summary.items_by_subject.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, subject)?;
            sheet.write_number(row, 1, *count as f64)?;
        }
        sheet.autofit();
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("By provenance")?;
        write_header(sheet, &["Provenance", "Copies"])?;
        for (i, (provenance, quantity)) in summary.quantity_by_provenance.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, provenance)?;
            sheet.write_number(row, 1, *quantity as f64)?;
        }
        sheet.autofit();
    }

    Ok(workbook.save_to_buffer()?)
}

/// Blank import sheet with one example row, plus a guide sheet listing the
/// expected type of every column and the suggested option values.
pub fn import_template() -> Result<Vec<u8>, DocumentError> {
    let mut workbook = Workbook::new();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Catalog")?;
        write_header(sheet, &COLUMNS)?;
        let example = [
            "0001",
            "El principito",
            "Antoine de Saint-Exupéry",
            "Salamandra",
            "1943",
            "Literatura",
            "",
            "Libro",
            "",
            "5",
            "Donación",
            "Biblioteca",
            "5°, 6°",
            "",
            "",
            "",
        ];
        for (col, value) in example.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            match value.parse::<f64>() {
                Ok(n) if col == 4 || col == 9 => sheet.write_number(1, col as u16, n)?,
                _ => sheet.write_string(1, col as u16, *value)?,
            };
        }
        sheet.autofit();
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Guide")?;
        write_header(sheet, &["Column", "Expected", "Grades", "Rooms", "Support types"])?;
        let gray = Format::new().set_font_color(Color::Gray);
        for (i, (column, hint)) in COLUMNS.iter().zip(COLUMN_HINTS).enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, *column)?;
            sheet.write_string_with_format(row, 1, hint, &gray)?;
        }
        for (col, values) in [(2u16, GRADE_LEVELS), (3, CLASSROOMS), (4, SUPPORT_TYPES)] {
            for (i, value) in values.iter().enumerate() {
                sheet.write_string(i as u32 + 1, col, *value)?;
            }
        }
        sheet.autofit();
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::read_workbook;
    use chrono::Utc;
    use shelfwise_catalog::CatalogItemDraft;
    use shelfwise_core::CatalogItemId;

    #[test]
    fn template_example_row_imports_cleanly() {
        let bytes = import_template().unwrap();
        let rows = read_workbook(&bytes).unwrap();
        assert_eq!(rows.len(), 1);
        let (row, draft) = &rows[0];
        assert_eq!(*row, 2);
        assert_eq!(draft.quantity, 5);
        assert!(CatalogItem::create(CatalogItemId::new(), draft.clone(), Utc::now()).is_ok());
    }

    #[test]
    fn exported_catalog_can_be_read_back() {
        let draft = CatalogItemDraft {
            catalog_number: "77".to_string(),
            title: "Manual de ciencias".to_string(),
            author: "Equipo docente".to_string(),
            publisher: "Santillana".to_string(),
            quantity: 2,
            subjects: vec!["Ciencias naturales".to_string()],
            provenance: "Compra".to_string(),
            location: "Aula".to_string(),
            grades: vec!["3°".to_string()],
            rooms: vec!["Belgrano".to_string()],
            ..Default::default()
        };
        let item = CatalogItem::create(CatalogItemId::new(), draft, Utc::now()).unwrap();
        let bytes = catalog_workbook(std::slice::from_ref(&item)).unwrap();
        let rows = read_workbook(&bytes).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.rooms, vec!["Belgrano"]);
        assert_eq!(rows[0].1.location, "Aula");
    }

    #[test]
    fn summary_workbook_renders() {
        let mut summary = LibrarySummary::default();
        summary.items_by_subject.insert("Literatura".to_string(), 2);
        summary.quantity_by_provenance.insert("Compra".to_string(), 7);
        let bytes = summary_workbook(&summary).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
