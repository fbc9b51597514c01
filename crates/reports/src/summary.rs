use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use shelfwise_catalog::CatalogItem;
use shelfwise_loans::Loan;

/// Aggregate counts over the whole catalog and ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibrarySummary {
    pub generated_at: Option<DateTime<Utc>>,
    /// Number of catalog records.
    pub item_count: usize,
    /// Copies on hand across all records.
    pub total_quantity: i64,
    /// Records per subject; a record counts once in each of its subjects.
    pub items_by_subject: BTreeMap<String, usize>,
    /// Copies on hand per provenance label.
    pub quantity_by_provenance: BTreeMap<String, i64>,
    pub open_loans: usize,
    pub overdue_loans: usize,
}

pub fn summarize<'a>(
    items: impl IntoIterator<Item = &'a CatalogItem>,
    loans: impl IntoIterator<Item = &'a Loan>,
    now: DateTime<Utc>,
) -> LibrarySummary {
    let mut summary = LibrarySummary {
        generated_at: Some(now),
        ..Default::default()
    };

    for item in items {
        summary.item_count += 1;
        summary.total_quantity += item.quantity();
        for subject in item.subjects() {
            *summary.items_by_subject.entry(subject.clone()).or_default() += 1;
        }
        *summary
            .quantity_by_provenance
            .entry(item.provenance().label().to_string())
            .or_default() += item.quantity();
    }

    for loan in loans.into_iter().filter(|l| !l.is_closed()) {
        summary.open_loans += 1;
        if loan.is_overdue(now) {
            summary.overdue_loans += 1;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shelfwise_catalog::CatalogItemDraft;
    use shelfwise_core::{CatalogItemId, LoanId, UserId};
    use shelfwise_loans::{BorrowerInfo, LoanPolicy, checkout, return_loan};

    fn item(title: &str, quantity: i64, subjects: &[&str], provenance: &str) -> CatalogItem {
        let draft = CatalogItemDraft {
            catalog_number: format!("N-{title}"),
            title: title.to_string(),
            author: "Varios".to_string(),
            publisher: "Editorial".to_string(),
            quantity,
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            provenance: provenance.to_string(),
            location: "Biblioteca".to_string(),
            grades: vec!["3°".to_string()],
            ..Default::default()
        };
        CatalogItem::create(CatalogItemId::new(), draft, Utc::now()).unwrap()
    }

    fn lend(item: &mut CatalogItem, at: DateTime<Utc>) -> Loan {
        let borrower = BorrowerInfo {
            first_name: "Tomás".to_string(),
            last_name: "Ruiz".to_string(),
            grade: "3°".to_string(),
        };
        checkout(LoanId::new(), item, borrower, UserId::new(), at, LoanPolicy::default()).unwrap()
    }

    #[test]
    fn empty_library_summarizes_to_zero() {
        let now = Utc::now();
        let s = summarize([], [], now);
        assert_eq!(s.item_count, 0);
        assert_eq!(s.total_quantity, 0);
        assert!(s.items_by_subject.is_empty());
        assert_eq!(s.generated_at, Some(now));
    }

    #[test]
    fn counts_subjects_with_multi_membership_and_sums_provenance() {
        let now = Utc::now();
        let items = vec![
            item("El principito", 5, &["Literatura"], "Donación"),
            item("Atlas", 3, &["Geografía", "Ciencias sociales"], "Compra"),
            item("Manual", 2, &["Ciencias sociales"], "Ministerio de Educación"),
        ];
        let s = summarize(&items, [], now);

        assert_eq!(s.item_count, 3);
        assert_eq!(s.total_quantity, 10);
        assert_eq!(s.items_by_subject["Ciencias sociales"], 2);
        assert_eq!(s.items_by_subject["Geografia"], 1);
        assert_eq!(s.quantity_by_provenance["Donación"], 5);
        assert_eq!(s.quantity_by_provenance["Compra"], 3);
        assert_eq!(s.quantity_by_provenance["Ministerio de la Nación"], 2);
    }

    #[test]
    fn counts_open_and_overdue_loans_only() {
        let now = Utc::now();
        let mut book = item("Cuentos", 4, &["Literatura"], "Compra");
        let old = lend(&mut book, now - Duration::days(20));
        let recent = lend(&mut book, now - Duration::days(2));
        let mut returned = lend(&mut book, now - Duration::days(30));
        return_loan(&mut returned, Some(&mut book), now - Duration::days(1)).unwrap();

        let loans = [old, recent, returned];
        let s = summarize([&book], &loans, now);
        assert_eq!(s.open_loans, 2);
        assert_eq!(s.overdue_loans, 1);
        assert_eq!(s.total_quantity, 2);
    }
}
