use std::sync::Arc;

use tracing::instrument;

use shelfwise_core::Clock;
use shelfwise_documents::summary_workbook;
use shelfwise_loans::LoanStatusFilter;
use shelfwise_reports::{LibrarySummary, summarize};

use super::ServiceResult;
use crate::store::{CatalogRepository, LibraryStore, LoanRepository};

/// Library-wide counts, recomputed from current state on every call.
#[derive(Clone)]
pub struct ReportAggregator {
    store: Arc<dyn LibraryStore>,
    clock: Arc<dyn Clock>,
}

impl ReportAggregator {
    pub fn new(store: Arc<dyn LibraryStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    #[instrument(skip(self), err)]
    pub async fn summary(&self) -> ServiceResult<LibrarySummary> {
        let items = self.store.list_items().await?;
        let open = self.store.list_loans(LoanStatusFilter::Active).await?;
        Ok(summarize(&items, &open, self.clock.now()))
    }

    pub async fn summary_workbook(&self) -> ServiceResult<Vec<u8>> {
        let summary = self.summary().await?;
        Ok(summary_workbook(&summary)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipts::InMemoryReceiptArchive;
    use crate::services::{CatalogService, LoanLedger};
    use crate::store::InMemoryLibraryStore;
    use crate::testing::{borrower, draft, fixed_clock};
    use chrono::Duration;
    use shelfwise_core::UserId;
    use shelfwise_loans::LoanPolicy;

    #[tokio::test]
    async fn summary_reflects_catalog_and_loans() {
        let store = InMemoryLibraryStore::arc();
        let clock = fixed_clock();
        let catalog = CatalogService::new(store.clone(), clock.clone());
        let ledger = LoanLedger::new(
            store.clone(),
            clock.clone(),
            InMemoryReceiptArchive::arc(),
            LoanPolicy::default(),
        );
        let reports = ReportAggregator::new(store, clock.clone());

        let mafalda = catalog.create(draft("Mafalda", 3)).await.unwrap();
        let mut atlas = draft("Atlas escolar", 2);
        atlas.subjects = vec!["Geografía".into(), "Literatura".into()];
        atlas.provenance = "Ministerio de Educación".into();
        catalog.create(atlas).await.unwrap();
        ledger
            .checkout(mafalda.id_typed(), borrower(), UserId::new())
            .await
            .unwrap();
        clock.advance(Duration::days(20));

        let summary = reports.summary().await.unwrap();
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.total_quantity, 4);
        assert_eq!(summary.items_by_subject.get("Literatura"), Some(&2));
        assert_eq!(summary.items_by_subject.get("Geografia"), Some(&1));
        assert_eq!(summary.quantity_by_provenance.get("Compra"), Some(&2));
        assert_eq!(
            summary.quantity_by_provenance.get("Ministerio de la Nación"),
            Some(&2)
        );
        assert_eq!(summary.open_loans, 1);
        assert_eq!(summary.overdue_loans, 1);

        let bytes = reports.summary_workbook().await.unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
