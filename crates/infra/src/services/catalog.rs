use std::sync::Arc;

use serde::Serialize;
use tracing::{Span, info, instrument};

use shelfwise_catalog::{
    CatalogFilter, CatalogItem, CatalogItemDraft, CatalogItemPatch, CatalogItemSnapshot,
    DeleteMode, DeletionPlan, FormOptions, ItemStatus, distinct_subjects, reconciler,
};
use shelfwise_core::{AggregateRoot, CatalogItemId, Clock, DomainError, ExpectedVersion};
use shelfwise_documents::{ImportError, catalog_workbook, import_template, read_workbook};
use shelfwise_loans::LoanStatusFilter;

use super::{ServiceError, ServiceResult};
use crate::store::{CatalogRepository, LibraryStore, LoanRepository};

/// Catalog listing with everything the list screen needs in one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogListView {
    pub items: Vec<CatalogItemSnapshot>,
    /// Subjects present in the whole catalog, for the subject picker.
    pub subjects: Vec<String>,
    pub selected_subject: Option<String>,
    pub selected_status: Option<ItemStatus>,
    /// True while any open loan is past its due date.
    pub has_overdue_loans: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeletionOutcome {
    Decremented { remaining: i64 },
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub imported: usize,
}

/// Catalog use cases: CRUD, search, spreadsheet import/export.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn LibraryStore>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn LibraryStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    #[instrument(skip(self, draft), fields(item_id = tracing::field::Empty), err)]
    pub async fn create(&self, draft: CatalogItemDraft) -> ServiceResult<CatalogItem> {
        let item = CatalogItem::create(CatalogItemId::new(), draft, self.clock.now())?;
        Span::current().record("item_id", tracing::field::display(item.id_typed()));
        self.store.insert_item(&item).await?;
        info!(title = item.title(), quantity = item.quantity(), "catalog item created");
        Ok(item)
    }

    pub async fn get(&self, id: CatalogItemId) -> ServiceResult<CatalogItem> {
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("catalog item {id}")).into())
    }

    /// Apply `patch`; `expected` is the version the caller last saw.
    #[instrument(skip(self, patch), fields(item_id = %id, expected = ?expected), err)]
    pub async fn update(
        &self,
        id: CatalogItemId,
        patch: CatalogItemPatch,
        expected: ExpectedVersion,
    ) -> ServiceResult<CatalogItem> {
        let mut item = self.get(id).await?;
        let stored = item.version();
        expected.check(stored)?;
        item.revise(patch)?;
        self.store
            .update_item(&item, ExpectedVersion::Exact(stored))
            .await?;
        Ok(item)
    }

    #[instrument(skip(self), fields(item_id = %id, mode = ?mode), err)]
    pub async fn delete(&self, id: CatalogItemId, mode: DeleteMode) -> ServiceResult<DeletionOutcome> {
        let mut item = self.get(id).await?;
        let stored = item.version();
        let open_loans = self.store.count_open_loans(id).await?;

        match reconciler::plan_deletion(&item, mode, open_loans)? {
            DeletionPlan::Decrement => {
                reconciler::decrement(&mut item)?;
                self.store
                    .update_item(&item, ExpectedVersion::Exact(stored))
                    .await?;
                Ok(DeletionOutcome::Decremented {
                    remaining: item.quantity(),
                })
            }
            DeletionPlan::Remove => {
                self.store
                    .remove_item(id, ExpectedVersion::Exact(stored))
                    .await?;
                info!(title = item.title(), "catalog item removed");
                Ok(DeletionOutcome::Removed)
            }
        }
    }

    pub async fn search(&self, filter: &CatalogFilter) -> ServiceResult<Vec<CatalogItem>> {
        let items = self.store.list_items().await?;
        Ok(items.into_iter().filter(|i| filter.matches(i)).collect())
    }

    pub async fn list_view(
        &self,
        subject: Option<String>,
        status: Option<ItemStatus>,
    ) -> ServiceResult<CatalogListView> {
        let items = self.store.list_items().await?;
        let subjects = distinct_subjects(&items);
        let filter = CatalogFilter {
            subject: subject.clone(),
            status,
            ..Default::default()
        };
        let now = self.clock.now();
        let has_overdue_loans = self
            .store
            .list_loans(LoanStatusFilter::Active)
            .await?
            .iter()
            .any(|l| l.is_overdue(now));

        Ok(CatalogListView {
            items: filter.apply(&items).into_iter().map(CatalogItem::snapshot).collect(),
            subjects,
            selected_subject: subject,
            selected_status: status,
            has_overdue_loans,
        })
    }

    pub fn form_options(&self) -> FormOptions {
        FormOptions::standard()
    }

    /// Import every data row of an xlsx workbook, or nothing.
    #[instrument(skip(self, bytes), fields(bytes = bytes.len(), imported = tracing::field::Empty), err)]
    pub async fn import_spreadsheet(&self, bytes: &[u8]) -> ServiceResult<ImportOutcome> {
        let rows = read_workbook(bytes).map_err(|e| match e {
            ImportError::Empty => ServiceError::Domain(DomainError::validation(
                "the workbook has no data rows",
            )),
            other => other.into(),
        })?;

        let now = self.clock.now();
        let mut items = Vec::with_capacity(rows.len());
        for (row, draft) in rows {
            let item = CatalogItem::create(CatalogItemId::new(), draft, now)
                .map_err(|e| ImportError::row(row, e.to_string()))?;
            items.push(item);
        }

        self.store.insert_items(&items).await?;
        Span::current().record("imported", items.len());
        info!(imported = items.len(), "catalog import committed");
        Ok(ImportOutcome {
            imported: items.len(),
        })
    }

    pub async fn export_spreadsheet(&self) -> ServiceResult<Vec<u8>> {
        let items = self.store.list_items().await?;
        Ok(catalog_workbook(&items)?)
    }

    pub fn import_template(&self) -> ServiceResult<Vec<u8>> {
        Ok(import_template()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryLibraryStore, LedgerWrites};
    use crate::testing::{draft, fixed_clock, fixed_now};
    use shelfwise_core::{LoanId, UserId};
    use shelfwise_loans::{BorrowerInfo, LoanPolicy, checkout};

    fn service() -> (CatalogService, Arc<InMemoryLibraryStore>) {
        let store = InMemoryLibraryStore::arc();
        (CatalogService::new(store.clone(), fixed_clock()), store)
    }

    async fn lend_one(store: &dyn LibraryStore, id: CatalogItemId) {
        let mut item = store.get_item(id).await.unwrap().unwrap();
        let before = item.version();
        let borrower = BorrowerInfo {
            first_name: "Juan".into(),
            last_name: "Gómez".into(),
            grade: "3°".into(),
        };
        let loan = checkout(
            LoanId::new(),
            &mut item,
            borrower,
            UserId::new(),
            fixed_now(),
            LoanPolicy::default(),
        )
        .unwrap();
        store
            .commit_checkout(&item, ExpectedVersion::Exact(before), &loan)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_derives_status_from_quantity() {
        let (svc, _) = service();
        let stocked = svc.create(draft("Cuentos de la selva", 2)).await.unwrap();
        let empty = svc.create(draft("Mafalda", 0)).await.unwrap();

        assert_eq!(stocked.status(), ItemStatus::Available);
        assert_eq!(empty.status(), ItemStatus::OnLoan);
        assert_eq!(svc.get(stocked.id_typed()).await.unwrap(), stocked);
    }

    #[tokio::test]
    async fn create_rejects_missing_title() {
        let (svc, store) = service();
        let err = svc.create(draft("  ", 1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
        assert_eq!(store.count_items().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_with_stale_version_is_rejected() {
        let (svc, _) = service();
        let item = svc.create(draft("Mafalda", 1)).await.unwrap();
        let patch = CatalogItemPatch {
            quantity: Some(4),
            ..Default::default()
        };
        let updated = svc
            .update(item.id_typed(), patch.clone(), ExpectedVersion::Exact(item.version()))
            .await
            .unwrap();
        assert_eq!(updated.quantity(), 4);

        let err = svc
            .update(item.id_typed(), patch, ExpectedVersion::Exact(item.version()))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ServiceError::Domain(DomainError::ConcurrentModification(_))),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn update_to_zero_flips_status() {
        let (svc, _) = service();
        let item = svc.create(draft("Mafalda", 3)).await.unwrap();
        let patch = CatalogItemPatch {
            quantity: Some(0),
            ..Default::default()
        };
        let updated = svc
            .update(item.id_typed(), patch, ExpectedVersion::Any)
            .await
            .unwrap();
        assert_eq!(updated.status(), ItemStatus::OnLoan);
    }

    #[tokio::test]
    async fn update_unknown_item_is_not_found() {
        let (svc, _) = service();
        let err = svc
            .update(CatalogItemId::new(), CatalogItemPatch::default(), ExpectedVersion::Any)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_one_decrements_then_removes_last_unit() {
        let (svc, store) = service();
        let item = svc.create(draft("Mafalda", 2)).await.unwrap();

        let outcome = svc.delete(item.id_typed(), DeleteMode::One).await.unwrap();
        assert_eq!(outcome, DeletionOutcome::Decremented { remaining: 1 });

        let outcome = svc.delete(item.id_typed(), DeleteMode::One).await.unwrap();
        assert_eq!(outcome, DeletionOutcome::Removed);
        assert!(store.get_item(item.id_typed()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_refused_while_loans_are_open() {
        let (svc, store) = service();
        let item = svc.create(draft("Mafalda", 1)).await.unwrap();
        lend_one(store.as_ref(), item.id_typed()).await;

        for mode in [DeleteMode::One, DeleteMode::All] {
            match svc.delete(item.id_typed(), mode).await {
                Err(ServiceError::Domain(DomainError::Conflict(_))) => {}
                other => panic!("expected conflict for {mode:?}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn search_and_list_view_filter_by_subject_and_status() {
        let (svc, _) = service();
        svc.create(draft("Mafalda", 1)).await.unwrap();
        let mut other = draft("Atlas escolar", 0);
        other.subjects = vec!["Geografía".into()];
        svc.create(other).await.unwrap();

        let found = svc
            .search(&CatalogFilter {
                title: Some("mafal".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let view = svc
            .list_view(Some("geografia".into()), Some(ItemStatus::OnLoan))
            .await
            .unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].title, "Atlas escolar");
        assert_eq!(view.subjects, vec!["Geografia".to_string(), "Literatura".to_string()]);
        assert!(!view.has_overdue_loans);
    }

    fn workbook(rows: &[[&str; 16]]) -> Vec<u8> {
        let mut wb = rust_xlsxwriter::Workbook::new();
        let ws = wb.add_worksheet();
        for (col, header) in shelfwise_documents::COLUMNS.iter().enumerate() {
            ws.write_string(0, col as u16, *header).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    ws.write_string(r as u32 + 1, col as u16, *value).unwrap();
                }
            }
        }
        wb.save_to_buffer().unwrap()
    }

    const GOOD_ROW: [&str; 16] = [
        "L-1", "Mafalda", "Quino", "De la Flor", "1993", "Humor, Historieta", "", "Libro", "",
        "2", "Compra", "Biblioteca", "4°, 5°", "", "01/03/2024", "",
    ];

    #[tokio::test]
    async fn import_with_a_malformed_row_persists_nothing() {
        let (svc, store) = service();
        let mut bad = GOOD_ROW;
        bad[1] = "Cuentos";
        bad[4] = "mil novecientos";
        let bytes = workbook(&[GOOD_ROW, bad]);

        match svc.import_spreadsheet(&bytes).await {
            Err(ServiceError::Import(ImportError::Row { row, message })) => {
                assert_eq!(row, 3);
                assert!(message.contains("year"), "{message}");
            }
            other => panic!("expected a row error, got {other:?}"),
        }
        assert_eq!(store.count_items().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn import_reports_domain_failures_by_row() {
        let (svc, store) = service();
        let mut bad = GOOD_ROW;
        bad[9] = "-4";
        let bytes = workbook(&[GOOD_ROW, GOOD_ROW, bad]);

        match svc.import_spreadsheet(&bytes).await {
            Err(ServiceError::Import(ImportError::Row { row, .. })) => assert_eq!(row, 4),
            other => panic!("expected a row error, got {other:?}"),
        }
        assert_eq!(store.count_items().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn import_inserts_every_row_and_strips_accents() {
        let (svc, store) = service();
        let mut second = GOOD_ROW;
        second[1] = "Canción de cuna";
        let bytes = workbook(&[GOOD_ROW, second]);

        let outcome = svc.import_spreadsheet(&bytes).await.unwrap();
        assert_eq!(outcome, ImportOutcome { imported: 2 });

        let titles: Vec<String> = store
            .list_items()
            .await
            .unwrap()
            .iter()
            .map(|i| i.title().to_string())
            .collect();
        assert_eq!(titles, vec!["Cancion de cuna".to_string(), "Mafalda".to_string()]);
    }

    #[tokio::test]
    async fn header_only_workbook_is_a_validation_error() {
        let (svc, _) = service();
        let err = svc.import_spreadsheet(&workbook(&[])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))), "got {err:?}");
    }

    #[tokio::test]
    async fn template_and_export_are_workbooks() {
        let (svc, _) = service();
        svc.create(draft("Mafalda", 1)).await.unwrap();
        assert!(svc.import_template().unwrap().starts_with(b"PK"));
        assert!(svc.export_spreadsheet().await.unwrap().starts_with(b"PK"));
    }
}
