use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio_stream::Iter as StreamIter;
use tracing::{Span, debug, info, instrument, warn};

use shelfwise_catalog::CatalogItemSnapshot;
use shelfwise_core::{AggregateRoot, CatalogItemId, Clock, DomainError, ExpectedVersion, LoanId, UserId};
use shelfwise_documents::render_receipt;
use shelfwise_loans::{BorrowerInfo, Loan, LoanPolicy, LoanSnapshot, LoanStatusFilter};

use super::ServiceResult;
use crate::receipts::ReceiptArchive;
use crate::store::{CatalogRepository, LedgerWrites, LibraryStore, LoanRepository, StoreError};

/// Optimistic writes that lose a race are re-read and retried this many times.
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Open loans as a stream, evaluated over a fresh read on every call.
pub type ActiveLoans = StreamIter<std::vec::IntoIter<Loan>>;

/// A loan joined with its catalog record, if that record still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanView {
    pub loan: LoanSnapshot,
    pub item: Option<CatalogItemSnapshot>,
    pub overdue: bool,
}

/// Loan use cases: checkout, return, listings and receipts.
#[derive(Clone)]
pub struct LoanLedger {
    store: Arc<dyn LibraryStore>,
    clock: Arc<dyn Clock>,
    receipts: Arc<dyn ReceiptArchive>,
    policy: LoanPolicy,
}

impl LoanLedger {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        clock: Arc<dyn Clock>,
        receipts: Arc<dyn ReceiptArchive>,
        policy: LoanPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            receipts,
            policy,
        }
    }

    /// Lend one copy of `item_id`. `actor` is the user registering the loan.
    ///
    /// The item decrement and the new loan commit together. The receipt is
    /// rendered afterwards; a receipt failure is logged and does not undo the loan.
    #[instrument(skip(self, borrower), fields(item_id = %item_id, loan_id = tracing::field::Empty), err)]
    pub async fn checkout(
        &self,
        item_id: CatalogItemId,
        borrower: BorrowerInfo,
        actor: UserId,
    ) -> ServiceResult<Loan> {
        let mut attempt = 0;
        let loan = loop {
            attempt += 1;
            let mut item = self
                .store
                .get_item(item_id)
                .await?
                .ok_or_else(|| DomainError::not_found(format!("catalog item {item_id}")))?;
            let stored = item.version();
            let loan = shelfwise_loans::checkout(
                LoanId::new(),
                &mut item,
                borrower.clone(),
                actor,
                self.clock.now(),
                self.policy,
            )?;

            match self
                .store
                .commit_checkout(&item, ExpectedVersion::Exact(stored), &loan)
                .await
            {
                Ok(()) => break loan,
                Err(StoreError::Concurrency(reason)) if attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(attempt, %reason, "checkout lost a race; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        };

        Span::current().record("loan_id", tracing::field::display(loan.id_typed()));
        info!(
            title = loan.item_title(),
            due_at = %loan.due_at(),
            "loan opened"
        );
        self.issue_receipt(&loan).await;
        Ok(loan)
    }

    async fn issue_receipt(&self, loan: &Loan) {
        let pdf = match render_receipt(loan) {
            Ok(pdf) => pdf,
            Err(e) => {
                warn!(loan_id = %loan.id_typed(), error = %e, "failed to render loan receipt");
                return;
            }
        };
        if let Err(e) = self.receipts.store(loan.id_typed(), &pdf).await {
            warn!(loan_id = %loan.id_typed(), error = %e, "failed to archive loan receipt");
        }
    }

    /// Close an open loan and put the copy back on the shelf.
    #[instrument(skip(self), fields(loan_id = %loan_id), err)]
    pub async fn return_loan(&self, loan_id: LoanId) -> ServiceResult<Loan> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut loan = self.get(loan_id).await?;
            let loan_version = loan.version();
            let mut item = self.store.get_item(loan.item_id()).await?;
            let item_version = item.as_ref().map(|i| i.version());

            shelfwise_loans::return_loan(&mut loan, item.as_mut(), self.clock.now())?;

            let item_write = item
                .as_ref()
                .zip(item_version)
                .map(|(i, v)| (i, ExpectedVersion::Exact(v)));
            match self
                .store
                .commit_return(&loan, ExpectedVersion::Exact(loan_version), item_write)
                .await
            {
                Ok(()) => {
                    if item.is_none() {
                        info!("loan closed; its catalog record no longer exists");
                    }
                    return Ok(loan);
                }
                Err(StoreError::Concurrency(reason)) if attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(attempt, %reason, "return lost a race; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn get(&self, loan_id: LoanId) -> ServiceResult<Loan> {
        self.store
            .get_loan(loan_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("loan {loan_id}")).into())
    }

    /// Open loans, ordered by due date when `sort_by_due`, else newest first.
    pub async fn list_active(&self, sort_by_due: bool) -> ServiceResult<ActiveLoans> {
        let mut loans = self.store.list_loans(LoanStatusFilter::Active).await?;
        if sort_by_due {
            loans.sort_by_key(|l| (l.due_at(), l.id_typed()));
        }
        Ok(tokio_stream::iter(loans))
    }

    pub async fn list_by_status(&self, filter: LoanStatusFilter) -> ServiceResult<Vec<LoanView>> {
        let loans = self.store.list_loans(filter).await?;
        let items: HashMap<CatalogItemId, CatalogItemSnapshot> = self
            .store
            .list_items()
            .await?
            .into_iter()
            .map(|i| (i.id_typed(), i.snapshot()))
            .collect();
        let now = self.clock.now();

        Ok(loans
            .into_iter()
            .map(|loan| LoanView {
                item: items.get(&loan.item_id()).cloned(),
                overdue: loan.is_overdue(now),
                loan: loan.snapshot(),
            })
            .collect())
    }

    /// Re-render the receipt for any loan, open or closed.
    pub async fn receipt(&self, loan_id: LoanId) -> ServiceResult<Vec<u8>> {
        let loan = self.get(loan_id).await?;
        Ok(render_receipt(&loan)?)
    }

    pub async fn has_overdue(&self) -> ServiceResult<bool> {
        let now = self.clock.now();
        Ok(self
            .store
            .list_loans(LoanStatusFilter::Active)
            .await?
            .iter()
            .any(|l| l.is_overdue(now)))
    }

    /// Titles of the loans `borrower_id` registered that are still open.
    pub async fn open_titles_for(&self, borrower_id: UserId) -> ServiceResult<Vec<String>> {
        Ok(self
            .store
            .list_loans_for_borrower(borrower_id, LoanStatusFilter::Active)
            .await?
            .into_iter()
            .map(|l| l.item_title().to_string())
            .collect())
    }

    pub fn policy(&self) -> LoanPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipts::{InMemoryReceiptArchive, ReceiptArchiveError};
    use crate::services::{CatalogService, ServiceError};
    use crate::store::InMemoryLibraryStore;
    use crate::testing::{borrower, draft, fixed_clock, fixed_now};
    use async_trait::async_trait;
    use chrono::Duration;
    use proptest::prelude::*;
    use shelfwise_catalog::ItemStatus;
    use shelfwise_core::FixedClock;
    use tokio_stream::StreamExt;

    struct Harness {
        catalog: CatalogService,
        ledger: LoanLedger,
        clock: Arc<FixedClock>,
        receipts: Arc<InMemoryReceiptArchive>,
    }

    fn harness() -> Harness {
        let store = InMemoryLibraryStore::arc();
        let clock = fixed_clock();
        let receipts = InMemoryReceiptArchive::arc();
        Harness {
            catalog: CatalogService::new(store.clone(), clock.clone()),
            ledger: LoanLedger::new(store, clock.clone(), receipts.clone(), LoanPolicy::default()),
            clock,
            receipts,
        }
    }

    struct BrokenArchive;

    #[async_trait]
    impl ReceiptArchive for BrokenArchive {
        async fn store(&self, _: LoanId, _: &[u8]) -> Result<(), ReceiptArchiveError> {
            Err(ReceiptArchiveError::Poisoned)
        }
    }

    #[tokio::test]
    async fn checkout_of_last_copy_flips_status_and_blocks_the_next() {
        let h = harness();
        let item = h.catalog.create(draft("Mafalda", 1)).await.unwrap();

        let loan = h
            .ledger
            .checkout(item.id_typed(), borrower(), UserId::new())
            .await
            .unwrap();
        assert_eq!(loan.borrower().first_name, "María");
        assert_eq!(loan.borrower().last_name, "González");
        assert_eq!(loan.due_at(), fixed_now() + Duration::days(15));

        let stored = h.catalog.get(item.id_typed()).await.unwrap();
        assert_eq!(stored.quantity(), 0);
        assert_eq!(stored.status(), ItemStatus::OnLoan);

        match h.ledger.checkout(item.id_typed(), borrower(), UserId::new()).await {
            Err(ServiceError::Domain(DomainError::Unavailable(_))) => {}
            other => panic!("expected unavailable, got {other:?}"),
        }
        assert_eq!(h.ledger.list_by_status(LoanStatusFilter::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn checkout_archives_a_receipt() {
        let h = harness();
        let item = h.catalog.create(draft("Mafalda", 2)).await.unwrap();
        let loan = h
            .ledger
            .checkout(item.id_typed(), borrower(), UserId::new())
            .await
            .unwrap();

        let pdf = h.receipts.get(loan.id_typed()).expect("receipt archived");
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn receipt_failure_does_not_undo_the_loan() {
        let store = InMemoryLibraryStore::arc();
        let clock = fixed_clock();
        let catalog = CatalogService::new(store.clone(), clock.clone());
        let ledger = LoanLedger::new(store, clock, Arc::new(BrokenArchive), LoanPolicy::default());
        let item = catalog.create(draft("Mafalda", 1)).await.unwrap();

        let loan = ledger
            .checkout(item.id_typed(), borrower(), UserId::new())
            .await
            .unwrap();
        assert!(!ledger.get(loan.id_typed()).await.unwrap().is_closed());
        assert_eq!(catalog.get(item.id_typed()).await.unwrap().quantity(), 0);
    }

    #[tokio::test]
    async fn return_restores_stock_and_double_return_is_rejected() {
        let h = harness();
        let item = h.catalog.create(draft("Mafalda", 1)).await.unwrap();
        let loan = h
            .ledger
            .checkout(item.id_typed(), borrower(), UserId::new())
            .await
            .unwrap();

        let closed = h.ledger.return_loan(loan.id_typed()).await.unwrap();
        assert!(closed.is_closed());
        let stored = h.catalog.get(item.id_typed()).await.unwrap();
        assert_eq!(stored.quantity(), 1);
        assert_eq!(stored.status(), ItemStatus::Available);

        match h.ledger.return_loan(loan.id_typed()).await {
            Err(ServiceError::Domain(DomainError::AlreadyReturned(_))) => {}
            other => panic!("expected already returned, got {other:?}"),
        }
        assert_eq!(h.catalog.get(item.id_typed()).await.unwrap().quantity(), 1);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let h = harness();
        let err = h
            .ledger
            .checkout(CatalogItemId::new(), borrower(), UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));

        let err = h.ledger.return_loan(LoanId::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn overdue_is_flagged_after_the_loan_period() {
        let h = harness();
        let item = h.catalog.create(draft("Mafalda", 3)).await.unwrap();
        h.ledger
            .checkout(item.id_typed(), borrower(), UserId::new())
            .await
            .unwrap();

        h.clock.advance(Duration::days(14));
        assert!(!h.ledger.has_overdue().await.unwrap());

        h.clock.advance(Duration::days(2));
        assert!(h.ledger.has_overdue().await.unwrap());
        let views = h.ledger.list_by_status(LoanStatusFilter::Active).await.unwrap();
        assert!(views[0].overdue);
        assert_eq!(views[0].item.as_ref().map(|i| i.quantity), Some(2));

        // overdue never blocks lending
        h.ledger
            .checkout(item.id_typed(), borrower(), UserId::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn active_stream_can_be_sorted_by_due_date() {
        let h = harness();
        let item = h.catalog.create(draft("Mafalda", 3)).await.unwrap();
        let first = h
            .ledger
            .checkout(item.id_typed(), borrower(), UserId::new())
            .await
            .unwrap();
        h.clock.advance(Duration::days(1));
        let second = h
            .ledger
            .checkout(item.id_typed(), borrower(), UserId::new())
            .await
            .unwrap();
        h.clock.advance(Duration::days(1));
        let returned = h
            .ledger
            .checkout(item.id_typed(), borrower(), UserId::new())
            .await
            .unwrap();
        h.ledger.return_loan(returned.id_typed()).await.unwrap();

        let by_due: Vec<LoanId> = h
            .ledger
            .list_active(true)
            .await
            .unwrap()
            .map(|l| l.id_typed())
            .collect()
            .await;
        assert_eq!(by_due, vec![first.id_typed(), second.id_typed()]);

        let newest_first: Vec<LoanId> = h
            .ledger
            .list_active(false)
            .await
            .unwrap()
            .map(|l| l.id_typed())
            .collect()
            .await;
        assert_eq!(newest_first, vec![second.id_typed(), first.id_typed()]);
    }

    #[tokio::test]
    async fn open_titles_are_listed_per_borrower() {
        let h = harness();
        let teacher = UserId::new();
        let item = h.catalog.create(draft("Mafalda", 3)).await.unwrap();
        h.ledger.checkout(item.id_typed(), borrower(), teacher).await.unwrap();
        h.ledger.checkout(item.id_typed(), borrower(), UserId::new()).await.unwrap();

        let titles = h.ledger.open_titles_for(teacher).await.unwrap();
        assert_eq!(titles, vec!["Mafalda".to_string()]);
    }

    #[tokio::test]
    async fn concurrent_checkouts_never_oversell() {
        let h = harness();
        let item = h.catalog.create(draft("Mafalda", 2)).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..6 {
            let ledger = h.ledger.clone();
            let id = item.id_typed();
            tasks.push(tokio::spawn(async move {
                ledger.checkout(id, borrower(), UserId::new()).await
            }));
        }
        let mut opened = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => opened += 1,
                Err(ServiceError::Domain(
                    DomainError::Unavailable(_) | DomainError::ConcurrentModification(_),
                )) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(opened, 2);
        assert_eq!(h.catalog.get(item.id_typed()).await.unwrap().quantity(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn shelf_plus_open_loans_is_conserved(
            initial in 0i64..5,
            ops in prop::collection::vec(any::<bool>(), 1..30),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let h = harness();
                let item = h.catalog.create(draft("Mafalda", initial)).await.unwrap();
                let mut open: Vec<LoanId> = Vec::new();

                for lend in ops {
                    if lend {
                        match h.ledger.checkout(item.id_typed(), borrower(), UserId::new()).await {
                            Ok(loan) => open.push(loan.id_typed()),
                            Err(ServiceError::Domain(DomainError::Unavailable(_))) => {}
                            Err(other) => panic!("unexpected checkout error: {other:?}"),
                        }
                    } else if let Some(id) = open.pop() {
                        h.ledger.return_loan(id).await.unwrap();
                    }

                    let stored = h.catalog.get(item.id_typed()).await.unwrap();
                    assert_eq!(stored.quantity() + open.len() as i64, initial);
                    assert_eq!(stored.is_available(), stored.quantity() > 0);
                }
            });
        }
    }
}
