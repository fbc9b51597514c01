use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use shelfwise_catalog::{CatalogItem, reconciler};
use shelfwise_core::{AggregateRoot, CatalogItemId, DomainError, DomainResult, LoanId, UserId};

use crate::borrower::BorrowerInfo;

/// Loan period rules.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LoanPolicy {
    pub loan_period: Duration,
}

impl LoanPolicy {
    pub const DEFAULT_LOAN_DAYS: i64 = 15;

    pub fn days(days: i64) -> Self {
        Self {
            loan_period: Duration::days(days),
        }
    }
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self::days(Self::DEFAULT_LOAN_DAYS)
    }
}

/// Plain-data view of a loan, used by stores and API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSnapshot {
    pub id: LoanId,
    pub item_id: CatalogItemId,
    pub borrower_id: UserId,
    pub borrower: BorrowerInfo,
    pub item_title: String,
    pub item_author: String,
    pub checked_out_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub closed: bool,
    pub version: u64,
}

/// Aggregate root: one copy of a catalog item lent to a student.
///
/// Title and author are captured at checkout so the loan stays readable after
/// the item is edited or removed. `closed` and `returned_at` always agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    id: LoanId,
    item_id: CatalogItemId,
    borrower_id: UserId,
    borrower: BorrowerInfo,
    item_title: String,
    item_author: String,
    checked_out_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
    returned_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Loan {
    pub fn restore(snapshot: LoanSnapshot) -> Self {
        // `closed` is derived from `returned_at`; a closed flag without a date
        // gets the due date so the pair stays consistent.
        let returned_at = match (snapshot.returned_at, snapshot.closed) {
            (None, true) => Some(snapshot.due_at),
            (at, _) => at,
        };
        Self {
            id: snapshot.id,
            item_id: snapshot.item_id,
            borrower_id: snapshot.borrower_id,
            borrower: snapshot.borrower,
            item_title: snapshot.item_title,
            item_author: snapshot.item_author,
            checked_out_at: snapshot.checked_out_at,
            due_at: snapshot.due_at,
            returned_at,
            version: snapshot.version,
        }
    }

    pub fn snapshot(&self) -> LoanSnapshot {
        LoanSnapshot {
            id: self.id,
            item_id: self.item_id,
            borrower_id: self.borrower_id,
            borrower: self.borrower.clone(),
            item_title: self.item_title.clone(),
            item_author: self.item_author.clone(),
            checked_out_at: self.checked_out_at,
            due_at: self.due_at,
            returned_at: self.returned_at,
            closed: self.is_closed(),
            version: self.version,
        }
    }

    pub fn id_typed(&self) -> LoanId {
        self.id
    }

    pub fn item_id(&self) -> CatalogItemId {
        self.item_id
    }

    pub fn borrower_id(&self) -> UserId {
        self.borrower_id
    }

    pub fn borrower(&self) -> &BorrowerInfo {
        &self.borrower
    }

    pub fn item_title(&self) -> &str {
        &self.item_title
    }

    pub fn item_author(&self) -> &str {
        &self.item_author
    }

    pub fn checked_out_at(&self) -> DateTime<Utc> {
        self.checked_out_at
    }

    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at
    }

    pub fn is_closed(&self) -> bool {
        self.returned_at.is_some()
    }

    /// Open and past its due date. Informational only; never blocks a checkout.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_closed() && self.due_at < now
    }
}

impl AggregateRoot for Loan {
    type Id = LoanId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Lend one copy of `item`: the reconciler takes it off the shelf and a new
/// open loan due `policy.loan_period` from `now` is returned.
///
/// On error neither the item nor anything else has changed.
pub fn checkout(
    id: LoanId,
    item: &mut CatalogItem,
    borrower: BorrowerInfo,
    borrower_id: UserId,
    now: DateTime<Utc>,
    policy: LoanPolicy,
) -> DomainResult<Loan> {
    let borrower = borrower.normalized()?;
    if !item.is_available() {
        return Err(DomainError::unavailable(format!(
            "\"{}\" has no copies on hand",
            item.title()
        )));
    }
    reconciler::decrement(item)?;

    Ok(Loan {
        id,
        item_id: item.id_typed(),
        borrower_id,
        borrower,
        item_title: item.title().to_string(),
        item_author: item.author().to_string(),
        checked_out_at: now,
        due_at: now + policy.loan_period,
        returned_at: None,
        version: 1,
    })
}

/// Close `loan` and put the copy back on `item`'s shelf.
///
/// `item` is `None` when the record no longer exists; the loan is still closed.
pub fn return_loan(
    loan: &mut Loan,
    item: Option<&mut CatalogItem>,
    now: DateTime<Utc>,
) -> DomainResult<()> {
    if loan.is_closed() {
        return Err(DomainError::already_returned(loan.id));
    }
    if let Some(item) = item {
        if item.id_typed() != loan.item_id {
            return Err(DomainError::invariant("item does not match the loan"));
        }
        reconciler::increment(item);
    }
    loan.returned_at = Some(now);
    loan.version += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfwise_catalog::reconciler::restock;
    use shelfwise_catalog::{CatalogItemDraft, ItemStatus, MAX_QUANTITY};

    fn item(quantity: i64) -> CatalogItem {
        let draft = CatalogItemDraft {
            catalog_number: "B-12".to_string(),
            title: "Atlas geográfico escolar".to_string(),
            author: "Varios".to_string(),
            publisher: "Kapelusz".to_string(),
            quantity,
            subjects: vec!["Geografía".to_string()],
            provenance: "Compra".to_string(),
            location: "Biblioteca".to_string(),
            grades: vec!["4°".to_string()],
            ..Default::default()
        };
        CatalogItem::create(CatalogItemId::new(), draft, Utc::now()).unwrap()
    }

    fn borrower() -> BorrowerInfo {
        BorrowerInfo {
            first_name: "lucía".to_string(),
            last_name: "fernández".to_string(),
            grade: "4°".to_string(),
        }
    }

    fn open(item: &mut CatalogItem, now: DateTime<Utc>) -> Loan {
        checkout(LoanId::new(), item, borrower(), UserId::new(), now, LoanPolicy::default())
            .unwrap()
    }

    #[test]
    fn checkout_decrements_and_sets_due_date() {
        let now = Utc::now();
        let mut it = item(2);
        let loan = open(&mut it, now);

        assert_eq!(it.quantity(), 1);
        assert_eq!(loan.due_at(), now + Duration::days(15));
        assert_eq!(loan.borrower().full_name(), "Lucía Fernández");
        assert_eq!(loan.item_title(), it.title());
        assert!(!loan.is_closed());
    }

    #[test]
    fn last_copy_then_unavailable() {
        let now = Utc::now();
        let mut it = item(1);
        open(&mut it, now);
        assert_eq!(it.quantity(), 0);
        assert_eq!(it.status(), ItemStatus::OnLoan);

        let before = it.clone();
        match checkout(LoanId::new(), &mut it, borrower(), UserId::new(), now, LoanPolicy::default()) {
            Err(DomainError::Unavailable(_)) => {}
            other => panic!("expected unavailable, got {other:?}"),
        }
        assert_eq!(it, before);
    }

    #[test]
    fn invalid_borrower_leaves_item_untouched() {
        let mut it = item(3);
        let before = it.clone();
        let bad = BorrowerInfo {
            first_name: "R2D2".to_string(),
            ..borrower()
        };
        assert!(checkout(LoanId::new(), &mut it, bad, UserId::new(), Utc::now(), LoanPolicy::default()).is_err());
        assert_eq!(it, before);
    }

    #[test]
    fn return_restores_quantity_and_status() {
        let now = Utc::now();
        let mut it = item(1);
        let mut loan = open(&mut it, now);

        return_loan(&mut loan, Some(&mut it), now + Duration::days(3)).unwrap();
        assert_eq!(it.quantity(), 1);
        assert_eq!(it.status(), ItemStatus::Available);
        assert_eq!(loan.returned_at(), Some(now + Duration::days(3)));
        assert!(loan.snapshot().closed);
    }

    #[test]
    fn double_return_is_rejected_without_touching_stock() {
        let now = Utc::now();
        let mut it = item(1);
        let mut loan = open(&mut it, now);
        return_loan(&mut loan, Some(&mut it), now).unwrap();

        match return_loan(&mut loan, Some(&mut it), now) {
            Err(DomainError::AlreadyReturned(_)) => {}
            other => panic!("expected already returned, got {other:?}"),
        }
        assert_eq!(it.quantity(), 1);
    }

    #[test]
    fn return_succeeds_after_restock_to_the_cap() {
        let now = Utc::now();
        let mut it = item(MAX_QUANTITY);
        let mut loan = open(&mut it, now);
        restock(&mut it, MAX_QUANTITY).unwrap();

        return_loan(&mut loan, Some(&mut it), now).unwrap();
        assert!(loan.is_closed());
        assert_eq!(it.quantity(), MAX_QUANTITY + 1);
        assert_eq!(it.status(), ItemStatus::Available);
    }

    #[test]
    fn return_without_item_still_closes() {
        let now = Utc::now();
        let mut it = item(1);
        let mut loan = open(&mut it, now);
        return_loan(&mut loan, None, now).unwrap();
        assert!(loan.is_closed());
    }

    #[test]
    fn overdue_only_after_due_date_and_while_open() {
        let now = Utc::now();
        let mut it = item(2);
        let mut loan = open(&mut it, now);

        assert!(!loan.is_overdue(now + Duration::days(14)));
        assert!(loan.is_overdue(now + Duration::days(16)));

        return_loan(&mut loan, Some(&mut it), now + Duration::days(20)).unwrap();
        assert!(!loan.is_overdue(now + Duration::days(30)));
    }

    #[test]
    fn custom_policy_changes_due_date() {
        let now = Utc::now();
        let mut it = item(1);
        let loan = checkout(LoanId::new(), &mut it, borrower(), UserId::new(), now, LoanPolicy::days(7)).unwrap();
        assert_eq!(loan.due_at(), now + Duration::days(7));
    }

    #[test]
    fn restore_keeps_closed_and_returned_at_consistent() {
        let now = Utc::now();
        let mut it = item(1);
        let loan = open(&mut it, now);
        let mut snapshot = loan.snapshot();
        snapshot.closed = true;
        let restored = Loan::restore(snapshot);
        assert!(restored.is_closed());
        assert!(restored.returned_at().is_some());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

            /// Copies on the shelf plus copies out on loan never changes.
            #[test]
            fn stock_is_conserved(start in 0i64..6, steps in proptest::collection::vec(any::<bool>(), 0..30)) {
                let now = Utc::now();
                let mut it = item(start);
                let mut open_loans: Vec<Loan> = Vec::new();

                for lend in steps {
                    if lend {
                        let result = checkout(LoanId::new(), &mut it, borrower(), UserId::new(), now, LoanPolicy::default());
                        match result {
                            Ok(loan) => open_loans.push(loan),
                            Err(DomainError::Unavailable(_)) => prop_assert_eq!(it.quantity(), 0),
                            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                        }
                    } else if let Some(mut loan) = open_loans.pop() {
                        return_loan(&mut loan, Some(&mut it), now).unwrap();
                    }
                    prop_assert_eq!(it.quantity() + open_loans.len() as i64, start);
                    prop_assert_eq!(it.is_available(), it.quantity() > 0);
                }
            }
        }
    }
}
