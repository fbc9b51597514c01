use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use shelfwise_auth::StaffAccount;
use shelfwise_catalog::CatalogItem;
use shelfwise_core::{AggregateRoot, CatalogItemId, ExpectedVersion, LoanId, UserId};
use shelfwise_loans::{Loan, LoanStatusFilter};

use super::{
    CatalogRepository, LedgerWrites, LoanRepository, StoreError, StoreResult, UserDirectory,
    check_version,
};

#[derive(Debug, Default)]
struct State {
    items: HashMap<CatalogItemId, CatalogItem>,
    loans: HashMap<LoanId, Loan>,
    accounts: HashMap<UserId, StaffAccount>,
}

impl State {
    fn open_loans_for(&self, item_id: CatalogItemId) -> usize {
        self.loans
            .values()
            .filter(|l| l.item_id() == item_id && !l.is_closed())
            .count()
    }

    fn stored_item_version(&self, id: CatalogItemId) -> StoreResult<u64> {
        self.items
            .get(&id)
            .map(|i| i.version())
            .ok_or_else(|| StoreError::NotFound(format!("catalog item {id}")))
    }

    fn stored_loan_version(&self, id: LoanId) -> StoreResult<u64> {
        self.loans
            .get(&id)
            .map(|l| l.version())
            .ok_or_else(|| StoreError::NotFound(format!("loan {id}")))
    }
}

/// In-memory store for dev/test.
///
/// One lock guards all tables, so multi-record writes are atomic and
/// version checks happen under the same lock as the write.
#[derive(Debug, Default)]
pub struct InMemoryLibraryStore {
    state: RwLock<State>,
}

impl InMemoryLibraryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("library store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("library store lock poisoned".to_string()))
    }
}

fn sorted_loans(mut loans: Vec<Loan>) -> Vec<Loan> {
    loans.sort_by(|a, b| {
        b.checked_out_at()
            .cmp(&a.checked_out_at())
            .then_with(|| b.id_typed().cmp(&a.id_typed()))
    });
    loans
}

#[async_trait]
impl CatalogRepository for InMemoryLibraryStore {
    async fn get_item(&self, id: CatalogItemId) -> StoreResult<Option<CatalogItem>> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    async fn list_items(&self) -> StoreResult<Vec<CatalogItem>> {
        let mut items: Vec<CatalogItem> = self.read()?.items.values().cloned().collect();
        items.sort_by(|a, b| {
            a.title()
                .cmp(b.title())
                .then_with(|| a.id_typed().cmp(&b.id_typed()))
        });
        Ok(items)
    }

    async fn count_items(&self) -> StoreResult<usize> {
        Ok(self.read()?.items.len())
    }

    async fn insert_item(&self, item: &CatalogItem) -> StoreResult<()> {
        self.insert_items(std::slice::from_ref(item)).await
    }

    async fn insert_items(&self, items: &[CatalogItem]) -> StoreResult<()> {
        let mut state = self.write()?;
        if let Some(dup) = items.iter().find(|i| state.items.contains_key(i.id())) {
            return Err(StoreError::Duplicate(format!("catalog item {}", dup.id())));
        }
        for item in items {
            state.items.insert(item.id_typed(), item.clone());
        }
        Ok(())
    }

    async fn update_item(&self, item: &CatalogItem, expected: ExpectedVersion) -> StoreResult<()> {
        let mut state = self.write()?;
        let actual = state.stored_item_version(item.id_typed())?;
        check_version("catalog item", expected, actual)?;
        state.items.insert(item.id_typed(), item.clone());
        Ok(())
    }

    async fn remove_item(&self, id: CatalogItemId, expected: ExpectedVersion) -> StoreResult<()> {
        let mut state = self.write()?;
        let actual = state.stored_item_version(id)?;
        check_version("catalog item", expected, actual)?;
        let open = state.open_loans_for(id);
        if open > 0 {
            return Err(StoreError::Conflict(format!(
                "catalog item {id} has {open} open loan(s)"
            )));
        }
        state.items.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl LoanRepository for InMemoryLibraryStore {
    async fn get_loan(&self, id: LoanId) -> StoreResult<Option<Loan>> {
        Ok(self.read()?.loans.get(&id).cloned())
    }

    async fn list_loans(&self, filter: LoanStatusFilter) -> StoreResult<Vec<Loan>> {
        let loans = self
            .read()?
            .loans
            .values()
            .filter(|l| filter.admits(l.is_closed()))
            .cloned()
            .collect();
        Ok(sorted_loans(loans))
    }

    async fn list_loans_for_borrower(
        &self,
        borrower_id: UserId,
        filter: LoanStatusFilter,
    ) -> StoreResult<Vec<Loan>> {
        let loans = self
            .read()?
            .loans
            .values()
            .filter(|l| l.borrower_id() == borrower_id && filter.admits(l.is_closed()))
            .cloned()
            .collect();
        Ok(sorted_loans(loans))
    }

    async fn count_open_loans(&self, item_id: CatalogItemId) -> StoreResult<usize> {
        Ok(self.read()?.open_loans_for(item_id))
    }
}

#[async_trait]
impl LedgerWrites for InMemoryLibraryStore {
    async fn commit_checkout(
        &self,
        item: &CatalogItem,
        expected_item: ExpectedVersion,
        loan: &Loan,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        let actual = state.stored_item_version(item.id_typed())?;
        check_version("catalog item", expected_item, actual)?;
        if state.loans.contains_key(loan.id()) {
            return Err(StoreError::Duplicate(format!("loan {}", loan.id())));
        }
        state.items.insert(item.id_typed(), item.clone());
        state.loans.insert(loan.id_typed(), loan.clone());
        Ok(())
    }

    async fn commit_return(
        &self,
        loan: &Loan,
        expected_loan: ExpectedVersion,
        item: Option<(&CatalogItem, ExpectedVersion)>,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        let actual = state.stored_loan_version(loan.id_typed())?;
        check_version("loan", expected_loan, actual)?;
        if let Some((item, expected_item)) = item {
            let actual = state.stored_item_version(item.id_typed())?;
            check_version("catalog item", expected_item, actual)?;
            state.items.insert(item.id_typed(), item.clone());
        }
        state.loans.insert(loan.id_typed(), loan.clone());
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryLibraryStore {
    async fn get_account(&self, id: UserId) -> StoreResult<Option<StaffAccount>> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<StaffAccount>> {
        let email = email.trim();
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_accounts(&self) -> StoreResult<Vec<StaffAccount>> {
        let mut accounts: Vec<StaffAccount> = self.read()?.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(accounts)
    }

    async fn insert_account(&self, account: &StaffAccount) -> StoreResult<()> {
        let mut state = self.write()?;
        let taken = state
            .accounts
            .values()
            .any(|a| a.id == account.id || a.email.eq_ignore_ascii_case(&account.email));
        if taken {
            return Err(StoreError::Duplicate(format!("account {}", account.email)));
        }
        state.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update_account(
        &self,
        account: &StaffAccount,
        expected: ExpectedVersion,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        let actual = state
            .accounts
            .get(&account.id)
            .map(|a| a.version)
            .ok_or_else(|| StoreError::NotFound(format!("account {}", account.id)))?;
        check_version("account", expected, actual)?;
        let email_taken = state
            .accounts
            .values()
            .any(|a| a.id != account.id && a.email.eq_ignore_ascii_case(&account.email));
        if email_taken {
            return Err(StoreError::Duplicate(format!("account {}", account.email)));
        }
        state.accounts.insert(account.id, account.clone());
        Ok(())
    }
}
