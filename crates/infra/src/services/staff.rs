use std::sync::Arc;

use tracing::{info, instrument};

use shelfwise_auth::{Role, StaffAccount};
use shelfwise_core::{AggregateRoot, Clock, DomainError, DomainResult, ExpectedVersion, UserId};

use super::ServiceResult;
use crate::store::{LibraryStore, UserDirectory};

/// Staff account administration. The configured primary administrator is
/// never edited or locked through here.
#[derive(Clone)]
pub struct StaffDirectory {
    store: Arc<dyn LibraryStore>,
    clock: Arc<dyn Clock>,
    primary_admin_email: String,
}

impl StaffDirectory {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        clock: Arc<dyn Clock>,
        primary_admin_email: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            primary_admin_email: primary_admin_email.into(),
        }
    }

    pub fn primary_admin_email(&self) -> &str {
        &self.primary_admin_email
    }

    /// Create the primary administrator if it does not exist yet.
    pub async fn ensure_primary_admin(&self) -> ServiceResult<StaffAccount> {
        if let Some(existing) = self
            .store
            .find_account_by_email(&self.primary_admin_email)
            .await?
        {
            return Ok(existing);
        }
        let admin = StaffAccount::primary_admin(UserId::new(), &self.primary_admin_email, self.clock.now())?;
        self.store.insert_account(&admin).await?;
        info!(email = %admin.email, "primary administrator created");
        Ok(admin)
    }

    pub async fn list(&self) -> ServiceResult<Vec<StaffAccount>> {
        Ok(self.store.list_accounts().await?)
    }

    pub async fn get(&self, id: UserId) -> ServiceResult<StaffAccount> {
        self.find(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("account {id}")).into())
    }

    /// The directory entry for `id`, if one exists. Its roles and lock flag
    /// take precedence over whatever a token claims.
    pub async fn find(&self, id: UserId) -> ServiceResult<Option<StaffAccount>> {
        Ok(self.store.get_account(id).await?)
    }

    #[instrument(skip(self, display_name), fields(email = %email, role = %role), err)]
    pub async fn create(&self, email: &str, display_name: &str, role: Role) -> ServiceResult<StaffAccount> {
        let account = StaffAccount::create(UserId::new(), email, display_name, role, self.clock.now())?;
        self.store.insert_account(&account).await?;
        Ok(account)
    }

    pub async fn change_email(&self, id: UserId, email: &str) -> ServiceResult<StaffAccount> {
        self.mutate(id, |a, primary| a.change_email(email, primary)).await
    }

    pub async fn assign_role(&self, id: UserId, role: Role) -> ServiceResult<StaffAccount> {
        self.mutate(id, |a, primary| a.assign_role(role, primary)).await
    }

    pub async fn revoke_role(&self, id: UserId, role: &Role) -> ServiceResult<StaffAccount> {
        self.mutate(id, |a, primary| a.revoke_role(role, primary)).await
    }

    #[instrument(skip(self), fields(actor = %actor, account_id = %id), err)]
    pub async fn lock(&self, actor: UserId, id: UserId) -> ServiceResult<StaffAccount> {
        self.mutate(id, |a, primary| a.lock(actor, primary)).await
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    pub async fn unlock(&self, id: UserId) -> ServiceResult<StaffAccount> {
        self.mutate(id, |a, primary| a.unlock(primary)).await
    }

    async fn mutate<F>(&self, id: UserId, change: F) -> ServiceResult<StaffAccount>
    where
        F: FnOnce(&mut StaffAccount, &str) -> DomainResult<()>,
    {
        let mut account = self.get(id).await?;
        let stored = account.version();
        change(&mut account, &self.primary_admin_email)?;
        if account.version() != stored {
            self.store
                .update_account(&account, ExpectedVersion::Exact(stored))
                .await?;
        }
        Ok(account)
    }
}
