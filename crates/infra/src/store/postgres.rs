//! Postgres-backed library store.
//!
//! Versioned writes run in a transaction that first locks the target row
//! (`SELECT version ... FOR UPDATE`), compares it with the caller's
//! [`ExpectedVersion`], and only then writes. A checkout therefore either
//! stores both the decremented item and the new loan, or neither.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (serialization failure) | `40001` | `Concurrency` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / other | N/A | `Backend` |
//!
//! Set collections (subjects, grades, rooms, roles) are stored as JSONB.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use shelfwise_auth::{Role, StaffAccount};
use shelfwise_catalog::{CatalogItem, CatalogItemSnapshot, ItemStatus, Provenance};
use shelfwise_core::{AggregateRoot, CatalogItemId, ExpectedVersion, LoanId, UserId};
use shelfwise_loans::{BorrowerInfo, Loan, LoanSnapshot, LoanStatusFilter};

use super::{
    CatalogRepository, LedgerWrites, LoanRepository, StoreError, StoreResult, UserDirectory,
    check_version,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS catalog_items (
        id UUID PRIMARY KEY,
        catalog_number TEXT NOT NULL,
        title TEXT NOT NULL,
        author TEXT NOT NULL,
        publisher TEXT NOT NULL,
        edition_year INTEGER,
        quantity BIGINT NOT NULL CHECK (quantity >= 0),
        subjects JSONB NOT NULL,
        sub_subject TEXT,
        support_type TEXT,
        support_subtype TEXT,
        provenance TEXT NOT NULL,
        location TEXT NOT NULL,
        grades JSONB NOT NULL,
        rooms JSONB NOT NULL,
        intake_date TIMESTAMPTZ NOT NULL,
        retirement_date TIMESTAMPTZ,
        version BIGINT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS loans (
        id UUID PRIMARY KEY,
        item_id UUID NOT NULL,
        borrower_id UUID NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        grade TEXT NOT NULL,
        item_title TEXT NOT NULL,
        item_author TEXT NOT NULL,
        checked_out_at TIMESTAMPTZ NOT NULL,
        due_at TIMESTAMPTZ NOT NULL,
        returned_at TIMESTAMPTZ,
        closed BOOLEAN NOT NULL DEFAULT FALSE,
        version BIGINT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS loans_open_by_item ON loans (item_id) WHERE NOT closed",
    "CREATE INDEX IF NOT EXISTS loans_by_borrower ON loans (borrower_id)",
    r#"
    CREATE TABLE IF NOT EXISTS staff_accounts (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        roles JSONB NOT NULL,
        locked BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL,
        version BIGINT NOT NULL
    )
    "#,
];

const ITEM_COLUMNS: &str = "id, catalog_number, title, author, publisher, edition_year, quantity, \
     subjects, sub_subject, support_type, support_subtype, provenance, location, grades, rooms, \
     intake_date, retirement_date, version";

const LOAN_COLUMNS: &str = "id, item_id, borrower_id, first_name, last_name, grade, item_title, \
     item_author, checked_out_at, due_at, returned_at, closed, version";

const ACCOUNT_COLUMNS: &str = "id, email, display_name, roles, locked, created_at, version";

/// Postgres-backed store for items, loans and staff accounts.
#[derive(Debug, Clone)]
pub struct PostgresLibraryStore {
    pool: Arc<PgPool>,
}

impl PostgresLibraryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

async fn commit(tx: Transaction<'_, Postgres>) -> StoreResult<()> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

async fn rollback_with<T>(tx: Transaction<'_, Postgres>, err: StoreError) -> StoreResult<T> {
    tx.rollback()
        .await
        .map_err(|e| map_sqlx_error("rollback", e))?;
    Err(err)
}

/// Lock a row and return its stored version, or `None` if it does not exist.
async fn lock_version(
    tx: &mut Transaction<'_, Postgres>,
    table: &'static str,
    id: uuid::Uuid,
) -> StoreResult<Option<u64>> {
    let row = sqlx::query(&format!("SELECT version FROM {table} WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_version", e))?;
    row.map(|r| {
        r.try_get::<i64, _>("version")
            .map(|v| v as u64)
            .map_err(|e| map_sqlx_error("lock_version", e))
    })
    .transpose()
}

/// Lock the row, check its version, and fail the transaction on mismatch.
async fn guard_version(
    tx: &mut Transaction<'_, Postgres>,
    table: &'static str,
    what: &str,
    id: uuid::Uuid,
    expected: ExpectedVersion,
) -> StoreResult<()> {
    match lock_version(tx, table, id).await? {
        None => Err(StoreError::NotFound(format!("{what} {id}"))),
        Some(actual) => check_version(what, expected, actual),
    }
}

async fn count_open(
    tx: &mut Transaction<'_, Postgres>,
    item_id: CatalogItemId,
) -> StoreResult<usize> {
    let row = sqlx::query("SELECT COUNT(*) AS open FROM loans WHERE item_id = $1 AND NOT closed")
        .bind(item_id.as_uuid())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("count_open_loans", e))?;
    let open: i64 = row
        .try_get("open")
        .map_err(|e| map_sqlx_error("count_open_loans", e))?;
    Ok(open.max(0) as usize)
}

async fn insert_item_row(
    tx: &mut Transaction<'_, Postgres>,
    item: &CatalogItem,
) -> StoreResult<()> {
    let s = item.snapshot();
    sqlx::query(&format!(
        "INSERT INTO catalog_items ({ITEM_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
    ))
    .bind(s.id.as_uuid())
    .bind(&s.catalog_number)
    .bind(&s.title)
    .bind(&s.author)
    .bind(&s.publisher)
    .bind(s.edition_year)
    .bind(s.quantity)
    .bind(Json(&s.subjects))
    .bind(&s.sub_subject)
    .bind(&s.support_type)
    .bind(&s.support_subtype)
    .bind(s.provenance.label())
    .bind(&s.location)
    .bind(Json(&s.grades))
    .bind(Json(&s.rooms))
    .bind(s.intake_date)
    .bind(s.retirement_date)
    .bind(s.version as i64)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_item", e))?;
    Ok(())
}

async fn update_item_row(
    tx: &mut Transaction<'_, Postgres>,
    item: &CatalogItem,
) -> StoreResult<()> {
    let s = item.snapshot();
    sqlx::query(
        r#"
        UPDATE catalog_items SET
            catalog_number = $2,
            title = $3,
            author = $4,
            publisher = $5,
            edition_year = $6,
            quantity = $7,
            subjects = $8,
            sub_subject = $9,
            support_type = $10,
            support_subtype = $11,
            provenance = $12,
            location = $13,
            grades = $14,
            rooms = $15,
            intake_date = $16,
            retirement_date = $17,
            version = $18
        WHERE id = $1
        "#,
    )
    .bind(s.id.as_uuid())
    .bind(&s.catalog_number)
    .bind(&s.title)
    .bind(&s.author)
    .bind(&s.publisher)
    .bind(s.edition_year)
    .bind(s.quantity)
    .bind(Json(&s.subjects))
    .bind(&s.sub_subject)
    .bind(&s.support_type)
    .bind(&s.support_subtype)
    .bind(s.provenance.label())
    .bind(&s.location)
    .bind(Json(&s.grades))
    .bind(Json(&s.rooms))
    .bind(s.intake_date)
    .bind(s.retirement_date)
    .bind(s.version as i64)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("update_item", e))?;
    Ok(())
}

async fn insert_loan_row(tx: &mut Transaction<'_, Postgres>, loan: &Loan) -> StoreResult<()> {
    let s = loan.snapshot();
    sqlx::query(&format!(
        "INSERT INTO loans ({LOAN_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
    ))
    .bind(s.id.as_uuid())
    .bind(s.item_id.as_uuid())
    .bind(s.borrower_id.as_uuid())
    .bind(&s.borrower.first_name)
    .bind(&s.borrower.last_name)
    .bind(&s.borrower.grade)
    .bind(&s.item_title)
    .bind(&s.item_author)
    .bind(s.checked_out_at)
    .bind(s.due_at)
    .bind(s.returned_at)
    .bind(s.closed)
    .bind(s.version as i64)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_loan", e))?;
    Ok(())
}

async fn close_loan_row(tx: &mut Transaction<'_, Postgres>, loan: &Loan) -> StoreResult<()> {
    sqlx::query("UPDATE loans SET returned_at = $2, closed = $3, version = $4 WHERE id = $1")
        .bind(loan.id_typed().as_uuid())
        .bind(loan.returned_at())
        .bind(loan.is_closed())
        .bind(loan.version() as i64)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("close_loan", e))?;
    Ok(())
}

#[async_trait]
impl CatalogRepository for PostgresLibraryStore {
    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn get_item(&self, id: CatalogItemId) -> StoreResult<Option<CatalogItem>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_item", e))?;
        row.as_ref().map(item_from_row).transpose()
    }

    #[instrument(skip(self), fields(item_count = tracing::field::Empty), err)]
    async fn list_items(&self) -> StoreResult<Vec<CatalogItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items ORDER BY title ASC, id ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;
        Span::current().record("item_count", rows.len());
        rows.iter().map(item_from_row).collect()
    }

    async fn count_items(&self) -> StoreResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM catalog_items")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_items", e))?;
        let n: i64 = row.try_get("n").map_err(|e| map_sqlx_error("count_items", e))?;
        Ok(n.max(0) as usize)
    }

    async fn insert_item(&self, item: &CatalogItem) -> StoreResult<()> {
        self.insert_items(std::slice::from_ref(item)).await
    }

    #[instrument(skip(self, items), fields(item_count = items.len()), err)]
    async fn insert_items(&self, items: &[CatalogItem]) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        for item in items {
            insert_item_row(&mut tx, item).await?;
        }
        commit(tx).await
    }

    #[instrument(skip(self, item), fields(item_id = %item.id_typed(), expected = ?expected), err)]
    async fn update_item(&self, item: &CatalogItem, expected: ExpectedVersion) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let id = item.id_typed();
        if let Err(e) = guard_version(&mut tx, "catalog_items", "catalog item", *id.as_uuid(), expected).await {
            return rollback_with(tx, e).await;
        }
        update_item_row(&mut tx, item).await?;
        commit(tx).await
    }

    #[instrument(skip(self), fields(item_id = %id, expected = ?expected), err)]
    async fn remove_item(&self, id: CatalogItemId, expected: ExpectedVersion) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        if let Err(e) = guard_version(&mut tx, "catalog_items", "catalog item", *id.as_uuid(), expected).await {
            return rollback_with(tx, e).await;
        }
        let open = count_open(&mut tx, id).await?;
        if open > 0 {
            return rollback_with(
                tx,
                StoreError::Conflict(format!("catalog item {id} has {open} open loan(s)")),
            )
            .await;
        }
        sqlx::query("DELETE FROM catalog_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("remove_item", e))?;
        commit(tx).await
    }
}

#[async_trait]
impl LoanRepository for PostgresLibraryStore {
    #[instrument(skip(self), fields(loan_id = %id), err)]
    async fn get_loan(&self, id: LoanId) -> StoreResult<Option<Loan>> {
        let row = sqlx::query(&format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_loan", e))?;
        row.as_ref().map(loan_from_row).transpose()
    }

    #[instrument(skip(self), fields(loan_count = tracing::field::Empty), err)]
    async fn list_loans(&self, filter: LoanStatusFilter) -> StoreResult<Vec<Loan>> {
        let rows = sqlx::query(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans \
             WHERE ($1::BOOLEAN IS NULL OR closed = $1) \
             ORDER BY checked_out_at DESC, id DESC"
        ))
        .bind(closed_filter(filter))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_loans", e))?;
        Span::current().record("loan_count", rows.len());
        rows.iter().map(loan_from_row).collect()
    }

    #[instrument(skip(self), fields(borrower_id = %borrower_id), err)]
    async fn list_loans_for_borrower(
        &self,
        borrower_id: UserId,
        filter: LoanStatusFilter,
    ) -> StoreResult<Vec<Loan>> {
        let rows = sqlx::query(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans \
             WHERE borrower_id = $1 AND ($2::BOOLEAN IS NULL OR closed = $2) \
             ORDER BY checked_out_at DESC, id DESC"
        ))
        .bind(borrower_id.as_uuid())
        .bind(closed_filter(filter))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_loans_for_borrower", e))?;
        rows.iter().map(loan_from_row).collect()
    }

    async fn count_open_loans(&self, item_id: CatalogItemId) -> StoreResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS open FROM loans WHERE item_id = $1 AND NOT closed")
            .bind(item_id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_open_loans", e))?;
        let open: i64 = row
            .try_get("open")
            .map_err(|e| map_sqlx_error("count_open_loans", e))?;
        Ok(open.max(0) as usize)
    }
}

#[async_trait]
impl LedgerWrites for PostgresLibraryStore {
    #[instrument(
        skip(self, item, loan),
        fields(item_id = %item.id_typed(), loan_id = %loan.id_typed(), expected = ?expected_item),
        err
    )]
    async fn commit_checkout(
        &self,
        item: &CatalogItem,
        expected_item: ExpectedVersion,
        loan: &Loan,
    ) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let item_id = *item.id_typed().as_uuid();
        if let Err(e) = guard_version(&mut tx, "catalog_items", "catalog item", item_id, expected_item).await {
            return rollback_with(tx, e).await;
        }
        update_item_row(&mut tx, item).await?;
        insert_loan_row(&mut tx, loan).await?;
        commit(tx).await
    }

    #[instrument(
        skip(self, loan, item),
        fields(loan_id = %loan.id_typed(), expected = ?expected_loan),
        err
    )]
    async fn commit_return(
        &self,
        loan: &Loan,
        expected_loan: ExpectedVersion,
        item: Option<(&CatalogItem, ExpectedVersion)>,
    ) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let loan_id = *loan.id_typed().as_uuid();
        if let Err(e) = guard_version(&mut tx, "loans", "loan", loan_id, expected_loan).await {
            return rollback_with(tx, e).await;
        }
        if let Some((item, expected_item)) = item {
            let item_id = *item.id_typed().as_uuid();
            if let Err(e) = guard_version(&mut tx, "catalog_items", "catalog item", item_id, expected_item).await {
                return rollback_with(tx, e).await;
            }
            update_item_row(&mut tx, item).await?;
        }
        close_loan_row(&mut tx, loan).await?;
        commit(tx).await
    }
}

#[async_trait]
impl UserDirectory for PostgresLibraryStore {
    async fn get_account(&self, id: UserId) -> StoreResult<Option<StaffAccount>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM staff_accounts WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_account", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<StaffAccount>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM staff_accounts WHERE email = $1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_account_by_email", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn list_accounts(&self) -> StoreResult<Vec<StaffAccount>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM staff_accounts ORDER BY email ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_accounts", e))?;
        rows.iter().map(account_from_row).collect()
    }

    #[instrument(skip(self, account), fields(account_id = %account.id), err)]
    async fn insert_account(&self, account: &StaffAccount) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO staff_accounts ({ACCOUNT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(account.id.as_uuid())
        .bind(&account.email)
        .bind(&account.display_name)
        .bind(Json(&account.roles))
        .bind(account.locked)
        .bind(account.created_at)
        .bind(account.version as i64)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_account", e))?;
        Ok(())
    }

    #[instrument(skip(self, account), fields(account_id = %account.id, expected = ?expected), err)]
    async fn update_account(
        &self,
        account: &StaffAccount,
        expected: ExpectedVersion,
    ) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        if let Err(e) = guard_version(&mut tx, "staff_accounts", "account", *account.id.as_uuid(), expected).await {
            return rollback_with(tx, e).await;
        }
        sqlx::query(
            r#"
            UPDATE staff_accounts
            SET email = $2, display_name = $3, roles = $4, locked = $5, version = $6
            WHERE id = $1
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.email)
        .bind(&account.display_name)
        .bind(Json(&account.roles))
        .bind(account.locked)
        .bind(account.version as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_account", e))?;
        commit(tx).await
    }
}

fn closed_filter(filter: LoanStatusFilter) -> Option<bool> {
    match filter {
        LoanStatusFilter::All => None,
        LoanStatusFilter::Active => Some(false),
        LoanStatusFilter::Returned => Some(true),
    }
}

fn decode_error(operation: &str, err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row in {operation}: {err}"))
}

fn item_from_row(row: &PgRow) -> StoreResult<CatalogItem> {
    let get = |e| decode_error("catalog_items", e);
    let provenance: String = row.try_get("provenance").map_err(get)?;
    let provenance = Provenance::parse(&provenance)
        .map_err(|e| StoreError::Backend(format!("stored provenance is invalid: {e}")))?;
    let subjects: Json<BTreeSet<String>> = row.try_get("subjects").map_err(get)?;
    let grades: Json<BTreeSet<String>> = row.try_get("grades").map_err(get)?;
    let rooms: Json<BTreeSet<String>> = row.try_get("rooms").map_err(get)?;
    let version: i64 = row.try_get("version").map_err(get)?;

    Ok(CatalogItem::restore(CatalogItemSnapshot {
        id: CatalogItemId::from_uuid(row.try_get("id").map_err(get)?),
        catalog_number: row.try_get("catalog_number").map_err(get)?,
        title: row.try_get("title").map_err(get)?,
        author: row.try_get("author").map_err(get)?,
        publisher: row.try_get("publisher").map_err(get)?,
        edition_year: row.try_get("edition_year").map_err(get)?,
        quantity: row.try_get("quantity").map_err(get)?,
        subjects: subjects.0,
        sub_subject: row.try_get("sub_subject").map_err(get)?,
        support_type: row.try_get("support_type").map_err(get)?,
        support_subtype: row.try_get("support_subtype").map_err(get)?,
        provenance,
        location: row.try_get("location").map_err(get)?,
        grades: grades.0,
        rooms: rooms.0,
        // re-derived by `restore`
        status: ItemStatus::Available,
        intake_date: row.try_get("intake_date").map_err(get)?,
        retirement_date: row.try_get("retirement_date").map_err(get)?,
        version: version as u64,
    }))
}

fn loan_from_row(row: &PgRow) -> StoreResult<Loan> {
    let get = |e| decode_error("loans", e);
    let version: i64 = row.try_get("version").map_err(get)?;
    let returned_at: Option<DateTime<Utc>> = row.try_get("returned_at").map_err(get)?;

    Ok(Loan::restore(LoanSnapshot {
        id: LoanId::from_uuid(row.try_get("id").map_err(get)?),
        item_id: CatalogItemId::from_uuid(row.try_get("item_id").map_err(get)?),
        borrower_id: UserId::from_uuid(row.try_get("borrower_id").map_err(get)?),
        borrower: BorrowerInfo {
            first_name: row.try_get("first_name").map_err(get)?,
            last_name: row.try_get("last_name").map_err(get)?,
            grade: row.try_get("grade").map_err(get)?,
        },
        item_title: row.try_get("item_title").map_err(get)?,
        item_author: row.try_get("item_author").map_err(get)?,
        checked_out_at: row.try_get("checked_out_at").map_err(get)?,
        due_at: row.try_get("due_at").map_err(get)?,
        returned_at,
        closed: row.try_get("closed").map_err(get)?,
        version: version as u64,
    }))
}

fn account_from_row(row: &PgRow) -> StoreResult<StaffAccount> {
    let get = |e| decode_error("staff_accounts", e);
    let roles: Json<Vec<Role>> = row.try_get("roles").map_err(get)?;
    let version: i64 = row.try_get("version").map_err(get)?;

    Ok(StaffAccount {
        id: UserId::from_uuid(row.try_get("id").map_err(get)?),
        email: row.try_get("email").map_err(get)?,
        display_name: row.try_get("display_name").map_err(get)?,
        roles: roles.0,
        locked: row.try_get("locked").map_err(get)?,
        created_at: row.try_get("created_at").map_err(get)?,
        version: version as u64,
    })
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                Some("40001") => StoreError::Concurrency(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
