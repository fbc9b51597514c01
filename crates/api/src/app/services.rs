//! Composition root: stores, clock, receipt archive and services, built once
//! from [`AppConfig`] and shared by every handler.

use std::sync::Arc;

use thiserror::Error;

use shelfwise_core::{Clock, SystemClock};
use shelfwise_infra::{
    AppConfig, CatalogService, FileReceiptArchive, InMemoryLibraryStore, LibraryStore, LoanLedger,
    PostgresLibraryStore, ReportAggregator, ServiceError, StaffDirectory, StoreError, seed::seed,
};
use shelfwise_loans::LoanPolicy;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("storage backend unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("startup seeding failed: {0}")]
    Seed(#[from] ServiceError),
}

/// Everything a handler may need, injected at startup.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: CatalogService,
    pub ledger: LoanLedger,
    pub reports: ReportAggregator,
    pub staff: StaffDirectory,
    pub clock: Arc<dyn Clock>,
}

impl AppServices {
    /// Wire services over `store` and seed it.
    pub async fn new(
        config: &AppConfig,
        store: Arc<dyn LibraryStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StartupError> {
        let receipts = Arc::new(FileReceiptArchive::new(config.receipts_dir.clone()));
        let staff = StaffDirectory::new(store.clone(), clock.clone(), config.primary_admin_email.clone());

        let seeded = seed(store.as_ref(), clock.as_ref(), &staff, config.seed_demo_data).await?;
        if seeded > 0 {
            tracing::info!(seeded, "demo data inserted");
        }

        Ok(Self {
            catalog: CatalogService::new(store.clone(), clock.clone()),
            ledger: LoanLedger::new(
                store.clone(),
                clock.clone(),
                receipts,
                LoanPolicy::days(config.loan_period_days),
            ),
            reports: ReportAggregator::new(store, clock.clone()),
            staff,
            clock,
        })
    }
}

/// Pick the store from configuration: Postgres when persistent stores are enabled,
/// otherwise in-memory.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let store: Arc<dyn LibraryStore> = match &config.database_url {
        Some(url) => {
            let pg = PostgresLibraryStore::connect(url).await?;
            pg.ensure_schema().await?;
            tracing::info!("using postgres-backed library store");
            Arc::new(pg)
        }
        None => {
            tracing::info!("using in-memory library store");
            InMemoryLibraryStore::arc()
        }
    };

    AppServices::new(config, store, Arc::new(SystemClock)).await
}
