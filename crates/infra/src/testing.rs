//! Fixtures shared by the service tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use shelfwise_catalog::CatalogItemDraft;
use shelfwise_core::FixedClock;
use shelfwise_loans::BorrowerInfo;

pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap()
}

pub(crate) fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(fixed_now()))
}

pub(crate) fn draft(title: &str, quantity: i64) -> CatalogItemDraft {
    CatalogItemDraft {
        catalog_number: "C-100".to_string(),
        title: title.to_string(),
        author: "Quino".to_string(),
        publisher: "Ediciones de la Flor".to_string(),
        edition_year: Some(1993),
        quantity,
        subjects: vec!["Literatura".to_string()],
        provenance: "Compra".to_string(),
        location: "Biblioteca".to_string(),
        grades: vec!["4°".to_string()],
        ..Default::default()
    }
}

pub(crate) fn borrower() -> BorrowerInfo {
    BorrowerInfo {
        first_name: "  maría  ".to_string(),
        last_name: "GONZÁLEZ".to_string(),
        grade: "4°".to_string(),
    }
}
