//! Fixtures shared by the catalog unit tests.

use chrono::Utc;
use shelfwise_core::CatalogItemId;

use crate::item::{CatalogItem, CatalogItemDraft};

pub(crate) fn draft(quantity: i64) -> CatalogItemDraft {
    CatalogItemDraft {
        catalog_number: "A-001".to_string(),
        title: "el principito".to_string(),
        author: "Antoine de Saint-Exupéry".to_string(),
        publisher: "Salamandra".to_string(),
        edition_year: Some(1943),
        quantity,
        subjects: vec!["Literatura".to_string(), "LITERATURA".to_string()],
        sub_subject: None,
        support_type: Some("libro".to_string()),
        support_subtype: None,
        provenance: "Donación".to_string(),
        location: "Biblioteca".to_string(),
        grades: vec!["5°".to_string(), "6°".to_string()],
        rooms: vec![],
        intake_date: None,
        retirement_date: None,
    }
}

pub(crate) fn item(quantity: i64) -> CatalogItem {
    CatalogItem::create(CatalogItemId::new(), draft(quantity), Utc::now()).unwrap()
}
