//! Startup data: the primary administrator and, on an empty catalog, two demo records.

use chrono::{DateTime, Utc};
use tracing::info;

use shelfwise_catalog::{CatalogItem, CatalogItemDraft};
use shelfwise_core::{CatalogItemId, Clock};

use crate::services::{ServiceResult, StaffDirectory};
use crate::store::{CatalogRepository, LibraryStore};

fn demo_drafts(now: DateTime<Utc>) -> Vec<CatalogItemDraft> {
    vec![
        CatalogItemDraft {
            catalog_number: "001".to_string(),
            title: "El Principito".to_string(),
            author: "Antoine de Saint-Exupéry".to_string(),
            publisher: "Salamandra".to_string(),
            edition_year: Some(2008),
            quantity: 5,
            subjects: vec!["Literatura".to_string()],
            support_type: Some("Libro".to_string()),
            provenance: "Donación".to_string(),
            location: "Biblioteca".to_string(),
            grades: vec!["4°".to_string(), "5°".to_string(), "6°".to_string()],
            intake_date: Some(now),
            ..Default::default()
        },
        CatalogItemDraft {
            catalog_number: "002".to_string(),
            title: "Atlas Geográfico Escolar".to_string(),
            author: "Instituto Geográfico Nacional".to_string(),
            publisher: "IGN".to_string(),
            edition_year: Some(2019),
            quantity: 3,
            subjects: vec!["Geografía".to_string(), "Ciencias sociales".to_string()],
            support_type: Some("Mapa".to_string()),
            provenance: "Compra".to_string(),
            location: "Biblioteca".to_string(),
            grades: vec!["6°".to_string(), "7°".to_string()],
            intake_date: Some(now),
            ..Default::default()
        },
    ]
}

/// Ensure the primary administrator exists and, when `demo_catalog` is set
/// and the catalog is empty, insert the demo records. Returns how many
/// records were inserted.
pub async fn seed(
    store: &dyn LibraryStore,
    clock: &dyn Clock,
    staff: &StaffDirectory,
    demo_catalog: bool,
) -> ServiceResult<usize> {
    staff.ensure_primary_admin().await?;

    if !demo_catalog || store.count_items().await? > 0 {
        return Ok(0);
    }

    let now = clock.now();
    let items = demo_drafts(now)
        .into_iter()
        .map(|draft| CatalogItem::create(CatalogItemId::new(), draft, now))
        .collect::<Result<Vec<_>, _>>()?;
    store.insert_items(&items).await?;
    info!(count = items.len(), "demo catalog seeded");
    Ok(items.len())
}
