//! Catalog domain module.
//!
//! Bibliographic records, their validation and text normalization, and the
//! inventory reconciler: the only code allowed to change on-hand quantity and
//! availability status. Pure domain logic (no IO, no HTTP, no storage).

pub mod filter;
pub mod item;
pub mod options;
pub mod provenance;
pub mod reconciler;
pub mod text;

#[cfg(test)]
pub(crate) mod testing;

pub use filter::{CatalogFilter, distinct_subjects};
pub use item::{
    CatalogItem, CatalogItemDraft, CatalogItemPatch, CatalogItemSnapshot, ItemStatus,
    MAX_QUANTITY,
};
pub use options::{CLASSROOMS, FormOptions, GRADE_LEVELS, SUPPORT_TYPES};
pub use provenance::Provenance;
pub use reconciler::{DeleteMode, DeletionPlan};
