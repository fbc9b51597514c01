use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::item::{CatalogItem, ItemStatus};
use crate::text::{canonical_tag, loosely_contains};

/// Catalog search criteria; every present field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub status: Option<ItemStatus>,
    pub min_quantity: Option<i64>,
}

impl CatalogFilter {
    pub fn matches(&self, item: &CatalogItem) -> bool {
        if let Some(title) = &self.title {
            if !loosely_contains(item.title(), title) {
                return false;
            }
        }
        if let Some(author) = &self.author {
            if !loosely_contains(item.author(), author) {
                return false;
            }
        }
        if let Some(subject) = self.subject.as_deref().map(canonical_tag) {
            if !subject.is_empty() && !item.subjects().contains(&subject) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if item.status() != status {
                return false;
            }
        }
        if let Some(min) = self.min_quantity {
            if item.quantity() < min {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, items: impl IntoIterator<Item = &'a CatalogItem>) -> Vec<&'a CatalogItem> {
        items.into_iter().filter(|i| self.matches(i)).collect()
    }
}

/// Sorted, de-duplicated subjects across the given items (for the subject picker).
pub fn distinct_subjects<'a>(items: impl IntoIterator<Item = &'a CatalogItem>) -> Vec<String> {
    items
        .into_iter()
        .flat_map(|i| i.subjects().iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::CatalogItemPatch;
    use crate::testing::item;

    fn atlas() -> CatalogItem {
        let mut it = item(0);
        it.revise(CatalogItemPatch {
            title: Some("Atlas Geográfico Escolar".to_string()),
            author: Some("Varios".to_string()),
            subjects: Some(vec!["Geografía".to_string(), "Ciencias sociales".to_string()]),
            ..Default::default()
        })
        .unwrap();
        it
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(CatalogFilter::default().matches(&item(0)));
    }

    #[test]
    fn subject_filter_uses_canonical_form() {
        let a = atlas();
        let filter = CatalogFilter {
            subject: Some("GEOGRAFIA".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&a));
        assert!(!filter.matches(&item(1)));
    }

    #[test]
    fn combined_filters_must_all_match() {
        let a = atlas();
        let filter = CatalogFilter {
            title: Some("atlas".to_string()),
            status: Some(ItemStatus::Available),
            ..Default::default()
        };
        assert!(!filter.matches(&a));

        let filter = CatalogFilter {
            title: Some("atlas".to_string()),
            status: Some(ItemStatus::OnLoan),
            min_quantity: Some(0),
            ..Default::default()
        };
        assert!(filter.matches(&a));
    }

    #[test]
    fn min_quantity_excludes_smaller_stock() {
        let filter = CatalogFilter {
            min_quantity: Some(3),
            ..Default::default()
        };
        let items = [item(2), item(3), item(7)];
        assert_eq!(filter.apply(items.iter()).len(), 2);
    }

    #[test]
    fn distinct_subjects_are_sorted_and_unique() {
        let items = [atlas(), item(1), item(2)];
        assert_eq!(
            distinct_subjects(items.iter()),
            vec!["Ciencias sociales", "Geografia", "Literatura"]
        );
    }
}
