//! Inventory reconciler.
//!
//! The single writer of `CatalogItem::quantity` and `CatalogItem::status`.
//! Checkout, return, partial deletion and quantity edits all funnel through
//! here so that `status == Available` iff `quantity > 0` always holds and the
//! quantity never goes negative. `MAX_QUANTITY` bounds edited and imported
//! quantities only; a returned copy always goes back on the shelf.

use serde::{Deserialize, Serialize};

use shelfwise_core::{DomainError, DomainResult};

use crate::item::{CatalogItem, ItemStatus, MAX_QUANTITY};

pub fn derive_status(quantity: i64) -> ItemStatus {
    if quantity > 0 {
        ItemStatus::Available
    } else {
        ItemStatus::OnLoan
    }
}

pub fn ensure_quantity_in_range(quantity: i64) -> DomainResult<()> {
    if (0..=MAX_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "quantity must be between 0 and {MAX_QUANTITY} (got {quantity})"
        )))
    }
}

/// Take one copy off the shelf (checkout, partial deletion).
pub fn decrement(item: &mut CatalogItem) -> DomainResult<()> {
    if item.quantity() <= 0 {
        return Err(DomainError::unavailable(format!(
            "no copies of \"{}\" on hand",
            item.title()
        )));
    }
    let quantity = item.quantity() - 1;
    item.write_stock(quantity, derive_status(quantity));
    Ok(())
}

/// Put one copy back (loan return). Never fails: the copy was counted when it left.
pub fn increment(item: &mut CatalogItem) {
    let quantity = item.quantity().saturating_add(1);
    item.write_stock(quantity, derive_status(quantity));
}

/// Set an absolute quantity (catalog edit).
pub fn restock(item: &mut CatalogItem, quantity: i64) -> DomainResult<()> {
    ensure_quantity_in_range(quantity)?;
    item.write_stock(quantity, derive_status(quantity));
    Ok(())
}

/// Deletion granularity requested by the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// Remove a single copy.
    One,
    /// Remove the whole record.
    All,
}

impl DeleteMode {
    pub fn parse(input: &str) -> DomainResult<Self> {
        match input.trim().to_lowercase().as_str() {
            "one" | "uno" => Ok(DeleteMode::One),
            "all" | "todas" => Ok(DeleteMode::All),
            other => Err(DomainError::validation(format!(
                "unknown delete mode: {other} (expected one or all)"
            ))),
        }
    }
}

/// What a deletion request turns into once open loans are taken into account.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeletionPlan {
    /// Drop one copy; the record stays.
    Decrement,
    /// Remove the record entirely.
    Remove,
}

/// Decide how to honour a deletion request.
///
/// Removing the record is refused while any loan against it is open. Removing
/// one copy of the last unit removes the record, under the same rule.
pub fn plan_deletion(
    item: &CatalogItem,
    mode: DeleteMode,
    open_loans: usize,
) -> DomainResult<DeletionPlan> {
    let removes_record = match mode {
        DeleteMode::All => true,
        DeleteMode::One => item.quantity() <= 1,
    };

    if !removes_record {
        return Ok(DeletionPlan::Decrement);
    }
    if open_loans > 0 {
        return Err(DomainError::conflict(format!(
            "\"{}\" has {open_loans} open loan(s); return them before deleting",
            item.title()
        )));
    }
    Ok(DeletionPlan::Remove)
}
