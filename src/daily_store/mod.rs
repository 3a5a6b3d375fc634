mod models;
mod schema;
mod sqlite_daily_store;

pub use models::*;
pub use schema::DAILY_VERSIONED_SCHEMAS;
pub use sqlite_daily_store::SqliteDailyStore;

use crate::catalog::{CatalogItem, Category, ItemId};
use anyhow::Result;
use std::collections::HashSet;
use thiserror::Error;

/// Typed store failures that callers may want to tell apart from I/O errors.
/// They travel inside `anyhow::Error` and can be recovered with `downcast_ref`.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("a recommendation slot already exists for {0}")]
    SlotAlreadyExists(Category),
    #[error("field {field} does not belong to {category} items")]
    FieldCategoryMismatch {
        field: &'static str,
        category: Category,
    },
}

/// The catalog tables. Read-mostly; only enrichment fields are ever updated.
pub trait ItemStore: Send + Sync {
    fn count(&self, category: Category) -> Result<usize>;
    fn fetch_by_id(&self, category: Category, id: ItemId) -> Result<Option<CatalogItem>>;
    /// Uniform pick among every id of `category` not in `excluding`.
    fn random_unseen(&self, category: Category, excluding: &HashSet<ItemId>)
        -> Result<Option<ItemId>>;
    /// Inserts the items whose ids are not present yet. Returns how many were inserted.
    fn insert_many(&self, items: &[CatalogItem]) -> Result<usize>;
    /// Overwrites one enrichment field of one item. Returns false if the item doesn't exist.
    fn apply_enrichment(&self, category: Category, id: ItemId, update: EnrichmentUpdate)
        -> Result<bool>;
    /// Like `apply_enrichment`, but only when the field is NULL or empty.
    fn fill_if_unset(&self, category: Category, id: ItemId, update: EnrichmentUpdate)
        -> Result<bool>;
    /// Clears the cached asset reference (poster path or cover art path).
    fn clear_asset_path(&self, category: Category, id: ItemId) -> Result<bool>;
    fn delete_all_items(&self, category: Category) -> Result<usize>;
}

/// Log of completed items. The only source of truth for what has been seen.
pub trait HistoryLedger: Send + Sync {
    fn append(&self, entry: &NewHistoryEntry) -> Result<i64>;
    /// Newest completion first; entries from the same day newest insert first.
    fn fetch_all(&self) -> Result<Vec<HistoryEntry>>;
    fn ids_completed_in(&self, category: Category) -> Result<HashSet<ItemId>>;
    fn count_in(&self, category: Category) -> Result<usize>;
    fn delete_by_id(&self, id: i64) -> Result<bool>;
    fn delete_all_history(&self) -> Result<usize>;
}

/// At most one current recommendation per category.
pub trait SlotStore: Send + Sync {
    fn find_slot(&self, category: Category) -> Result<Option<RecommendationSlot>>;
    /// Fails with [`StoreError::SlotAlreadyExists`] if the category already has a slot.
    fn create_slot(&self, slot: &RecommendationSlot) -> Result<()>;
    /// Points an existing slot at another item. Returns false if there is no slot.
    fn update_slot_item(&self, category: Category, item_id: ItemId) -> Result<bool>;
    fn delete_slot(&self, category: Category) -> Result<bool>;
    fn delete_all_slots(&self) -> Result<usize>;
}

/// The three stores behind one database, plus the operations that must touch
/// more than one of them atomically.
pub trait DailyStore: ItemStore + HistoryLedger + SlotStore {
    /// Appends the history entry and deletes the category's slot in one transaction.
    fn record_completion(&self, entry: &NewHistoryEntry) -> Result<i64>;
    /// Deletes all history and all slots in one transaction.
    fn reset_progress(&self) -> Result<()>;
}
