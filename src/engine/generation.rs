use crate::catalog::{Category, ItemId};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-category counter bumped on every slot change (create, update, delete, reset).
#[derive(Debug, Default)]
pub struct GenerationTracker {
    counters: [AtomicU64; 2],
}

/// Snapshot of which item was current, and at which generation, when some
/// background work started. Results are only written back while it still holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleGuard {
    pub category: Category,
    pub item_id: ItemId,
    generation: u64,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, category: Category) -> u64 {
        self.counters[category.index()].load(Ordering::SeqCst)
    }

    /// Returns the new generation.
    pub fn bump(&self, category: Category) -> u64 {
        self.counters[category.index()].fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn guard(&self, category: Category, item_id: ItemId) -> StaleGuard {
        StaleGuard {
            category,
            item_id,
            generation: self.current(category),
        }
    }

    pub fn is_current(&self, guard: &StaleGuard) -> bool {
        self.current(guard.category) == guard.generation
    }
}

/// Published on every slot change so that a front end can re-query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotChange {
    Assigned { category: Category, item_id: ItemId },
    Cleared { category: Category },
    Reset,
}
