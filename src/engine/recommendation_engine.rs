use super::generation::{GenerationTracker, SlotChange, StaleGuard};
use super::progress::{progress_snapshot, Progress};
use super::{CompletionRequest, Rating, RecommendationError};
use crate::catalog::{CatalogItem, Category, ItemId};
use crate::daily_store::{DailyStore, HistoryEntry, NewHistoryEntry, RecommendationSlot};
use chrono::{Local, NaiveDate};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, info};

const SLOT_CHANGE_CAPACITY: usize = 16;

type EngineResult<T> = Result<T, RecommendationError>;

/// Picks, advances and skips the current item of each category.
///
/// Operations on the same category are serialized; the two categories never
/// block each other.
pub struct RecommendationEngine {
    store: Arc<dyn DailyStore>,
    generations: Arc<GenerationTracker>,
    op_locks: [Mutex<()>; 2],
    changes: broadcast::Sender<SlotChange>,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl RecommendationEngine {
    pub fn new(store: Arc<dyn DailyStore>) -> Self {
        let (changes, _) = broadcast::channel(SLOT_CHANGE_CAPACITY);
        Self {
            store,
            generations: Arc::new(GenerationTracker::new()),
            op_locks: [Mutex::new(()), Mutex::new(())],
            changes,
            today: local_today,
        }
    }

    /// Replaces the source of "today" used for completion dates.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn store(&self) -> Arc<dyn DailyStore> {
        self.store.clone()
    }

    pub fn generations(&self) -> Arc<GenerationTracker> {
        self.generations.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SlotChange> {
        self.changes.subscribe()
    }

    /// Captures the current generation of `category` for background work on `item_id`.
    pub fn guard(&self, category: Category, item_id: ItemId) -> StaleGuard {
        self.generations.guard(category, item_id)
    }

    fn slot_changed(&self, change: SlotChange) {
        match &change {
            SlotChange::Assigned { category, .. } | SlotChange::Cleared { category } => {
                self.generations.bump(*category);
            }
            SlotChange::Reset => {
                for category in Category::ALL {
                    self.generations.bump(category);
                }
            }
        }
        // Nobody listening is fine.
        let _ = self.changes.send(change);
    }

    fn resolve(&self, category: Category, id: ItemId) -> EngineResult<CatalogItem> {
        self.store
            .fetch_by_id(category, id)?
            .ok_or(RecommendationError::ItemNotFound { category, id })
    }

    /// The current item of `category`, assigning one if there is none yet.
    ///
    /// Repeated calls return the same item until it is completed or skipped.
    pub fn current(&self, category: Category) -> EngineResult<CatalogItem> {
        let _op = self.op_locks[category.index()].lock().unwrap();
        self.current_locked(category)
    }

    fn current_locked(&self, category: Category) -> EngineResult<CatalogItem> {
        let seen = self.store.ids_completed_in(category)?;

        if let Some(slot) = self.store.find_slot(category)? {
            if !seen.contains(&slot.item_id) {
                return self.resolve(category, slot.item_id);
            }
            // Left behind by a completion that never cleared its slot.
            debug!(
                "Discarding {} slot pointing at completed item {}",
                category, slot.item_id
            );
            self.store.delete_slot(category)?;
            self.slot_changed(SlotChange::Cleared { category });
        }

        let item_id = self
            .store
            .random_unseen(category, &seen)?
            .ok_or(RecommendationError::CategoryExhausted(category))?;
        self.store
            .create_slot(&RecommendationSlot::new(category, item_id))?;
        self.slot_changed(SlotChange::Assigned { category, item_id });
        info!("Assigned {} {} as current", category, item_id);

        self.resolve(category, item_id)
    }

    /// Records the completion and moves on to a fresh item.
    ///
    /// The history entry is kept even when no unseen item remains, in which
    /// case `CategoryExhausted` is returned.
    pub fn complete(
        &self,
        category: Category,
        request: CompletionRequest,
    ) -> EngineResult<CatalogItem> {
        let rating = request.rating.map(Rating::new).transpose()?;
        let notes = request
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let _op = self.op_locks[category.index()].lock().unwrap();
        let entry = NewHistoryEntry {
            category,
            item_id: request.item_id,
            date_completed: (self.today)(),
            rating: rating.map(|r| r.value()),
            notes,
            title: request.title,
            year: request.year,
            creator: request.creator,
        };
        let history_id = self.store.record_completion(&entry)?;
        self.slot_changed(SlotChange::Cleared { category });
        info!(
            "Completed {} {} (history entry {})",
            category, entry.item_id, history_id
        );

        self.current_locked(category)
    }

    /// Replaces the current item with another unseen one. Never touches the history.
    ///
    /// When the current item is the only unseen one left it is returned again.
    pub fn skip(&self, category: Category) -> EngineResult<CatalogItem> {
        let _op = self.op_locks[category.index()].lock().unwrap();

        let seen = self.store.ids_completed_in(category)?;
        let slot = self.store.find_slot(category)?;

        let mut excluding: HashSet<ItemId> = seen.clone();
        if let Some(slot) = &slot {
            excluding.insert(slot.item_id);
        }
        let item_id = match self.store.random_unseen(category, &excluding)? {
            Some(id) => id,
            None => self
                .store
                .random_unseen(category, &seen)?
                .ok_or(RecommendationError::CategoryExhausted(category))?,
        };

        match &slot {
            Some(_) => {
                self.store.update_slot_item(category, item_id)?;
            }
            None => {
                self.store
                    .create_slot(&RecommendationSlot::new(category, item_id))?;
            }
        }
        self.slot_changed(SlotChange::Assigned { category, item_id });
        info!(
            "Skipped {} {} -> {}",
            category,
            slot.map(|s| s.item_id.to_string())
                .unwrap_or_else(|| "none".to_string()),
            item_id
        );

        self.resolve(category, item_id)
    }

    /// Forgets all history and current items. The catalog itself is kept.
    pub fn reset_progress(&self) -> EngineResult<()> {
        let _movies = self.op_locks[Category::Movie.index()].lock().unwrap();
        let _albums = self.op_locks[Category::Album.index()].lock().unwrap();
        self.store.reset_progress()?;
        self.slot_changed(SlotChange::Reset);
        Ok(())
    }

    /// Deletes one history entry, making its item eligible again.
    pub fn forget_history_entry(&self, entry_id: i64) -> EngineResult<bool> {
        let deleted = self.store.delete_by_id(entry_id)?;
        if deleted {
            info!("Deleted history entry {}", entry_id);
        }
        Ok(deleted)
    }

    pub fn history(&self) -> EngineResult<Vec<HistoryEntry>> {
        Ok(self.store.fetch_all()?)
    }

    pub fn completed_count(&self, category: Category) -> EngineResult<usize> {
        Ok(self.store.count_in(category)?)
    }

    pub fn progress(&self) -> EngineResult<Progress> {
        Ok(progress_snapshot(self.store.as_ref())?)
    }
}
