mod generation;
mod progress;
mod recommendation_engine;

pub use generation::{GenerationTracker, SlotChange, StaleGuard};
pub use progress::{completed_count, progress_snapshot, CategoryProgress, Progress};
pub use recommendation_engine::RecommendationEngine;

use crate::catalog::{CatalogItem, Category, ItemId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecommendationError {
    /// Every item of the category is in the history. Not a failure.
    #[error("every {0} has been completed")]
    CategoryExhausted(Category),
    #[error("{category} {id} is not in the catalog")]
    ItemNotFound { category: Category, id: ItemId },
    #[error("invalid rating {0}: expected 0.5 to 5.0 in steps of 0.5")]
    InvalidRating(f64),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Half-star rating in `0.5..=5.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Rating(f64);

impl Rating {
    pub fn new(value: f64) -> Result<Self, RecommendationError> {
        let in_range = (0.5..=5.0).contains(&value);
        if !in_range || (value * 2.0).fract() != 0.0 {
            return Err(RecommendationError::InvalidRating(value));
        }
        Ok(Rating(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// What the user submits when marking the current item as done.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub item_id: ItemId,
    pub title: String,
    pub year: i32,
    pub creator: String,
    pub rating: Option<f64>,
    pub notes: Option<String>,
}

impl CompletionRequest {
    /// A request carrying the item's identity snapshot and no rating or notes.
    pub fn for_item(item: &CatalogItem) -> Self {
        Self {
            item_id: item.id(),
            title: item.title().to_string(),
            year: item.year(),
            creator: item.creator().to_string(),
            rating: None,
            notes: None,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_accepts_half_steps_in_range() {
        for value in [0.5, 1.0, 2.5, 4.5, 5.0] {
            assert_eq!(Rating::new(value).unwrap().value(), value);
        }
    }

    #[test]
    fn rating_rejects_everything_else() {
        for value in [0.0, 0.3, 2.25, 5.5, -1.0, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(Rating::new(value), Err(RecommendationError::InvalidRating(_))),
                "{} should be rejected",
                value
            );
        }
    }
}
