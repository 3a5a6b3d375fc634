//! Daily Picks Library
//!
//! One movie and one album from the "1001 before you die" lists at a time,
//! with completion history, progress and lazy metadata enrichment.

pub mod catalog;
pub mod config;
pub mod daily_store;
pub mod engine;
pub mod enrichment;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog::{CatalogItem, Category, ItemId};
pub use daily_store::{DailyStore, SqliteDailyStore};
pub use engine::{CompletionRequest, RecommendationEngine, RecommendationError};
