use crate::catalog::{Category, ItemId};
use chrono::{DateTime, NaiveDate, Utc};

/// Format of `history.date_completed`: the local calendar day.
pub const COMPLETION_DATE_FORMAT: &str = "%Y-%m-%d";

/// One completed item, with a snapshot of its identity at completion time.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub category: Category,
    pub item_id: ItemId,
    pub date_completed: NaiveDate,
    /// Half-star rating in 0.5..=5.0, or unset.
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub title: String,
    pub year: i32,
    /// Director or artist.
    pub creator: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    pub category: Category,
    pub item_id: ItemId,
    pub date_completed: NaiveDate,
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub title: String,
    pub year: i32,
    pub creator: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationSlot {
    pub category: Category,
    pub item_id: ItemId,
    pub assigned_at: DateTime<Utc>,
}

impl RecommendationSlot {
    pub fn new(category: Category, item_id: ItemId) -> Self {
        Self {
            category,
            item_id,
            assigned_at: Utc::now(),
        }
    }
}

/// A single enrichment field write, scoped to one item.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentUpdate {
    PosterPath(String),
    CommunityRating(f64),
    TrailerKey(String),
    Overview(String),
    ImdbId(String),
    RuntimeMinutes(i32),
    CoverArtPath(String),
    MusicBrainzId(String),
    Description(String),
}

impl EnrichmentUpdate {
    /// Category whose table holds the field.
    pub fn category(&self) -> Category {
        match self {
            EnrichmentUpdate::PosterPath(_)
            | EnrichmentUpdate::CommunityRating(_)
            | EnrichmentUpdate::TrailerKey(_)
            | EnrichmentUpdate::Overview(_)
            | EnrichmentUpdate::ImdbId(_)
            | EnrichmentUpdate::RuntimeMinutes(_) => Category::Movie,
            EnrichmentUpdate::CoverArtPath(_)
            | EnrichmentUpdate::MusicBrainzId(_)
            | EnrichmentUpdate::Description(_) => Category::Album,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            EnrichmentUpdate::PosterPath(_) => "poster_path",
            EnrichmentUpdate::CommunityRating(_) => "community_rating",
            EnrichmentUpdate::TrailerKey(_) => "trailer_key",
            EnrichmentUpdate::Overview(_) => "overview",
            EnrichmentUpdate::ImdbId(_) => "imdb_id",
            EnrichmentUpdate::RuntimeMinutes(_) => "runtime_minutes",
            EnrichmentUpdate::CoverArtPath(_) => "cover_art_path",
            EnrichmentUpdate::MusicBrainzId(_) => "musicbrainz_id",
            EnrichmentUpdate::Description(_) => "description",
        }
    }

    pub(crate) fn value(&self) -> rusqlite::types::Value {
        use rusqlite::types::Value;
        match self {
            EnrichmentUpdate::CommunityRating(v) => Value::Real(*v),
            EnrichmentUpdate::RuntimeMinutes(v) => Value::Integer(*v as i64),
            EnrichmentUpdate::PosterPath(s)
            | EnrichmentUpdate::TrailerKey(s)
            | EnrichmentUpdate::Overview(s)
            | EnrichmentUpdate::ImdbId(s)
            | EnrichmentUpdate::CoverArtPath(s)
            | EnrichmentUpdate::MusicBrainzId(s)
            | EnrichmentUpdate::Description(s) => Value::Text(s.clone()),
        }
    }
}
