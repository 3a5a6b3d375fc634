//! Lazy metadata and artwork lookups for the current items.
//!
//! Every lookup is best effort: failures are logged and the item simply stays
//! less enriched until the next attempt.

mod asset_cache;
mod enricher;
mod itunes;
mod musicbrainz;
mod tmdb;

pub use asset_cache::{AssetCache, AssetFetcher, HttpAssetFetcher};
pub use enricher::{EnrichmentOutcome, Enricher};
pub use itunes::ItunesClient;
pub use musicbrainz::MusicBrainzClient;
pub use tmdb::TmdbClient;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// The subset of TMDB movie details the catalog keeps.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MovieDetails {
    pub overview: Option<String>,
    #[serde(rename = "runtime")]
    pub runtime_minutes: Option<i32>,
    pub poster_path: Option<String>,
    pub imdb_id: Option<String>,
    pub vote_average: Option<f64>,
}

#[async_trait]
pub trait MovieMetadataSource: Send + Sync {
    async fn fetch_details(&self, tmdb_id: i64) -> Result<MovieDetails>;
    /// YouTube key of the movie's trailer, official ones first.
    async fn fetch_trailer_key(&self, tmdb_id: i64) -> Result<Option<String>>;
    /// Full image URL for a poster path as returned by `fetch_details`.
    fn poster_url(&self, poster_path: &str) -> String;
}

#[async_trait]
pub trait CoverArtLookup: Send + Sync {
    /// MusicBrainz release-group id of the album, if one matches.
    async fn fetch_cover_art_id(&self, artist: &str, title: &str) -> Result<Option<String>>;
    /// Image URL of the release group's front cover.
    async fn fetch_cover_art_asset(&self, release_group_id: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait ArtworkSearch: Send + Sync {
    async fn search_artwork_url(&self, artist: &str, title: &str) -> Result<Option<String>>;
}
