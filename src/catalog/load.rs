//! Loading of the bundled 1001-item lists and seeding of the item tables.

use super::models::{Album, Category, CatalogItem, Movie};
use crate::daily_store::{EnrichmentUpdate, ItemStore};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("seed file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse seed file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct SeedMovie {
    id: i64,
    title: String,
    year: i32,
    director: String,
    genre: String,
    tmdb_id: Option<i64>,
    imdb_id: Option<String>,
    overview: Option<String>,
    runtime_minutes: Option<i32>,
}

impl From<SeedMovie> for Movie {
    fn from(s: SeedMovie) -> Self {
        Movie {
            id: s.id,
            title: s.title,
            year: s.year,
            director: s.director,
            genre: s.genre,
            tmdb_id: s.tmdb_id,
            imdb_id: s.imdb_id,
            overview: s.overview,
            runtime_minutes: s.runtime_minutes,
            poster_path: None,
            trailer_key: None,
            community_rating: None,
        }
    }
}

#[derive(Deserialize)]
struct SeedAlbum {
    id: i64,
    title: String,
    year: i32,
    artist: String,
    genre: String,
    musicbrainz_id: Option<String>,
    description: Option<String>,
}

impl From<SeedAlbum> for Album {
    fn from(s: SeedAlbum) -> Self {
        Album {
            id: s.id,
            title: s.title,
            year: s.year,
            artist: s.artist,
            genre: s.genre,
            musicbrainz_id: s.musicbrainz_id,
            description: s.description,
            cover_art_path: None,
        }
    }
}

fn read_seed<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, SeedError> {
    if !path.exists() {
        return Err(SeedError::NotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads `movies_1001.json`. Enrichment fields always start unset.
pub fn load_movies(path: &Path) -> Result<Vec<Movie>, SeedError> {
    let raw: Vec<SeedMovie> = read_seed(path)?;
    Ok(raw.into_iter().map(Movie::from).collect())
}

/// Reads `albums_1001.json`. The cover art path always starts unset.
pub fn load_albums(path: &Path) -> Result<Vec<Album>, SeedError> {
    let raw: Vec<SeedAlbum> = read_seed(path)?;
    Ok(raw.into_iter().map(Album::from).collect())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub movies_inserted: usize,
    pub albums_inserted: usize,
    pub musicbrainz_ids_filled: usize,
    pub descriptions_filled: usize,
}

/// Inserts the bundled lists into the item store.
///
/// Rows already present are never touched apart from album fields that are
/// still unset (MusicBrainz id, description), which get backfilled from the
/// bundled data.
pub fn seed_catalog<S: ItemStore + ?Sized>(
    store: &S,
    movies_path: &Path,
    albums_path: &Path,
) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    let movies = load_movies(movies_path)?;
    let movie_count = store.count(Category::Movie)?;
    if movie_count < movies.len() {
        let items: Vec<CatalogItem> = movies.into_iter().map(CatalogItem::Movie).collect();
        report.movies_inserted = store
            .insert_many(&items)
            .context("Failed to insert seed movies")?;
        info!(
            "Seeded movies: {} -> {}",
            movie_count,
            movie_count + report.movies_inserted
        );
    } else {
        debug!("Movies already seeded ({} rows)", movie_count);
    }

    let albums = load_albums(albums_path)?;
    let album_count = store.count(Category::Album)?;
    if album_count < albums.len() {
        let items: Vec<CatalogItem> = albums.iter().cloned().map(CatalogItem::Album).collect();
        report.albums_inserted = store
            .insert_many(&items)
            .context("Failed to insert seed albums")?;
        info!(
            "Seeded albums: {} -> {}",
            album_count,
            album_count + report.albums_inserted
        );
    }

    // A freshly inserted row already carries the bundled values, so the
    // backfill only changes rows that predate them.
    for album in &albums {
        if let Some(mbid) = album.musicbrainz_id.as_ref().filter(|s| !s.is_empty()) {
            if store.fill_if_unset(
                Category::Album,
                album.id,
                EnrichmentUpdate::MusicBrainzId(mbid.clone()),
            )? {
                report.musicbrainz_ids_filled += 1;
            }
        }
        if let Some(description) = album.description.as_ref().filter(|s| !s.is_empty()) {
            if store.fill_if_unset(
                Category::Album,
                album.id,
                EnrichmentUpdate::Description(description.clone()),
            )? {
                report.descriptions_filled += 1;
            }
        }
    }
    if report.musicbrainz_ids_filled > 0 || report.descriptions_filled > 0 {
        info!(
            "Backfilled {} MusicBrainz ids and {} descriptions",
            report.musicbrainz_ids_filled, report.descriptions_filled
        );
    }

    Ok(report)
}

/// Runs [`seed_catalog`] as part of startup. Failures are logged and the
/// catalog is left as it was.
pub fn seed_on_launch<S: ItemStore + ?Sized>(
    store: &S,
    movies_path: &Path,
    albums_path: &Path,
) -> Option<SeedReport> {
    match seed_catalog(store, movies_path, albums_path) {
        Ok(report) => Some(report),
        Err(e) => {
            warn!("Catalog seeding skipped: {:#}", e);
            None
        }
    }
}
