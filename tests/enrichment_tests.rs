//! Enrichment of the current items through the engine, with in-process lookups.

mod common;

use anyhow::Result;
use async_trait::async_trait;
use common::TestEnv;
use daily_picks::daily_store::{EnrichmentUpdate, ItemStore};
use daily_picks::enrichment::{
    ArtworkSearch, AssetCache, AssetFetcher, CoverArtLookup, Enricher, MovieDetails,
    MovieMetadataSource,
};
use daily_picks::{CatalogItem, Category};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingFetcher {
    urls: Mutex<Vec<String>>,
}

#[async_trait]
impl AssetFetcher for RecordingFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(b"\x89PNG fake image".to_vec())
    }
}

struct Tmdb;

#[async_trait]
impl MovieMetadataSource for Tmdb {
    async fn fetch_details(&self, _tmdb_id: i64) -> Result<MovieDetails> {
        Ok(MovieDetails {
            overview: Some("A film.".to_string()),
            runtime_minutes: Some(101),
            poster_path: Some("/poster.jpg".to_string()),
            imdb_id: Some("tt0000001".to_string()),
            vote_average: Some(7.9),
        })
    }

    async fn fetch_trailer_key(&self, _tmdb_id: i64) -> Result<Option<String>> {
        Ok(Some("yt-key".to_string()))
    }

    fn poster_url(&self, poster_path: &str) -> String {
        format!("https://images.test/w342{}", poster_path)
    }
}

struct NoArtwork;

#[async_trait]
impl ArtworkSearch for NoArtwork {
    async fn search_artwork_url(&self, _artist: &str, _title: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

struct CoverArt;

#[async_trait]
impl CoverArtLookup for CoverArt {
    async fn fetch_cover_art_id(&self, artist: &str, _title: &str) -> Result<Option<String>> {
        Ok(Some(format!("rg-{}", artist.replace(' ', "-"))))
    }

    async fn fetch_cover_art_asset(&self, release_group_id: &str) -> Result<Option<String>> {
        Ok(Some(format!("https://covers.test/{}/front", release_group_id)))
    }
}

fn enricher_for(env: &TestEnv, fetcher: Arc<RecordingFetcher>) -> (Enricher, Arc<AssetCache>) {
    let assets = Arc::new(
        AssetCache::new(env.dir.path().join("image_cache"), fetcher, 10, 1024 * 1024).unwrap(),
    );
    let enricher = Enricher::new(
        env.engine.store(),
        env.engine.generations(),
        assets.clone(),
        Some(Arc::new(Tmdb)),
        Arc::new(NoArtwork),
        Arc::new(CoverArt),
    );
    (enricher, assets)
}

#[tokio::test]
async fn test_movie_enrichment_fills_the_current_movie() {
    let env = TestEnv::seeded(3, 1);
    let fetcher = Arc::new(RecordingFetcher::default());
    let (enricher, _assets) = enricher_for(&env, fetcher.clone());

    let movie = env.engine.current(Category::Movie).unwrap();
    let outcome = enricher
        .enrich(&movie, env.engine.guard(Category::Movie, movie.id()))
        .await;

    assert!(!outcome.stale);
    assert!(outcome.image.is_some());
    assert!(outcome
        .applied
        .contains(&EnrichmentUpdate::PosterPath("/poster.jpg".to_string())));
    assert_eq!(
        fetcher.urls.lock().unwrap().as_slice(),
        ["https://images.test/w342/poster.jpg"]
    );

    let stored = env.engine.current(Category::Movie).unwrap();
    let stored = stored.as_movie().unwrap();
    assert_eq!(stored.overview.as_deref(), Some("A film."));
    assert_eq!(stored.runtime_minutes, Some(101));
    assert_eq!(stored.imdb_id.as_deref(), Some("tt0000001"));
    assert_eq!(stored.trailer_key.as_deref(), Some("yt-key"));
    assert_eq!(stored.community_rating, Some(7.9));
}

#[tokio::test]
async fn test_album_cover_is_cached_and_refetched_when_missing() {
    let env = TestEnv::seeded(1, 3);
    let fetcher = Arc::new(RecordingFetcher::default());
    let (enricher, assets) = enricher_for(&env, fetcher.clone());

    let album = env.engine.current(Category::Album).unwrap();
    let outcome = enricher
        .enrich(&album, env.engine.guard(Category::Album, album.id()))
        .await;
    assert!(outcome.image.is_some());

    let stored = env.store.fetch_by_id(Category::Album, album.id()).unwrap().unwrap();
    let stored = stored.as_album().unwrap();
    let expected_id = format!("rg-{}", album.creator().replace(' ', "-"));
    assert_eq!(stored.musicbrainz_id.as_deref(), Some(expected_id.as_str()));
    let cover = stored.cover_art_path.clone().unwrap();
    assert!(assets.contains_file(&cover));

    // A cached cover is served without any lookup.
    let outcome = enricher
        .enrich(
            &CatalogItem::Album(stored.clone()),
            env.engine.guard(Category::Album, album.id()),
        )
        .await;
    assert!(outcome.applied.is_empty());
    assert!(outcome.image.is_some());
    assert_eq!(fetcher.urls.lock().unwrap().len(), 1);

    // Once the file is gone the reference is dropped and the cover downloaded again.
    assets.clear_all().await.unwrap();
    let outcome = enricher
        .enrich(
            &CatalogItem::Album(stored.clone()),
            env.engine.guard(Category::Album, album.id()),
        )
        .await;
    assert!(outcome.cleared_asset);
    assert_eq!(fetcher.urls.lock().unwrap().len(), 2);
    let refetched = env.store.fetch_by_id(Category::Album, album.id()).unwrap().unwrap();
    assert_eq!(refetched.as_album().unwrap().cover_art_path, Some(cover));
}

#[tokio::test]
async fn test_enrichment_is_dropped_once_the_slot_moves_on() {
    let env = TestEnv::seeded(4, 1);
    let fetcher = Arc::new(RecordingFetcher::default());
    let (enricher, _assets) = enricher_for(&env, fetcher);

    let movie = env.engine.current(Category::Movie).unwrap();
    let guard = env.engine.guard(Category::Movie, movie.id());
    env.engine.skip(Category::Movie).unwrap();

    let outcome = enricher.enrich(&movie, guard).await;
    assert!(outcome.stale);
    assert!(outcome.applied.is_empty());

    let untouched = env.store.fetch_by_id(Category::Movie, movie.id()).unwrap().unwrap();
    let untouched = untouched.as_movie().unwrap();
    assert!(untouched.poster_path.is_none());
    assert!(untouched.trailer_key.is_none());
}
