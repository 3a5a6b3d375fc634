use super::{ArtworkSearch, AssetCache, CoverArtLookup, MovieDetails, MovieMetadataSource};
use crate::catalog::{Album, CatalogItem, Category, Movie};
use crate::daily_store::{DailyStore, EnrichmentUpdate};
use crate::engine::{GenerationTracker, StaleGuard};
use std::sync::Arc;
use tracing::{debug, warn};

/// What one enrichment pass did.
#[derive(Debug, Default)]
pub struct EnrichmentOutcome {
    /// Fields written to the store, in order.
    pub applied: Vec<EnrichmentUpdate>,
    /// The asset path was dropped because its file is gone from the cache.
    pub cleared_asset: bool,
    /// Image bytes for display, when one could be loaded.
    pub image: Option<Arc<Vec<u8>>>,
    /// The slot moved on while lookups were in flight; the rest was dropped.
    pub stale: bool,
}

/// Fills enrichment fields of the current items from the external lookups.
pub struct Enricher {
    store: Arc<dyn DailyStore>,
    generations: Arc<GenerationTracker>,
    assets: Arc<AssetCache>,
    movies: Option<Arc<dyn MovieMetadataSource>>,
    artwork: Arc<dyn ArtworkSearch>,
    cover_art: Arc<dyn CoverArtLookup>,
}

impl Enricher {
    pub fn new(
        store: Arc<dyn DailyStore>,
        generations: Arc<GenerationTracker>,
        assets: Arc<AssetCache>,
        movies: Option<Arc<dyn MovieMetadataSource>>,
        artwork: Arc<dyn ArtworkSearch>,
        cover_art: Arc<dyn CoverArtLookup>,
    ) -> Self {
        Self {
            store,
            generations,
            assets,
            movies,
            artwork,
            cover_art,
        }
    }

    pub async fn enrich(&self, item: &CatalogItem, guard: StaleGuard) -> EnrichmentOutcome {
        match item {
            CatalogItem::Movie(movie) => self.enrich_movie(movie, guard).await,
            CatalogItem::Album(album) => self.enrich_album(album, guard).await,
        }
    }

    fn still_current(&self, guard: &StaleGuard, outcome: &mut EnrichmentOutcome) -> bool {
        if self.generations.is_current(guard) {
            return true;
        }
        if !outcome.stale {
            debug!(
                "Dropping enrichment of {} {}: slot changed",
                guard.category, guard.item_id
            );
        }
        outcome.stale = true;
        false
    }

    /// Writes one field if the guard still holds. Returns false once it is stale.
    fn write_back(
        &self,
        guard: &StaleGuard,
        update: EnrichmentUpdate,
        only_if_unset: bool,
        outcome: &mut EnrichmentOutcome,
    ) -> bool {
        if !self.still_current(guard, outcome) {
            return false;
        }
        let result = if only_if_unset {
            self.store
                .fill_if_unset(guard.category, guard.item_id, update.clone())
        } else {
            self.store
                .apply_enrichment(guard.category, guard.item_id, update.clone())
        };
        match result {
            Ok(true) => outcome.applied.push(update),
            Ok(false) => {}
            Err(e) => warn!(
                "Failed to store {} for {} {}: {:#}",
                update.column(),
                guard.category,
                guard.item_id,
                e
            ),
        }
        true
    }

    async fn load_image(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        match self.assets.get_or_fetch(url).await {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Failed to load image {}: {:#}", url, e);
                None
            }
        }
    }

    async fn enrich_movie(&self, movie: &Movie, guard: StaleGuard) -> EnrichmentOutcome {
        let mut outcome = EnrichmentOutcome::default();
        let Some(source) = self.movies.as_ref() else {
            debug!("No movie metadata source configured, skipping {}", movie.id);
            return outcome;
        };

        if let Some(poster_path) = movie.poster_path.as_deref().filter(|p| !p.is_empty()) {
            outcome.image = self.load_image(&source.poster_url(poster_path)).await;
            if !self.still_current(&guard, &mut outcome) {
                return outcome;
            }
            let Some(tmdb_id) = movie.tmdb_id else {
                return outcome;
            };

            if movie.trailer_key.is_none() {
                match source.fetch_trailer_key(tmdb_id).await {
                    Ok(Some(key)) => {
                        if !self.write_back(&guard, EnrichmentUpdate::TrailerKey(key), false, &mut outcome) {
                            return outcome;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Trailer lookup failed for movie {}: {:#}", movie.id, e),
                }
            }
            if movie.community_rating.is_none() {
                match source.fetch_details(tmdb_id).await {
                    Ok(details) => {
                        if let Some(rating) = details.vote_average.filter(|r| *r > 0.0) {
                            self.write_back(
                                &guard,
                                EnrichmentUpdate::CommunityRating(rating),
                                false,
                                &mut outcome,
                            );
                        }
                    }
                    Err(e) => warn!("Detail lookup failed for movie {}: {:#}", movie.id, e),
                }
            }
            return outcome;
        }

        let Some(tmdb_id) = movie.tmdb_id else {
            debug!("Movie {} has no TMDB id", movie.id);
            return outcome;
        };
        let (details, trailer) = tokio::join!(
            source.fetch_details(tmdb_id),
            source.fetch_trailer_key(tmdb_id)
        );
        let details: MovieDetails = match details {
            Ok(details) => details,
            Err(e) => {
                warn!("TMDB lookup failed for movie {}: {:#}", movie.id, e);
                return outcome;
            }
        };
        let trailer = trailer.unwrap_or_else(|e| {
            warn!("Trailer lookup failed for movie {}: {:#}", movie.id, e);
            None
        });
        if !self.still_current(&guard, &mut outcome) {
            return outcome;
        }

        if let Some(path) = details.poster_path.filter(|p| !p.is_empty()) {
            outcome.image = self.load_image(&source.poster_url(&path)).await;
            if !self.write_back(&guard, EnrichmentUpdate::PosterPath(path), false, &mut outcome) {
                return outcome;
            }
        }

        let mut pending = Vec::new();
        if let Some(imdb_id) = details.imdb_id.filter(|s| !s.is_empty()) {
            pending.push((EnrichmentUpdate::ImdbId(imdb_id), true));
        }
        if let Some(overview) = details.overview.filter(|s| !s.is_empty()) {
            pending.push((EnrichmentUpdate::Overview(overview), true));
        }
        if let Some(runtime) = details.runtime_minutes.filter(|r| *r > 0) {
            pending.push((EnrichmentUpdate::RuntimeMinutes(runtime), true));
        }
        if let Some(key) = trailer {
            pending.push((EnrichmentUpdate::TrailerKey(key), false));
        }
        if let Some(rating) = details.vote_average.filter(|r| *r > 0.0) {
            pending.push((EnrichmentUpdate::CommunityRating(rating), false));
        }
        for (update, only_if_unset) in pending {
            if !self.write_back(&guard, update, only_if_unset, &mut outcome) {
                break;
            }
        }
        outcome
    }

    /// Downloads `url` into the cache and records its file name as the cover.
    async fn store_cover(&self, url: &str, guard: &StaleGuard, outcome: &mut EnrichmentOutcome) {
        outcome.image = self.load_image(url).await;
        if let Some(filename) = self.assets.filename_if_cached(url) {
            self.write_back(guard, EnrichmentUpdate::CoverArtPath(filename), false, outcome);
        }
    }

    async fn enrich_album(&self, album: &Album, guard: StaleGuard) -> EnrichmentOutcome {
        let mut outcome = EnrichmentOutcome::default();

        if let Some(cover) = album.cover_art_path.as_deref().filter(|p| !p.is_empty()) {
            if self.assets.contains_file(cover) {
                match self.assets.read_file(cover).await {
                    Ok(data) => {
                        outcome.image = Some(Arc::new(data));
                        return outcome;
                    }
                    Err(e) => warn!("Cached cover for album {} unreadable: {:#}", album.id, e),
                }
            }
            if !self.still_current(&guard, &mut outcome) {
                return outcome;
            }
            debug!("Cover {} of album {} is gone, refetching", cover, album.id);
            match self.store.clear_asset_path(Category::Album, album.id) {
                Ok(_) => outcome.cleared_asset = true,
                Err(e) => warn!("Failed to clear cover of album {}: {:#}", album.id, e),
            }
        }

        match self.artwork.search_artwork_url(&album.artist, &album.title).await {
            Ok(Some(url)) => {
                if self.still_current(&guard, &mut outcome) {
                    self.store_cover(&url, &guard, &mut outcome).await;
                }
                return outcome;
            }
            Ok(None) => {}
            Err(e) => warn!("Artwork search failed for album {}: {:#}", album.id, e),
        }

        let release_group_id = match album.musicbrainz_id.clone().filter(|s| !s.is_empty()) {
            Some(id) => id,
            None => match self
                .cover_art
                .fetch_cover_art_id(&album.artist, &album.title)
                .await
            {
                Ok(Some(id)) => {
                    if !self.write_back(
                        &guard,
                        EnrichmentUpdate::MusicBrainzId(id.clone()),
                        false,
                        &mut outcome,
                    ) {
                        return outcome;
                    }
                    id
                }
                Ok(None) => {
                    debug!("No MusicBrainz release group for album {}", album.id);
                    return outcome;
                }
                Err(e) => {
                    warn!("MusicBrainz search failed for album {}: {:#}", album.id, e);
                    return outcome;
                }
            },
        };

        match self.cover_art.fetch_cover_art_asset(&release_group_id).await {
            Ok(Some(url)) => {
                if self.still_current(&guard, &mut outcome) {
                    self.store_cover(&url, &guard, &mut outcome).await;
                }
            }
            Ok(None) => debug!("No cover art for release group {}", release_group_id),
            Err(e) => warn!("Cover Art Archive lookup failed for album {}: {:#}", album.id, e),
        }
        outcome
    }
}
