//! MusicBrainz release-group search and Cover Art Archive lookups.
//!
//! MusicBrainz asks for at most one request per second, so searches are
//! serialized behind the last request instant.

use super::CoverArtLookup;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";
const COVER_ART_ARCHIVE_BASE: &str = "https://coverartarchive.org/release-group";

pub struct MusicBrainzClient {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Mutex<Instant>,
}

#[derive(Deserialize)]
struct ReleaseGroupSearchResponse {
    #[serde(rename = "release-groups", default)]
    release_groups: Vec<MbReleaseGroup>,
}

#[derive(Deserialize)]
struct MbReleaseGroup {
    id: String,
}

#[derive(Deserialize)]
struct CoverArtResponse {
    #[serde(default)]
    images: Vec<CoverArtImage>,
}

#[derive(Deserialize)]
struct CoverArtImage {
    image: Option<String>,
    #[serde(default)]
    front: bool,
    #[serde(default)]
    thumbnails: HashMap<String, String>,
}

/// Front image if flagged, else the first one; 500px thumb, then 250px, then the original.
fn pick_cover_url(response: CoverArtResponse) -> Option<String> {
    let mut images = response.images;
    let index = images.iter().position(|i| i.front).unwrap_or(0);
    if index >= images.len() {
        return None;
    }
    let mut image = images.swap_remove(index);
    image
        .thumbnails
        .remove("500")
        .or_else(|| image.thumbnails.remove("250"))
        .or(image.image)
}

fn release_group_query(artist: &str, title: &str) -> String {
    format!("artist:\"{}\" releasegroup:\"{}\"", artist, title)
}

impl MusicBrainzClient {
    pub fn new(user_agent: &str, min_interval: Duration, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create MusicBrainz HTTP client")?;

        Ok(Self {
            client,
            min_interval,
            // The monotonic clock may be younger than the interval right after boot.
            last_request: Mutex::new(
                Instant::now()
                    .checked_sub(min_interval)
                    .unwrap_or_else(Instant::now),
            ),
        })
    }

    /// Waits until `min_interval` has passed since the previous request.
    /// The lock is held while sleeping so concurrent callers queue up.
    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            tokio::time::sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }
}

#[async_trait]
impl CoverArtLookup for MusicBrainzClient {
    async fn fetch_cover_art_id(&self, artist: &str, title: &str) -> Result<Option<String>> {
        self.rate_limit().await;

        let url = format!(
            "{}/release-group/?query={}&fmt=json&limit=1",
            MUSICBRAINZ_API_BASE,
            urlencoding::encode(&release_group_query(artist, title))
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach MusicBrainz")?;

        if !response.status().is_success() {
            if response.status().as_u16() == 503 {
                // Rate limited, try again on the next enrichment
                debug!("MusicBrainz rate limited search for {} - {}", artist, title);
                return Ok(None);
            }
            bail!(
                "MusicBrainz search failed with status {}",
                response.status()
            );
        }

        let body: ReleaseGroupSearchResponse = response
            .json()
            .await
            .context("Failed to parse MusicBrainz search response")?;
        Ok(body.release_groups.into_iter().next().map(|rg| rg.id))
    }

    async fn fetch_cover_art_asset(&self, release_group_id: &str) -> Result<Option<String>> {
        let url = format!("{}/{}", COVER_ART_ARCHIVE_BASE, release_group_id);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to reach Cover Art Archive")?;

        if !response.status().is_success() {
            debug!(
                "No cover art for release group {} (status {})",
                release_group_id,
                response.status()
            );
            return Ok(None);
        }

        let body: CoverArtResponse = response
            .json()
            .await
            .context("Failed to parse Cover Art Archive response")?;
        Ok(pick_cover_url(body))
    }
}
