//! TMDB client for movie details, trailers and posters.

use super::{MovieDetails, MovieMetadataSource};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w342";

pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    results: Vec<TmdbVideo>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbVideo {
    key: String,
    site: String,
    #[serde(rename = "type")]
    kind: String,
    official: Option<bool>,
}

/// YouTube trailers only; an official one wins over the first listed.
fn pick_trailer_key(videos: Vec<TmdbVideo>) -> Option<String> {
    let trailers: Vec<TmdbVideo> = videos
        .into_iter()
        .filter(|v| v.site == "YouTube" && v.kind == "Trailer")
        .collect();
    trailers
        .iter()
        .find(|v| v.official == Some(true))
        .or_else(|| trailers.first())
        .map(|v| v.key.clone())
}

fn api_url(path: &str) -> String {
    format!("{}{}", TMDB_API_BASE, path)
}

impl TmdbClient {
    pub fn new(api_key: String, timeout_sec: u64) -> Result<Self> {
        if api_key.trim().is_empty() {
            bail!("TMDB API key is empty");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let url = api_url(path);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("Failed to reach TMDB for {}", path))?;

        if !response.status().is_success() {
            bail!("TMDB request {} failed with status {}", path, response.status());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse TMDB response for {}", path))
    }
}

#[async_trait]
impl MovieMetadataSource for TmdbClient {
    async fn fetch_details(&self, tmdb_id: i64) -> Result<MovieDetails> {
        self.get_json(&format!("/movie/{}", tmdb_id)).await
    }

    async fn fetch_trailer_key(&self, tmdb_id: i64) -> Result<Option<String>> {
        let videos: VideosResponse = self.get_json(&format!("/movie/{}/videos", tmdb_id)).await?;
        Ok(pick_trailer_key(videos.results))
    }

    fn poster_url(&self, poster_path: &str) -> String {
        format!("{}{}", TMDB_IMAGE_BASE, poster_path)
    }
}
