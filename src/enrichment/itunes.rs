use super::ArtworkSearch;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const ITUNES_SEARCH_URL: &str = "https://itunes.apple.com/search";

/// iTunes Search API. No key and no rate limit, so it is tried before MusicBrainz.
pub struct ItunesClient {
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    artwork_url100: Option<String>,
}

fn upscale_artwork(url: &str) -> String {
    url.replace("100x100bb", "500x500bb")
}

impl ItunesClient {
    pub fn new(timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create iTunes HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArtworkSearch for ItunesClient {
    async fn search_artwork_url(&self, artist: &str, title: &str) -> Result<Option<String>> {
        let term = format!("{} {}", artist, title);
        let response = self
            .client
            .get(ITUNES_SEARCH_URL)
            .query(&[("term", term.as_str()), ("entity", "album"), ("limit", "1")])
            .send()
            .await
            .context("Failed to reach iTunes search")?;

        if !response.status().is_success() {
            debug!("iTunes search for {} returned {}", term, response.status());
            return Ok(None);
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse iTunes search response")?;
        Ok(body
            .results
            .into_iter()
            .next()
            .and_then(|r| r.artwork_url100)
            .map(|url| upscale_artwork(&url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artwork_is_upscaled_to_500px() {
        assert_eq!(
            upscale_artwork("https://is1.mzstatic.com/image/thumb/x/100x100bb.jpg"),
            "https://is1.mzstatic.com/image/thumb/x/500x500bb.jpg"
        );
        assert_eq!(upscale_artwork("https://a/b.jpg"), "https://a/b.jpg");
    }

    #[test]
    fn parses_search_results() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"resultCount": 1, "results": [{"collectionName": "Kind of Blue", "artworkUrl100": "https://x/100x100bb.jpg"}]}"#,
        )
        .unwrap();
        assert_eq!(
            body.results[0].artwork_url100.as_deref(),
            Some("https://x/100x100bb.jpg")
        );
    }
}
