use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Stable catalog identifier, assigned at seed time (1..=1001 per category).
pub type ItemId = i64;

/// The two independent lists a recommendation can be drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Movie,
    Album,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Movie, Category::Album];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Movie => "movie",
            Category::Album => "album",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(Category::Movie),
            "album" => Some(Category::Album),
            _ => None,
        }
    }

    /// Fixed logical key of the category's recommendation slot. Not a date:
    /// the recommendation survives restarts until the user acts on it.
    pub fn slot_key(&self) -> &'static str {
        match self {
            Category::Movie => "current_movie",
            Category::Album => "current_album",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Category::Movie => 0,
            Category::Album => 1,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: ItemId,
    pub title: String,
    pub year: i32,
    pub director: String,
    pub genre: String,
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub overview: Option<String>,
    pub runtime_minutes: Option<i32>,
    /// TMDB poster path (e.g. "/abc.jpg"), filled after the first detail lookup.
    pub poster_path: Option<String>,
    /// YouTube video key of the trailer.
    pub trailer_key: Option<String>,
    /// TMDB community vote average, 0-10.
    pub community_rating: Option<f64>,
}

impl Movie {
    /// Direct YouTube link when the trailer key is known, a YouTube search otherwise.
    pub fn trailer_url(&self) -> String {
        match self.trailer_key.as_deref() {
            Some(key) if !key.is_empty() => format!("https://www.youtube.com/watch?v={}", key),
            _ => format!(
                "https://www.youtube.com/results?search_query={}",
                urlencoding::encode(&format!("{} {} official trailer", self.title, self.year))
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: ItemId,
    pub title: String,
    pub year: i32,
    pub artist: String,
    pub genre: String,
    /// MusicBrainz release-group id.
    pub musicbrainz_id: Option<String>,
    pub description: Option<String>,
    /// File name inside the image cache directory.
    pub cover_art_path: Option<String>,
}

impl Album {
    /// Spotify deep link that opens a search for this album.
    pub fn spotify_search_uri(&self) -> String {
        let query = format!("album:\"{}\" artist:\"{}\"", self.title, self.artist);
        format!("spotify:search:{}", urlencoding::encode(&query))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum CatalogItem {
    Movie(Movie),
    Album(Album),
}

impl CatalogItem {
    pub fn category(&self) -> Category {
        match self {
            CatalogItem::Movie(_) => Category::Movie,
            CatalogItem::Album(_) => Category::Album,
        }
    }

    pub fn id(&self) -> ItemId {
        match self {
            CatalogItem::Movie(m) => m.id,
            CatalogItem::Album(a) => a.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CatalogItem::Movie(m) => &m.title,
            CatalogItem::Album(a) => &a.title,
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            CatalogItem::Movie(m) => m.year,
            CatalogItem::Album(a) => a.year,
        }
    }

    /// Director for movies, artist for albums.
    pub fn creator(&self) -> &str {
        match self {
            CatalogItem::Movie(m) => &m.director,
            CatalogItem::Album(a) => &a.artist,
        }
    }

    pub fn genre(&self) -> &str {
        match self {
            CatalogItem::Movie(m) => &m.genre,
            CatalogItem::Album(a) => &a.genre,
        }
    }

    pub fn as_movie(&self) -> Option<&Movie> {
        match self {
            CatalogItem::Movie(m) => Some(m),
            CatalogItem::Album(_) => None,
        }
    }

    pub fn as_album(&self) -> Option<&Album> {
        match self {
            CatalogItem::Album(a) => Some(a),
            CatalogItem::Movie(_) => None,
        }
    }
}
