use daily_picks::catalog::seed_catalog;
use daily_picks::{RecommendationEngine, SqliteDailyStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Writes `movies_1001.json` and `albums_1001.json` with ids `1..=n`.
pub fn write_seed_files(dir: &Path, movies: i64, albums: i64) -> (PathBuf, PathBuf) {
    let movies_json: Vec<serde_json::Value> = (1..=movies)
        .map(|id| {
            serde_json::json!({
                "id": id,
                "title": format!("Movie {}", id),
                "year": 1920 + id as i32,
                "director": format!("Director {}", id),
                "genre": "Drama",
                "tmdb_id": 1000 + id,
            })
        })
        .collect();
    let albums_json: Vec<serde_json::Value> = (1..=albums)
        .map(|id| {
            serde_json::json!({
                "id": id,
                "title": format!("Album {}", id),
                "year": 1950 + id as i32,
                "artist": format!("Artist {}", id),
                "genre": "Rock",
            })
        })
        .collect();

    let movies_path = dir.join("movies_1001.json");
    let albums_path = dir.join("albums_1001.json");
    std::fs::write(&movies_path, serde_json::to_string(&movies_json).unwrap()).unwrap();
    std::fs::write(&albums_path, serde_json::to_string(&albums_json).unwrap()).unwrap();
    (movies_path, albums_path)
}

/// A seeded database in a temp directory with an engine on top.
pub struct TestEnv {
    pub dir: TempDir,
    pub store: Arc<SqliteDailyStore>,
    pub engine: RecommendationEngine,
}

impl TestEnv {
    pub fn seeded(movies: i64, albums: i64) -> Self {
        let dir = TempDir::new().unwrap();
        let (movies_path, albums_path) = write_seed_files(dir.path(), movies, albums);
        let store = Arc::new(SqliteDailyStore::new(dir.path().join("daily.db"), 2).unwrap());
        seed_catalog(store.as_ref(), &movies_path, &albums_path).unwrap();
        let engine = RecommendationEngine::new(store.clone());
        Self { dir, store, engine }
    }

    /// Drops the store and engine and opens the same database file again.
    pub fn reopen(self) -> Self {
        let Self { dir, store, engine } = self;
        drop(engine);
        drop(store);
        let store = Arc::new(SqliteDailyStore::new(dir.path().join("daily.db"), 2).unwrap());
        let engine = RecommendationEngine::new(store.clone());
        Self { dir, store, engine }
    }
}
