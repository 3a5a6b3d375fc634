mod file_config;

pub use file_config::{EnrichmentConfig, FileConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_READ_POOL_SIZE: usize = 4;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub read_pool_size: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    /// Where the bundled `movies_1001.json` / `albums_1001.json` live.
    pub data_dir: PathBuf,
    /// Image cache directory.
    pub cache_dir: PathBuf,
    pub read_pool_size: usize,

    pub enrichment: EnrichmentSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentSettings {
    pub musicbrainz_user_agent: String,
    pub musicbrainz_min_interval: Duration,
    pub http_timeout_sec: u64,
    pub memory_cache_max_entries: usize,
    pub memory_cache_max_bytes: usize,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            musicbrainz_user_agent: format!("daily-picks/{}", env!("CARGO_PKG_VERSION")),
            musicbrainz_min_interval: Duration::from_millis(1100),
            http_timeout_sec: 30,
            memory_cache_max_entries: 50,
            memory_cache_max_bytes: 50 * 1024 * 1024, // 50 MiB
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .unwrap_or_else(|| db_dir.clone());

        let cache_dir = file
            .cache_dir
            .map(PathBuf::from)
            .or_else(|| cli.cache_dir.clone())
            .unwrap_or_else(|| db_dir.join("image_cache"));

        let read_pool_size = file
            .read_pool_size
            .or(cli.read_pool_size)
            .unwrap_or(DEFAULT_READ_POOL_SIZE);
        if read_pool_size == 0 {
            bail!("read_pool_size must be at least 1");
        }

        let defaults = EnrichmentSettings::default();
        let enrichment_file = file.enrichment.unwrap_or_default();
        let enrichment = EnrichmentSettings {
            musicbrainz_user_agent: enrichment_file
                .musicbrainz_user_agent
                .filter(|ua| !ua.trim().is_empty())
                .unwrap_or(defaults.musicbrainz_user_agent),
            musicbrainz_min_interval: enrichment_file
                .musicbrainz_min_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.musicbrainz_min_interval),
            http_timeout_sec: enrichment_file
                .http_timeout_sec
                .unwrap_or(defaults.http_timeout_sec),
            memory_cache_max_entries: enrichment_file
                .memory_cache_max_entries
                .unwrap_or(defaults.memory_cache_max_entries),
            memory_cache_max_bytes: enrichment_file
                .memory_cache_max_bytes
                .unwrap_or(defaults.memory_cache_max_bytes),
        };

        Ok(Self {
            db_dir,
            data_dir,
            cache_dir,
            read_pool_size,
            enrichment,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_dir.join("daily.db")
    }

    pub fn movies_seed_path(&self) -> PathBuf {
        self.data_dir.join("movies_1001.json")
    }

    pub fn albums_seed_path(&self) -> PathBuf {
        self.data_dir.join("albums_1001.json")
    }
}
