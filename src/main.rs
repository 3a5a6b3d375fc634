use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use daily_picks::catalog::{seed_catalog, seed_on_launch, CatalogItem, Category};
use daily_picks::config;
use daily_picks::daily_store::{ItemStore, SqliteDailyStore};
use daily_picks::engine::{CompletionRequest, RecommendationEngine, RecommendationError};
use daily_picks::enrichment::{
    AssetCache, Enricher, HttpAssetFetcher, ItunesClient, MovieMetadataSource, MusicBrainzClient,
    TmdbClient,
};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH"));

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
#[command(name = "daily-picks", version = VERSION)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, global = true, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding daily.db. Can also be specified in config file.
    #[clap(long, global = true, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// Directory with movies_1001.json and albums_1001.json. Defaults to db_dir.
    #[clap(long, global = true, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,

    /// Image cache directory. Defaults to db_dir/image_cache.
    #[clap(long, global = true, value_parser = parse_path)]
    pub cache_dir: Option<PathBuf>,

    /// Number of read-only database connections.
    #[clap(long, global = true)]
    pub read_pool_size: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Loads the bundled lists into the database. Safe to run repeatedly.
    Seed,

    /// Shows the current item of a category, picking one if needed.
    Current { category: Category },

    /// Marks the current item as done and shows the next one.
    Complete {
        category: Category,
        /// Half-star rating between 0.5 and 5.0.
        #[clap(long)]
        rating: Option<f64>,
        #[clap(long)]
        notes: Option<String>,
    },

    /// Replaces the current item without recording it.
    Skip { category: Category },

    /// Completed / total per category.
    Progress,

    /// Lists every completed item, newest first.
    History,

    /// Deletes one history entry, making its item eligible again.
    Forget { entry_id: i64 },

    /// Deletes all history, current items and cached images.
    Reset,

    /// Fetches metadata and artwork for the current item of a category.
    Enrich {
        category: Category,
        /// TMDB API key, required for movie metadata.
        #[clap(long)]
        tmdb_api_key: Option<String>,
    },
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            data_dir: args.data_dir.clone(),
            cache_dir: args.cache_dir.clone(),
            read_pool_size: args.read_pool_size,
        }
    }
}

fn print_item(item: &CatalogItem) {
    println!(
        "[{}] #{} {} ({}) by {} - {}",
        item.category(),
        item.id(),
        item.title(),
        item.year(),
        item.creator(),
        item.genre()
    );
    match item {
        CatalogItem::Movie(movie) => {
            if let Some(rating) = movie.community_rating {
                println!("  TMDB rating: {:.1}", rating);
            }
            if let Some(runtime) = movie.runtime_minutes {
                println!("  Runtime: {} min", runtime);
            }
            if let Some(overview) = &movie.overview {
                println!("  {}", overview);
            }
            println!("  Trailer: {}", movie.trailer_url());
        }
        CatalogItem::Album(album) => {
            if let Some(description) = &album.description {
                println!("  {}", description);
            }
            println!("  Listen: {}", album.spotify_search_uri());
        }
    }
}

/// Exhaustion is an expected end state, not an error. An empty catalog is
/// reported separately so it is never mistaken for exhaustion.
fn print_next(
    store: &SqliteDailyStore,
    app_config: &config::AppConfig,
    category: Category,
    result: Result<CatalogItem, RecommendationError>,
) -> Result<()> {
    match result {
        Ok(item) => {
            print_item(&item);
            Ok(())
        }
        Err(RecommendationError::CategoryExhausted(_)) if store.count(category)? == 0 => {
            println!(
                "No {} in the catalog. Put movies_1001.json and albums_1001.json in {:?}.",
                category, app_config.data_dir
            );
            Ok(())
        }
        Err(RecommendationError::CategoryExhausted(_)) => {
            println!("You have completed every {}. Nothing left to pick!", category);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn build_asset_cache(app_config: &config::AppConfig) -> Result<Arc<AssetCache>> {
    let settings = &app_config.enrichment;
    let fetcher = Arc::new(HttpAssetFetcher::new(settings.http_timeout_sec)?);
    Ok(Arc::new(AssetCache::new(
        &app_config.cache_dir,
        fetcher,
        settings.memory_cache_max_entries,
        settings.memory_cache_max_bytes,
    )?))
}

fn build_enricher(
    app_config: &config::AppConfig,
    engine: &RecommendationEngine,
    tmdb_api_key: Option<String>,
) -> Result<Enricher> {
    let settings = &app_config.enrichment;
    let movies: Option<Arc<dyn MovieMetadataSource>> = match tmdb_api_key {
        Some(key) => Some(Arc::new(TmdbClient::new(key, settings.http_timeout_sec)?)),
        None => None,
    };
    Ok(Enricher::new(
        engine.store(),
        engine.generations(),
        build_asset_cache(app_config)?,
        movies,
        Arc::new(ItunesClient::new(settings.http_timeout_sec)?),
        Arc::new(MusicBrainzClient::new(
            &settings.musicbrainz_user_agent,
            settings.musicbrainz_min_interval,
            settings.http_timeout_sec,
        )?),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    if !app_config.db_path().exists() {
        info!("Creating new database at {:?}", app_config.db_path());
    }
    let store = Arc::new(
        SqliteDailyStore::new(app_config.db_path(), app_config.read_pool_size)
            .context("Failed to open daily database")?,
    );
    // `seed` runs the same step itself and fails loudly.
    if !matches!(cli_args.command, Command::Seed) {
        seed_on_launch(
            store.as_ref(),
            &app_config.movies_seed_path(),
            &app_config.albums_seed_path(),
        );
    }
    let engine = RecommendationEngine::new(store.clone());

    match cli_args.command {
        Command::Seed => {
            let report = seed_catalog(
                store.as_ref(),
                &app_config.movies_seed_path(),
                &app_config.albums_seed_path(),
            )?;
            println!(
                "Inserted {} movies and {} albums; filled {} MusicBrainz ids and {} descriptions",
                report.movies_inserted,
                report.albums_inserted,
                report.musicbrainz_ids_filled,
                report.descriptions_filled
            );
        }
        Command::Current { category } => {
            print_next(&store, &app_config, category, engine.current(category))?
        }
        Command::Complete {
            category,
            rating,
            notes,
        } => {
            let current = match engine.current(category) {
                Ok(item) => item,
                Err(e) => return print_next(&store, &app_config, category, Err(e)),
            };
            let mut request = CompletionRequest::for_item(&current);
            if let Some(rating) = rating {
                request = request.with_rating(rating);
            }
            if let Some(notes) = notes {
                request = request.with_notes(notes);
            }
            println!("Completed \"{}\"", current.title());
            print_next(
                &store,
                &app_config,
                category,
                engine.complete(category, request),
            )?;
        }
        Command::Skip { category } => {
            print_next(&store, &app_config, category, engine.skip(category))?
        }
        Command::Progress => {
            let progress = engine.progress()?;
            println!("Movies: {}", progress.movies);
            println!("Albums: {}", progress.albums);
        }
        Command::History => {
            for entry in engine.history()? {
                let rating = entry
                    .rating
                    .map(|r| format!(" {:.1}/5", r))
                    .unwrap_or_default();
                println!(
                    "#{} {} [{}] {} ({}) by {}{}",
                    entry.id,
                    entry.date_completed,
                    entry.category,
                    entry.title,
                    entry.year,
                    entry.creator,
                    rating
                );
                if let Some(notes) = &entry.notes {
                    println!("    {}", notes);
                }
            }
        }
        Command::Forget { entry_id } => {
            if engine.forget_history_entry(entry_id)? {
                println!("Deleted history entry {}", entry_id);
            } else {
                warn!("No history entry with id {}", entry_id);
            }
        }
        Command::Reset => {
            engine.reset_progress()?;
            build_asset_cache(&app_config)?.clear_all().await?;
            println!("All progress and cached images deleted");
        }
        Command::Enrich {
            category,
            tmdb_api_key,
        } => {
            let item = match engine.current(category) {
                Ok(item) => item,
                Err(e) => return print_next(&store, &app_config, category, Err(e)),
            };
            if category == Category::Movie && tmdb_api_key.is_none() {
                warn!("No --tmdb-api-key given, movie metadata will not be fetched");
            }
            let enricher = build_enricher(&app_config, &engine, tmdb_api_key)?;
            let guard = engine.guard(category, item.id());
            let outcome = enricher.enrich(&item, guard).await;

            for update in &outcome.applied {
                println!("Stored {}", update.column());
            }
            if outcome.cleared_asset {
                println!("Cleared stale cover art reference");
            }
            if let Some(image) = &outcome.image {
                println!("Image available ({} bytes)", image.len());
            }
            if let Some(refreshed) = store.fetch_by_id(category, item.id())? {
                print_item(&refreshed);
            }
        }
    }

    Ok(())
}
