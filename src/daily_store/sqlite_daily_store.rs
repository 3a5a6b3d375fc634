use super::models::*;
use super::schema::DAILY_VERSIONED_SCHEMAS;
use super::{DailyStore, HistoryLedger, ItemStore, SlotStore, StoreError};
use crate::catalog::{Album, CatalogItem, Category, ItemId, Movie};
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rand::seq::IndexedRandom;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

const MOVIE_COLUMNS: &str = "id, title, year, director, genre, tmdb_id, imdb_id, overview, \
     runtime_minutes, poster_path, trailer_key, community_rating";
const ALBUM_COLUMNS: &str =
    "id, title, year, artist, genre, musicbrainz_id, description, cover_art_path";
const HISTORY_COLUMNS: &str =
    "id, item_id, category, date_completed, rating, notes, title, year, creator";

/// SQLite-backed implementation of every daily store trait.
///
/// All operations go through `gate`: reads share it and use the read-only
/// pool, writes hold it exclusively and use the single write connection.
#[derive(Clone)]
pub struct SqliteDailyStore {
    gate: Arc<RwLock<()>>,
    write_conn: Arc<Mutex<Connection>>,
    read_pool: Vec<Arc<Mutex<Connection>>>,
    read_index: Arc<AtomicUsize>,
}

fn table_for(category: Category) -> &'static str {
    match category {
        Category::Movie => "movies",
        Category::Album => "albums",
    }
}

fn asset_column_for(category: Category) -> &'static str {
    match category {
        Category::Movie => "poster_path",
        Category::Album => "cover_art_path",
    }
}

fn conversion_error(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, message.into())
}

fn parse_category(row: &rusqlite::Row, index: usize) -> rusqlite::Result<Category> {
    let raw: String = row.get(index)?;
    Category::parse(&raw).ok_or_else(|| conversion_error(index, format!("unknown category {}", raw)))
}

impl SqliteDailyStore {
    /// Opens the database, creating or migrating it as needed.
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    /// * `read_pool_size` - Number of read-only connections (at least one is opened)
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path = db_path.as_ref();
        let write_conn = open_versioned_db(db_path, DAILY_VERSIONED_SCHEMAS, "daily")?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let movie_count: i64 = write_conn.query_row("SELECT COUNT(*) FROM movies", [], |r| r.get(0))?;
        let album_count: i64 = write_conn.query_row("SELECT COUNT(*) FROM albums", [], |r| r.get(0))?;
        let history_count: i64 =
            write_conn.query_row("SELECT COUNT(*) FROM history", [], |r| r.get(0))?;
        info!(
            "Opened daily store: {} movies, {} albums, {} history entries",
            movie_count, album_count, history_count
        );

        let pool_size = read_pool_size.max(1);
        let mut read_pool = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let read_conn = Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .context("Failed to open read-only connection")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(Self {
            gate: Arc::new(RwLock::new(())),
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let _shared = self.gate.read().unwrap();
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        f(&conn)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let _exclusive = self.gate.write().unwrap();
        let mut conn = self.write_conn.lock().unwrap();
        f(&mut conn)
    }

    fn row_to_movie(row: &rusqlite::Row) -> rusqlite::Result<Movie> {
        Ok(Movie {
            id: row.get(0)?,
            title: row.get(1)?,
            year: row.get(2)?,
            director: row.get(3)?,
            genre: row.get(4)?,
            tmdb_id: row.get(5)?,
            imdb_id: row.get(6)?,
            overview: row.get(7)?,
            runtime_minutes: row.get(8)?,
            poster_path: row.get(9)?,
            trailer_key: row.get(10)?,
            community_rating: row.get(11)?,
        })
    }

    fn row_to_album(row: &rusqlite::Row) -> rusqlite::Result<Album> {
        Ok(Album {
            id: row.get(0)?,
            title: row.get(1)?,
            year: row.get(2)?,
            artist: row.get(3)?,
            genre: row.get(4)?,
            musicbrainz_id: row.get(5)?,
            description: row.get(6)?,
            cover_art_path: row.get(7)?,
        })
    }

    fn row_to_history_entry(row: &rusqlite::Row) -> rusqlite::Result<HistoryEntry> {
        let date_str: String = row.get(3)?;
        let date_completed = NaiveDate::parse_from_str(&date_str, COMPLETION_DATE_FORMAT)
            .map_err(|e| conversion_error(3, format!("bad completion date {}: {}", date_str, e)))?;
        Ok(HistoryEntry {
            id: row.get(0)?,
            item_id: row.get(1)?,
            category: parse_category(row, 2)?,
            date_completed,
            rating: row.get(4)?,
            notes: row.get(5)?,
            title: row.get(6)?,
            year: row.get(7)?,
            creator: row.get(8)?,
        })
    }

    fn row_to_slot(row: &rusqlite::Row) -> rusqlite::Result<RecommendationSlot> {
        let assigned_at_str: String = row.get(2)?;
        Ok(RecommendationSlot {
            category: parse_category(row, 0)?,
            item_id: row.get(1)?,
            assigned_at: DateTime::parse_from_rfc3339(&assigned_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    fn insert_history(conn: &Connection, entry: &NewHistoryEntry) -> Result<i64> {
        conn.execute(
            "INSERT INTO history (item_id, category, date_completed, rating, notes, title, year, creator)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.item_id,
                entry.category.as_str(),
                entry.date_completed.format(COMPLETION_DATE_FORMAT).to_string(),
                entry.rating,
                entry.notes,
                entry.title,
                entry.year,
                entry.creator,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn check_update_category(category: Category, update: &EnrichmentUpdate) -> Result<()> {
        if update.category() != category {
            return Err(StoreError::FieldCategoryMismatch {
                field: update.column(),
                category,
            }
            .into());
        }
        Ok(())
    }
}

impl ItemStore for SqliteDailyStore {
    fn count(&self, category: Category) -> Result<usize> {
        self.read(|conn| {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", table_for(category)),
                [],
                |r| r.get(0),
            )?;
            Ok(count as usize)
        })
    }

    fn fetch_by_id(&self, category: Category, id: ItemId) -> Result<Option<CatalogItem>> {
        self.read(|conn| {
            let item = match category {
                Category::Movie => conn
                    .query_row(
                        &format!("SELECT {} FROM movies WHERE id = ?1", MOVIE_COLUMNS),
                        params![id],
                        Self::row_to_movie,
                    )
                    .optional()?
                    .map(CatalogItem::Movie),
                Category::Album => conn
                    .query_row(
                        &format!("SELECT {} FROM albums WHERE id = ?1", ALBUM_COLUMNS),
                        params![id],
                        Self::row_to_album,
                    )
                    .optional()?
                    .map(CatalogItem::Album),
            };
            Ok(item)
        })
    }

    fn random_unseen(
        &self,
        category: Category,
        excluding: &HashSet<ItemId>,
    ) -> Result<Option<ItemId>> {
        let candidates = self.read(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT id FROM {}", table_for(category)))?;
            let ids = stmt
                .query_map([], |r| r.get::<_, ItemId>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids
                .into_iter()
                .filter(|id| !excluding.contains(id))
                .collect::<Vec<_>>())
        })?;
        debug!(
            "{} unseen {} candidates ({} excluded)",
            candidates.len(),
            category,
            excluding.len()
        );
        Ok(candidates.choose(&mut rand::rng()).copied())
    }

    fn insert_many(&self, items: &[CatalogItem]) -> Result<usize> {
        self.write(|conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut movie_stmt = tx.prepare(&format!(
                    "INSERT OR IGNORE INTO movies ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    MOVIE_COLUMNS
                ))?;
                let mut album_stmt = tx.prepare(&format!(
                    "INSERT OR IGNORE INTO albums ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    ALBUM_COLUMNS
                ))?;
                for item in items {
                    inserted += match item {
                        CatalogItem::Movie(m) => movie_stmt.execute(params![
                            m.id,
                            m.title,
                            m.year,
                            m.director,
                            m.genre,
                            m.tmdb_id,
                            m.imdb_id,
                            m.overview,
                            m.runtime_minutes,
                            m.poster_path,
                            m.trailer_key,
                            m.community_rating,
                        ])?,
                        CatalogItem::Album(a) => album_stmt.execute(params![
                            a.id,
                            a.title,
                            a.year,
                            a.artist,
                            a.genre,
                            a.musicbrainz_id,
                            a.description,
                            a.cover_art_path,
                        ])?,
                    };
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
    }

    fn apply_enrichment(
        &self,
        category: Category,
        id: ItemId,
        update: EnrichmentUpdate,
    ) -> Result<bool> {
        Self::check_update_category(category, &update)?;
        self.write(|conn| {
            let changed = conn.execute(
                &format!(
                    "UPDATE {} SET {} = ?1 WHERE id = ?2",
                    table_for(category),
                    update.column()
                ),
                params![update.value(), id],
            )?;
            Ok(changed > 0)
        })
    }

    fn fill_if_unset(&self, category: Category, id: ItemId, update: EnrichmentUpdate) -> Result<bool> {
        Self::check_update_category(category, &update)?;
        self.write(|conn| {
            let column = update.column();
            let changed = conn.execute(
                &format!(
                    "UPDATE {} SET {col} = ?1 WHERE id = ?2 AND ({col} IS NULL OR {col} = '')",
                    table_for(category),
                    col = column
                ),
                params![update.value(), id],
            )?;
            Ok(changed > 0)
        })
    }

    fn clear_asset_path(&self, category: Category, id: ItemId) -> Result<bool> {
        self.write(|conn| {
            let changed = conn.execute(
                &format!(
                    "UPDATE {} SET {} = NULL WHERE id = ?1",
                    table_for(category),
                    asset_column_for(category)
                ),
                params![id],
            )?;
            Ok(changed > 0)
        })
    }

    fn delete_all_items(&self, category: Category) -> Result<usize> {
        self.write(|conn| Ok(conn.execute(&format!("DELETE FROM {}", table_for(category)), [])?))
    }
}

impl HistoryLedger for SqliteDailyStore {
    fn append(&self, entry: &NewHistoryEntry) -> Result<i64> {
        self.write(|conn| Self::insert_history(conn, entry))
    }

    fn fetch_all(&self) -> Result<Vec<HistoryEntry>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM history ORDER BY date_completed DESC, id DESC",
                HISTORY_COLUMNS
            ))?;
            let entries = stmt
                .query_map([], Self::row_to_history_entry)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
    }

    fn ids_completed_in(&self, category: Category) -> Result<HashSet<ItemId>> {
        self.read(|conn| {
            let mut stmt = conn.prepare("SELECT item_id FROM history WHERE category = ?1")?;
            let ids = stmt
                .query_map(params![category.as_str()], |r| r.get::<_, ItemId>(0))?
                .collect::<rusqlite::Result<HashSet<_>>>()?;
            Ok(ids)
        })
    }

    fn count_in(&self, category: Category) -> Result<usize> {
        self.read(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM history WHERE category = ?1",
                params![category.as_str()],
                |r| r.get(0),
            )?;
            Ok(count as usize)
        })
    }

    fn delete_by_id(&self, id: i64) -> Result<bool> {
        self.write(|conn| Ok(conn.execute("DELETE FROM history WHERE id = ?1", params![id])? > 0))
    }

    fn delete_all_history(&self) -> Result<usize> {
        self.write(|conn| Ok(conn.execute("DELETE FROM history", [])?))
    }
}

impl SlotStore for SqliteDailyStore {
    fn find_slot(&self, category: Category) -> Result<Option<RecommendationSlot>> {
        self.read(|conn| {
            Ok(conn
                .query_row(
                    "SELECT category, item_id, assigned_at FROM recommendation_slots WHERE slot_key = ?1",
                    params![category.slot_key()],
                    Self::row_to_slot,
                )
                .optional()?)
        })
    }

    fn create_slot(&self, slot: &RecommendationSlot) -> Result<()> {
        self.write(|conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM recommendation_slots WHERE slot_key = ?1",
                    params![slot.category.slot_key()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if exists {
                return Err(StoreError::SlotAlreadyExists(slot.category).into());
            }
            conn.execute(
                "INSERT INTO recommendation_slots (slot_key, category, item_id, assigned_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    slot.category.slot_key(),
                    slot.category.as_str(),
                    slot.item_id,
                    slot.assigned_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    fn update_slot_item(&self, category: Category, item_id: ItemId) -> Result<bool> {
        self.write(|conn| {
            let changed = conn.execute(
                "UPDATE recommendation_slots SET item_id = ?1, assigned_at = ?2 WHERE slot_key = ?3",
                params![item_id, Utc::now().to_rfc3339(), category.slot_key()],
            )?;
            Ok(changed > 0)
        })
    }

    fn delete_slot(&self, category: Category) -> Result<bool> {
        self.write(|conn| {
            Ok(conn.execute(
                "DELETE FROM recommendation_slots WHERE slot_key = ?1",
                params![category.slot_key()],
            )? > 0)
        })
    }

    fn delete_all_slots(&self) -> Result<usize> {
        self.write(|conn| Ok(conn.execute("DELETE FROM recommendation_slots", [])?))
    }
}

impl DailyStore for SqliteDailyStore {
    fn record_completion(&self, entry: &NewHistoryEntry) -> Result<i64> {
        self.write(|conn| {
            let tx = conn.transaction()?;
            let history_id = Self::insert_history(&tx, entry)?;
            tx.execute(
                "DELETE FROM recommendation_slots WHERE slot_key = ?1",
                params![entry.category.slot_key()],
            )?;
            tx.commit().context("Failed to commit completion")?;
            Ok(history_id)
        })
    }

    fn reset_progress(&self) -> Result<()> {
        self.write(|conn| {
            let tx = conn.transaction()?;
            let history = tx.execute("DELETE FROM history", [])?;
            let slots = tx.execute("DELETE FROM recommendation_slots", [])?;
            tx.commit()?;
            info!("Reset progress: removed {} history entries and {} slots", history, slots);
            Ok(())
        })
    }
}
