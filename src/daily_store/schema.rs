//! SQLite schema definitions for the daily picks database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};
use anyhow::Result;
use rusqlite::Connection;

// =============================================================================
// Version 1 - Initial tables
// =============================================================================

const MOVIES_TABLE_V1: Table = Table {
    name: "movies",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("director", &SqlType::Text, non_null = true),
        sqlite_column!("genre", &SqlType::Text, non_null = true),
        sqlite_column!("tmdb_id", &SqlType::Integer),
        sqlite_column!("imdb_id", &SqlType::Text),
        sqlite_column!("overview", &SqlType::Text),
        sqlite_column!("runtime_minutes", &SqlType::Integer),
        sqlite_column!("poster_path", &SqlType::Text),
    ],
    indices: &[],
};

const ALBUMS_TABLE_V1: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("genre", &SqlType::Text, non_null = true),
        sqlite_column!("musicbrainz_id", &SqlType::Text),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("cover_art_path", &SqlType::Text),
    ],
    indices: &[],
};

/// One row per category, keyed by `current_movie` / `current_album`.
const RECOMMENDATION_SLOTS_TABLE_V1: Table = Table {
    name: "recommendation_slots",
    columns: &[
        sqlite_column!("slot_key", &SqlType::Text, is_primary_key = true),
        sqlite_column!("category", &SqlType::Text, non_null = true),
        sqlite_column!("item_id", &SqlType::Integer, non_null = true),
        sqlite_column!("assigned_at", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

const HISTORY_TABLE_V1: Table = Table {
    name: "history",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("item_id", &SqlType::Integer, non_null = true),
        sqlite_column!("category", &SqlType::Text, non_null = true),
        sqlite_column!("date_completed", &SqlType::Text, non_null = true),
        sqlite_column!("rating", &SqlType::Integer),
        sqlite_column!("notes", &SqlType::Text),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("creator", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_history_category", "category")],
};

// =============================================================================
// Version 2 - Half-star ratings
// =============================================================================

const HISTORY_TABLE_V2: Table = Table {
    name: "history",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("item_id", &SqlType::Integer, non_null = true),
        sqlite_column!("category", &SqlType::Text, non_null = true),
        sqlite_column!("date_completed", &SqlType::Text, non_null = true),
        sqlite_column!("rating", &SqlType::Real),
        sqlite_column!("notes", &SqlType::Text),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("creator", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_history_category", "category")],
};

/// SQLite cannot change a column type in place, so the history table is
/// rebuilt with a REAL rating column and the rows copied over.
fn migrate_v1_to_v2(conn: &Connection) -> Result<()> {
    conn.execute("DROP INDEX IF EXISTS idx_history_category", [])?;
    conn.execute("ALTER TABLE history RENAME TO history_v1", [])?;
    HISTORY_TABLE_V2.create(conn)?;
    conn.execute(
        "INSERT INTO history (id, item_id, category, date_completed, rating, notes, title, year, creator)
         SELECT id, item_id, category, date_completed, CAST(rating AS REAL), notes, title, year, creator
         FROM history_v1",
        [],
    )?;
    conn.execute("DROP TABLE history_v1", [])?;
    Ok(())
}

// =============================================================================
// Version 3 - Movie trailers
// =============================================================================

const MOVIES_TABLE_V3: Table = Table {
    name: "movies",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("director", &SqlType::Text, non_null = true),
        sqlite_column!("genre", &SqlType::Text, non_null = true),
        sqlite_column!("tmdb_id", &SqlType::Integer),
        sqlite_column!("imdb_id", &SqlType::Text),
        sqlite_column!("overview", &SqlType::Text),
        sqlite_column!("runtime_minutes", &SqlType::Integer),
        sqlite_column!("poster_path", &SqlType::Text),
        sqlite_column!("trailer_key", &SqlType::Text),
    ],
    indices: &[],
};

fn migrate_v2_to_v3(conn: &Connection) -> Result<()> {
    conn.execute("ALTER TABLE movies ADD COLUMN trailer_key TEXT", [])?;
    Ok(())
}

// =============================================================================
// Version 4 - Movie community rating
// =============================================================================

const MOVIES_TABLE_V4: Table = Table {
    name: "movies",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("director", &SqlType::Text, non_null = true),
        sqlite_column!("genre", &SqlType::Text, non_null = true),
        sqlite_column!("tmdb_id", &SqlType::Integer),
        sqlite_column!("imdb_id", &SqlType::Text),
        sqlite_column!("overview", &SqlType::Text),
        sqlite_column!("runtime_minutes", &SqlType::Integer),
        sqlite_column!("poster_path", &SqlType::Text),
        sqlite_column!("trailer_key", &SqlType::Text),
        sqlite_column!("community_rating", &SqlType::Real),
    ],
    indices: &[],
};

fn migrate_v3_to_v4(conn: &Connection) -> Result<()> {
    conn.execute("ALTER TABLE movies ADD COLUMN community_rating REAL", [])?;
    Ok(())
}

pub const DAILY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[
            MOVIES_TABLE_V1,
            ALBUMS_TABLE_V1,
            RECOMMENDATION_SLOTS_TABLE_V1,
            HISTORY_TABLE_V1,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[
            MOVIES_TABLE_V1,
            ALBUMS_TABLE_V1,
            RECOMMENDATION_SLOTS_TABLE_V1,
            HISTORY_TABLE_V2,
        ],
        migration: Some(migrate_v1_to_v2),
    },
    VersionedSchema {
        version: 3,
        tables: &[
            MOVIES_TABLE_V3,
            ALBUMS_TABLE_V1,
            RECOMMENDATION_SLOTS_TABLE_V1,
            HISTORY_TABLE_V2,
        ],
        migration: Some(migrate_v2_to_v3),
    },
    VersionedSchema {
        version: 4,
        tables: &[
            MOVIES_TABLE_V4,
            ALBUMS_TABLE_V1,
            RECOMMENDATION_SLOTS_TABLE_V1,
            HISTORY_TABLE_V2,
        ],
        migration: Some(migrate_v3_to_v4),
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_sequential() {
        for (index, schema) in DAILY_VERSIONED_SCHEMAS.iter().enumerate() {
            assert_eq!(schema.version, index + 1);
            assert_eq!(schema.migration.is_none(), index == 0);
        }
    }

    #[test]
    fn every_migration_lands_on_its_declared_layout() {
        let conn = Connection::open_in_memory().unwrap();
        DAILY_VERSIONED_SCHEMAS[0].create(&conn).unwrap();
        conn.execute(
            "INSERT INTO history (item_id, category, date_completed, rating, title, year, creator)
             VALUES (3, 'movie', '2024-01-02', 4, 'Stalker', 1979, 'Andrei Tarkovsky')",
            [],
        )
        .unwrap();

        for schema in &DAILY_VERSIONED_SCHEMAS[1..] {
            (schema.migration.unwrap())(&conn).unwrap();
            schema.validate(&conn).unwrap();
        }

        let rating: f64 = conn
            .query_row("SELECT rating FROM history WHERE item_id = 3", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(rating, 4.0);
    }
}
