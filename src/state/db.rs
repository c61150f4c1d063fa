// SQLite database setup and migrations
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use super::models::{format_timestamp, parse_timestamp, ColumnInfo, TableInfo};
use super::storage::StorageError;
use crate::config::AppConfig;

/// Tables that must exist before the app may use the store
pub const REQUIRED_TABLES: [&str; 2] = ["clothes", "outfits"];

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Database initialization failed: {0}")]
    InitFailed(String),
    #[error("A record with id '{id}' already exists in {table}")]
    DuplicateId { table: &'static str, id: String },
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Invalid record in {table}: {reason}")]
    InvalidRecord { table: &'static str, reason: String },
}

pub type DbResult<T> = Result<T, DbError>;

// Thread-safe database connection wrapper
pub struct DbConnection {
    conn: Arc<Mutex<Connection>>,
}

impl DbConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// A panic while holding the lock cannot leave SQLite mid-statement, so a
    /// poisoned guard is still usable.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for DbConnection {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

/// Open (or create) the wardrobe database under the configured data directory.
///
/// Safe to call on every launch: migrations only apply what is missing, and
/// existing rows are never touched.
pub fn init_db(config: &AppConfig) -> DbResult<DbConnection> {
    let db_path = config.db_path();

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    log::info!("Opening wardrobe database at {}", db_path.display());
    let conn = Connection::open(&db_path)
        .map_err(|e| DbError::InitFailed(format!("cannot open {}: {}", db_path.display(), e)))?;

    prepare(conn)
}

/// Throwaway database with the full schema, for tests and previews
pub fn open_in_memory() -> DbResult<DbConnection> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(conn: Connection) -> DbResult<DbConnection> {
    run_migrations(&conn).map_err(|e| match e {
        DbError::InitFailed(_) => e,
        other => DbError::InitFailed(other.to_string()),
    })?;
    verify_schema(&conn)?;
    Ok(DbConnection::new(conn))
}

fn run_migrations(conn: &Connection) -> DbResult<()> {
    // Create migrations table if it doesn't exist
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version < 1 {
        migration_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [1])?;
        log::info!("Applied schema migration v1");
    }

    if current_version < 2 {
        migration_v2(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [2])?;
        log::info!("Applied schema migration v2");
    }

    Ok(())
}

fn migration_v1(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS clothes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            color TEXT NOT NULL,
            imagePath TEXT NOT NULL,
            dateAdded TEXT NOT NULL,
            tags TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_clothes_date_added ON clothes(dateAdded DESC)",
        [],
    )?;

    // Items are embedded as a JSON array, not joined
    conn.execute(
        "CREATE TABLE IF NOT EXISTS outfits (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            items TEXT NOT NULL,
            createdDate TEXT NOT NULL,
            imagePreview TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_outfits_created_date ON outfits(createdDate DESC)",
        [],
    )?;

    Ok(())
}

/// Rewrite stored dates to the fixed-width form so text order is time order.
/// Rows written with millisecond precision (`...00.123Z`) or an offset would
/// otherwise sort out of place next to nanosecond timestamps.
fn migration_v2(conn: &Connection) -> DbResult<()> {
    for (table, column) in [("clothes", "dateAdded"), ("outfits", "createdDate")] {
        let rows = {
            let mut stmt = conn.prepare(&format!("SELECT id, {} FROM {}", column, table))?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut rewritten = 0;
        for (id, raw) in rows {
            let normalized = match parse_timestamp(&raw) {
                Ok(ts) => format_timestamp(&ts),
                Err(e) => {
                    log::warn!("Leaving {} {} with unreadable {} '{}': {}", table, id, column, raw, e);
                    continue;
                }
            };
            if normalized != raw {
                conn.execute(
                    &format!("UPDATE {} SET {} = ?1 WHERE id = ?2", table, column),
                    [&normalized, &id],
                )?;
                rewritten += 1;
            }
        }

        if rewritten > 0 {
            log::info!("Normalized {} {} values in {}", rewritten, column, table);
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn verify_schema(conn: &Connection) -> DbResult<()> {
    for table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            log::error!("Table '{}' missing after migrations", table);
            return Err(DbError::InitFailed(format!("failed to create {} table", table)));
        }
    }
    log::debug!("Verified tables: {}", REQUIRED_TABLES.join(", "));
    Ok(())
}

/// Column layout of every required table
pub fn describe_schema(db: &DbConnection) -> DbResult<Vec<TableInfo>> {
    let conn = db.lock();
    let mut tables = Vec::with_capacity(REQUIRED_TABLES.len());

    for table in REQUIRED_TABLES {
        if !table_exists(&conn, table)? {
            return Err(DbError::InitFailed(format!("{} table is missing", table)));
        }

        // PRAGMA arguments cannot be bound; table names come from REQUIRED_TABLES
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    data_type: row.get(2)?,
                    not_null: row.get::<_, i32>(3)? != 0,
                    primary_key: row.get::<_, i32>(5)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        tables.push(TableInfo {
            name: table.to_string(),
            columns,
        });
    }

    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_db_init() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        // Verify tables exist
        let table_count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('clothes', 'outfits')",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 2);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let versions: i32 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 2);
    }

    #[test]
    fn test_migration_v2_normalizes_legacy_dates() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )
        .unwrap();
        migration_v1(&conn).unwrap();
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])
            .unwrap();

        // Millisecond text sorts after a later nanosecond value ('Z' > '4')
        for (id, date) in [
            ("legacy", "2024-01-01T00:00:00.123Z"),
            ("newer", "2024-01-01T00:00:00.123400000Z"),
            ("broken", "yesterday"),
        ] {
            conn.execute(
                "INSERT INTO clothes (id, name, category, color, imagePath, dateAdded, tags)
                 VALUES (?1, 'Shirt', 'tops', 'blue', '/img', ?2, '[]')",
                [id, date],
            )
            .unwrap();
        }
        conn.execute(
            "INSERT INTO outfits (id, name, items, createdDate, imagePreview)
             VALUES ('o', 'Look', '[]', '2024-01-01T02:00:00+02:00', NULL)",
            [],
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let date_of = |id: &str| -> String {
            conn.query_row("SELECT dateAdded FROM clothes WHERE id = ?1", [id], |row| row.get(0))
                .unwrap()
        };
        assert_eq!(date_of("legacy"), "2024-01-01T00:00:00.123000000Z");
        assert_eq!(date_of("broken"), "yesterday");

        let order: Vec<String> = conn
            .prepare("SELECT id FROM clothes WHERE id != 'broken' ORDER BY dateAdded DESC")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(order, ["newer", "legacy"]);

        let outfit_date: String = conn
            .query_row("SELECT createdDate FROM outfits WHERE id = 'o'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(outfit_date, "2024-01-01T00:00:00.000000000Z");
    }

    #[test]
    fn test_verify_schema_reports_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute("DROP TABLE outfits", []).unwrap();

        let err = verify_schema(&conn).unwrap_err();
        assert!(matches!(err, DbError::InitFailed(msg) if msg.contains("outfits")));
    }

    #[test]
    fn test_init_db_twice_keeps_rows() {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig::with_data_dir(tmp.path());

        let db = init_db(&config).unwrap();
        db.lock()
            .execute(
                "INSERT INTO clothes (id, name, category, color, imagePath, dateAdded, tags)
                 VALUES ('1', 'Blue Shirt', 'tops', 'blue', '/img', '2024-01-01T00:00:00Z', '[]')",
                [],
            )
            .unwrap();
        drop(db);

        let db = init_db(&config).unwrap();
        let count: i32 = db
            .lock()
            .query_row("SELECT COUNT(*) FROM clothes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert!(config.db_path().exists());
    }

    #[test]
    fn test_describe_schema_lists_columns() {
        let db = open_in_memory().unwrap();
        let tables = describe_schema(&db).unwrap();

        assert_eq!(tables.len(), 2);
        let clothes = &tables[0];
        assert_eq!(clothes.name, "clothes");
        let names: Vec<&str> = clothes.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            ["id", "name", "category", "color", "imagePath", "dateAdded", "tags"]
        );
        assert!(clothes.columns[0].primary_key);
        assert!(!clothes.columns[6].not_null);
    }
}
