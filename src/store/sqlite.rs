//! SQLite implementation of `ReviewStore`.
//!
//! # Schema versioning
//!
//! The database has a `schema_version` table that tracks the schema version.
//! When the schema needs to change, increment `CURRENT_SCHEMA_VERSION` and
//! add a migration in `run_migrations()`. Migrations run sequentially from
//! the current version to the target version.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{NewReview, Review, ReviewStore, StorageError};

/// Current schema version. Increment this when making schema changes and add
/// corresponding migration logic in `run_migrations()`.
const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed review store.
///
/// Uses `tokio::task::spawn_blocking` to run synchronous rusqlite operations
/// without blocking the async runtime.
pub struct SqliteReviewStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReviewStore {
    /// Open (or create) the database at the given path and run migrations.
    ///
    /// The database is configured with `journal_mode = WAL` for crash
    /// safety, `synchronous = FULL` for durability, and a busy timeout to
    /// handle concurrent access gracefully.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();

        if path_str != ":memory:" && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StorageError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| StorageError::storage("open database", e.to_string()))?;

        // WAL can silently stay off on filesystems without shared-memory
        // support; verify what SQLite actually selected. In-memory databases
        // report "memory", which is fine since they are ephemeral by design.
        let is_in_memory = path_str == ":memory:";
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| StorageError::storage("set journal_mode", e.to_string()))?;

        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));

        if !journal_mode_ok {
            return Err(StorageError::storage(
                "configure journal_mode",
                format!(
                    "failed to enable WAL mode: SQLite returned '{}' instead of 'wal'",
                    journal_mode
                ),
            ));
        }

        conn.execute_batch(
            r#"
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            "#,
        )
        .map_err(|e| StorageError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| StorageError::storage("create schema_version table", e.to_string()))?;

        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StorageError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run migrations from `from_version` to `CURRENT_SCHEMA_VERSION`.
    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), StorageError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(StorageError::storage(
                "schema version",
                format!(
                    "database schema version {} is newer than supported version {}",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS reviews (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    contact_number TEXT NOT NULL,
                    user_name TEXT NOT NULL,
                    product_name TEXT NOT NULL,
                    product_review TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_reviews_created_at
                    ON reviews(created_at);
                "#,
            )
            .map_err(|e| StorageError::storage("migration v1", e.to_string()))?;
        }

        // Future migrations would go here:
        // if from_version < 2 { ... }

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| StorageError::storage("update schema version", e.to_string()))?;

        Ok(())
    }

    /// In-memory database, for tests.
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, StorageError> {
        Self::new(":memory:")
    }
}

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that
/// lexicographic ordering in SQL matches chronological ordering.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StorageError::corruption(format!("created_at '{}'", raw)))
}

#[async_trait]
impl ReviewStore for SqliteReviewStore {
    async fn append(&self, review: NewReview) -> Result<i64, StorageError> {
        let conn = self.conn.clone();
        let created_at = format_timestamp(Utc::now());

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            conn.execute(
                "INSERT INTO reviews (contact_number, user_name, product_name,
                                      product_review, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    review.contact_number,
                    review.user_name,
                    review.product_name,
                    review.product_review,
                    created_at
                ],
            )
            .map_err(|e| StorageError::storage("append", e.to_string()))?;

            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(|e| StorageError::storage("append", e.to_string()))?
    }

    async fn list_all(&self) -> Result<Vec<Review>, StorageError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let mut stmt = conn
                .prepare(
                    "SELECT id, contact_number, user_name, product_name,
                            product_review, created_at
                     FROM reviews
                     ORDER BY created_at DESC, id DESC",
                )
                .map_err(|e| StorageError::storage("list_all", e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })
                .map_err(|e| StorageError::storage("list_all", e.to_string()))?;

            let mut reviews = Vec::new();
            for row in rows {
                let (id, contact_number, user_name, product_name, product_review, created_at) =
                    row.map_err(|e| StorageError::storage("list_all", e.to_string()))?;
                reviews.push(Review {
                    id,
                    contact_number,
                    user_name,
                    product_name,
                    product_review,
                    created_at: parse_timestamp(&created_at)?,
                });
            }
            Ok(reviews)
        })
        .await
        .map_err(|e| StorageError::storage("list_all", e.to_string()))?
    }
}
