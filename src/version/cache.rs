//! Durable lookup cache backed by a single SQLite file
//!
//! Entries are whole rows keyed by a composite string (see [`latest_key`] and
//! [`release_key`]). Each write is its own transaction, so an interrupted run
//! never leaves a half-written entry behind. Reads select named columns only,
//! which keeps older binaries working against files written by newer ones.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::purl::PackageIdentifier;
use crate::version::error::CacheError;
use crate::version::types::ResolutionResult;

/// Schema version stamped into `user_version`
const SCHEMA_VERSION: i32 = 1;

/// Cache key of the newest release of a package
pub fn latest_key(package: &PackageIdentifier) -> String {
    format!(
        "latest:{}:{}:{}",
        package.ecosystem,
        package.group_or_empty(),
        package.name
    )
}

/// Cache key of the release date of the pinned version
pub fn release_key(package: &PackageIdentifier) -> String {
    format!(
        "release:{}:{}:{}:{}",
        package.ecosystem,
        package.group_or_empty(),
        package.name,
        package.version
    )
}

pub struct Cache {
    conn: Mutex<Connection>,
    /// `None` for in-memory caches
    path: Option<PathBuf>,
}

impl Cache {
    /// Opens the cache file, creating it if needed
    ///
    /// A file that cannot be opened as a cache database is left untouched and
    /// the run continues with an empty in-memory cache.
    pub fn open(db_path: &Path) -> Result<Self, CacheError> {
        match Self::open_file(db_path) {
            Ok(cache) => Ok(cache),
            Err(e) => {
                warn!(
                    "Cache at {:?} is unusable, continuing without persistence: {}",
                    db_path, e
                );
                Self::in_memory()
            }
        }
    }

    /// A cache that lives only as long as the process
    pub fn in_memory() -> Result<Self, CacheError> {
        debug!("Using in-memory cache");
        let conn = Connection::open_in_memory()?;
        let cache = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        cache.create_schema()?;
        Ok(cache)
    }

    fn open_file(db_path: &Path) -> Result<Self, CacheError> {
        info!("Initializing cache database at {:?}", db_path);

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Corrupt(format!("cannot create {:?}: {}", parent, e)))?;
        }

        let conn = Connection::open(db_path)?;

        // The first statement that reads the header fails on non-database files
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| CacheError::Corrupt(e.to_string()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let cache = Self {
            conn: Mutex::new(conn),
            path: Some(db_path.to_path_buf()),
        };
        cache
            .create_schema()
            .map_err(|e| CacheError::Corrupt(e.to_string()))?;

        info!("Cache initialized successfully");
        Ok(cache)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY,
                latest_version TEXT NOT NULL,
                release_date TEXT,
                source TEXT NOT NULL,
                resolved_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        let stored_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if stored_version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            debug!("Updated schema version to v{}", SCHEMA_VERSION);
        } else if stored_version > SCHEMA_VERSION {
            debug!(
                "Cache schema v{} is newer than v{}, reading known columns only",
                stored_version, SCHEMA_VERSION
            );
        }

        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<ResolutionResult>, CacheError> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT latest_version, release_date, source, resolved_at
                FROM entries WHERE key = ?1
                "#,
                [key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((latest_version, release_date, source, resolved_at)) = row else {
            return Ok(None);
        };

        let release_date = release_date
            .map(|value| parse_stored_time(key, &value))
            .transpose()?;
        let resolved_at = parse_stored_time(key, &resolved_at)?;

        Ok(Some(ResolutionResult {
            latest_version,
            release_date,
            source,
            resolved_at,
        }))
    }

    /// Stores `result` under `key`, replacing any previous entry
    pub fn put(&self, key: &str, result: &ResolutionResult) -> Result<(), CacheError> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO entries (key, latest_version, release_date, source, resolved_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(key) DO UPDATE SET
                latest_version = excluded.latest_version,
                release_date = excluded.release_date,
                source = excluded.source,
                resolved_at = excluded.resolved_at
            "#,
            (
                key,
                &result.latest_version,
                result.release_date.map(|d| d.to_rfc3339()),
                &result.source,
                result.resolved_at.to_rfc3339(),
            ),
        )?;

        tx.commit()?;
        debug!("Cached {} -> {}", key, result.latest_version);
        Ok(())
    }

    /// Number of stored entries
    pub fn len(&self) -> Result<usize, CacheError> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    /// Moves committed writes from the WAL into the main database file
    pub fn flush(&self) -> Result<(), CacheError> {
        if self.path.is_none() {
            return Ok(());
        }
        let conn = self.lock_conn()?;
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        debug!("Cache checkpointed");
        Ok(())
    }
}

fn parse_stored_time(key: &str, value: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| CacheError::InvalidEntry {
            key: key.to_string(),
            reason: format!("bad timestamp '{}': {}", value, e),
        })
}
