//! `SQLite`-backed key-value medium

use std::path::Path;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::{check_capacity, migrations, KeyValueStorage, StorageUsage};
use crate::error::{Error, Result};

/// Database wrapper holding a single `kv_store` table
pub struct Database {
    conn: Connection,
    capacity_bytes: Option<usize>,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Limit the bytes all keys and values may occupy
    #[must_use]
    pub const fn with_capacity(mut self, capacity_bytes: usize) -> Self {
        self.capacity_bytes = Some(capacity_bytes);
        self
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migrations::run(&conn)?;

        Ok(Self {
            conn,
            capacity_bytes: None,
        })
    }

    fn entry_bytes(&self, key: &str) -> Result<usize> {
        let bytes: Option<i64> = self
            .conn
            .query_row(
                "SELECT length(CAST(key AS BLOB)) + length(CAST(value AS BLOB)) FROM kv_store WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(to_usize(bytes.unwrap_or(0)))
    }
}

impl KeyValueStorage for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let usage = self.usage()?;
        check_capacity(usage, self.entry_bytes(key)?, key.len() + value.len())?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
                params![key, value],
            )
            .map_err(|error| map_write_error(error, key.len() + value.len(), usage))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?", params![key])?;
        Ok(())
    }

    fn usage(&self) -> Result<StorageUsage> {
        let used: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0) FROM kv_store",
            [],
            |row| row.get(0),
        )?;
        Ok(StorageUsage {
            used_bytes: to_usize(used),
            capacity_bytes: self.capacity_bytes,
        })
    }
}

/// `SQLITE_FULL` is the medium's own "write too large" signal.
fn map_write_error(error: rusqlite::Error, requested: usize, usage: StorageUsage) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::DiskFull => {
            Error::CapacityExceeded {
                requested,
                available: usage.available_bytes().unwrap_or(0),
            }
        }
        other => Error::Database(other),
    }
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get("missing").unwrap(), None);

        db.set("key", "value").unwrap();
        db.set("key", "value-2").unwrap();
        assert_eq!(db.get("key").unwrap().as_deref(), Some("value-2"));

        db.remove("key").unwrap();
        assert_eq!(db.get("key").unwrap(), None);
    }

    #[test]
    fn usage_counts_key_and_value_bytes() {
        let db = Database::open_in_memory().unwrap();
        db.set("ab", "cdé").unwrap();
        assert_eq!(db.usage().unwrap().used_bytes, 2 + "cdé".len());
    }

    #[test]
    fn capacity_budget_rejects_oversized_write() {
        let db = Database::open_in_memory().unwrap().with_capacity(16);
        db.set("k", "small").unwrap();

        let error = db.set("k", &"x".repeat(64)).unwrap_err();
        assert!(error.is_capacity());
        assert_eq!(db.get("k").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pomo.db");

        Database::open(&path).unwrap().set("k", "v").unwrap();
        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }
}
