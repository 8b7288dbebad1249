//! Key-value persistence for small JSON records such as alarm settings.

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use super::Database;

/// Persistent string store addressed by fixed keys.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read key {}", key))
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at)
                 VALUES (?1, ?2, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = CURRENT_TIMESTAMP",
                params![key, value],
            )
            .with_context(|| format!("Failed to write key {}", key))?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])
                .with_context(|| format!("Failed to remove key {}", key))?;
            Ok(())
        })
    }
}
