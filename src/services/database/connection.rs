use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;

use super::schema;

/// Thin wrapper around the application's SQLite connection.
///
/// The connection sits behind a mutex so the database can be shared between
/// the settings gate, the history log and timer callbacks.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (or creates) a SQLite database at the provided path and
    /// enables foreign keys immediately.
    ///
    /// # Examples
    /// ```
    /// use medtime::services::database::Database;
    /// let db = Database::new(":memory:").unwrap();
    /// db.initialize_schema().unwrap();
    /// ```
    pub fn new(path: &str) -> Result<Self> {
        let conn =
            Connection::open(path).context(format!("Failed to open database at {}", path))?;

        conn.execute("PRAGMA foreign_keys = ON", [])
            .context("Failed to enable foreign keys")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates the tables if they do not exist.
    pub fn initialize_schema(&self) -> Result<()> {
        self.with_connection(schema::initialize_schema)
    }

    /// Runs `f` with exclusive access to the underlying `rusqlite::Connection`.
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))?;
        f(&conn)
    }
}
