use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    create_kv_table(conn)?;
    create_history_table(conn)?;
    Ok(())
}

fn create_kv_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create kv_store table")?;

    Ok(())
}

fn create_history_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS history (
            id TEXT PRIMARY KEY,
            medication_id TEXT NOT NULL DEFAULT '',
            name TEXT NOT NULL,
            dose TEXT NOT NULL,
            scheduled_times TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL CHECK (status IN ('Taken', 'Cancelled')),
            at TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create history table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_history_at ON history(at)",
        [],
    )
    .context("Failed to create history index")?;

    Ok(())
}
