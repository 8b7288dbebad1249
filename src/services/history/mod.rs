//! Append-only history log of acknowledged alarms.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use rusqlite::types::Type;
use rusqlite::{params, Row};

use crate::models::history::{HistoryEntry, HistoryStatus};
use crate::services::database::Database;

/// Destination for history entries written by the acknowledgment flow.
#[cfg_attr(test, mockall::automock)]
pub trait HistorySink: Send + Sync {
    /// Append an entry. Appending an entry whose id is already stored is a
    /// no-op, so a retried write never produces a duplicate row.
    fn append(&self, entry: &HistoryEntry) -> Result<()>;
}

/// SQLite-backed history log.
pub struct HistoryRepository {
    db: Arc<Database>,
}

impl HistoryRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Most recent entries first.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, medication_id, name, dose, scheduled_times, status, at
                 FROM history ORDER BY at DESC, created_at DESC LIMIT ?1",
            )?;
            let entries = stmt
                .query_map([limit as i64], row_to_entry)?
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to load history")?;
            Ok(entries)
        })
    }

    pub fn count_for_medication(&self, medication_id: &str, status: HistoryStatus) -> Result<usize> {
        self.db.with_connection(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM history WHERE medication_id = ?1 AND status = ?2",
                    params![medication_id, status.as_str()],
                    |row| row.get(0),
                )
                .context("Failed to count history entries")?;
            Ok(count as usize)
        })
    }
}

impl HistorySink for HistoryRepository {
    fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let scheduled_times = serde_json::to_string(&entry.scheduled_times)?;

        self.db.with_connection(|conn| {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO history
                        (id, medication_id, name, dose, scheduled_times, status, at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        &entry.id,
                        &entry.medication_id,
                        &entry.name,
                        &entry.dose,
                        scheduled_times,
                        entry.status.as_str(),
                        entry.at.to_rfc3339(),
                    ],
                )
                .context("Failed to append history entry")?;

            if inserted == 0 {
                log::debug!("History entry {} already recorded", entry.id);
            }
            Ok(())
        })
    }
}

fn row_to_entry(row: &Row) -> Result<HistoryEntry, rusqlite::Error> {
    let scheduled_times: String = row.get(4)?;
    let status: String = row.get(5)?;
    let at: String = row.get(6)?;

    Ok(HistoryEntry {
        id: row.get(0)?,
        medication_id: row.get(1)?,
        name: row.get(2)?,
        dose: row.get(3)?,
        scheduled_times: serde_json::from_str(&scheduled_times)
            .map_err(|e| conversion_error(4, e.into()))?,
        status: HistoryStatus::parse(&status)
            .ok_or_else(|| conversion_error(5, format!("unknown status {:?}", status).into()))?,
        at: DateTime::parse_from_rfc3339(&at)
            .map(|dt| dt.with_timezone(&Local))
            .map_err(|e| conversion_error(6, e.into()))?,
    })
}

fn conversion_error(
    column: usize,
    err: Box<dyn std::error::Error + Send + Sync>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, err)
}
