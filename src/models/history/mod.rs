// History module
// Append-only record of how a presented alarm was resolved

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::models::schedule::AlarmPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryStatus {
    Taken,
    Cancelled,
}

impl HistoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryStatus::Taken => "Taken",
            HistoryStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Taken" => Some(HistoryStatus::Taken),
            "Cancelled" => Some(HistoryStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub medication_id: String,
    pub name: String,
    pub dose: String,
    pub scheduled_times: Vec<String>,
    pub status: HistoryStatus,
    pub at: DateTime<Local>,
}

impl HistoryEntry {
    /// Build the entry recording a decision on a presented occurrence.
    ///
    /// The id is derived from the occurrence and the status, so appending the
    /// same decision twice hits the same row.
    pub fn from_payload(payload: &AlarmPayload, status: HistoryStatus, at: DateTime<Local>) -> Self {
        Self {
            id: format!("{}:{}", payload.occurrence_id, status.as_str()),
            medication_id: payload.medication_id.clone(),
            name: payload.medication_name.clone(),
            dose: payload.dose.clone(),
            scheduled_times: vec![payload.scheduled_time.clone()],
            status,
            at,
        }
    }
}
