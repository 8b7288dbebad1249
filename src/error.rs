// Error types for the alarm scheduling boundary

use thiserror::Error;

use crate::models::schedule::OccurrenceState;

/// Failures surfaced to callers of the scheduling and acknowledgment services.
///
/// Per-slot problems (a malformed time, one rejected platform request) are
/// logged and skipped inside batch operations; only boundary failures are
/// returned as errors.
#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("invalid time of day: {0}")]
    InvalidTime(String),

    #[error("invalid medication: {0}")]
    InvalidMedication(String),

    #[error("notification permission was not granted")]
    PermissionDenied,

    #[error("persistence failure: {0:#}")]
    Persistence(anyhow::Error),

    #[error("platform notification service failed: {0}")]
    Platform(String),

    #[error("occurrence {occurrence} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        occurrence: String,
        from: OccurrenceState,
        to: OccurrenceState,
    },
}

impl AlarmError {
    pub fn persistence(err: anyhow::Error) -> Self {
        AlarmError::Persistence(err)
    }
}

pub type AlarmResult<T> = Result<T, AlarmError>;
