// Alarm settings module
// Process-wide alarm configuration persisted as a single JSON record

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Upper bound for the reminder interval, in minutes.
pub const MAX_REMINDER_INTERVAL: u32 = 60;

/// Alarm configuration. Missing fields in a stored record take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlarmSettings {
    pub enabled: bool,
    pub sound_enabled: bool,
    pub vibration_enabled: bool,
    /// Minutes between reminder pulses; 0 disables them
    pub reminder_interval: u32,
    pub last_updated: Option<DateTime<Local>>,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sound_enabled: true,
            vibration_enabled: true,
            reminder_interval: 5,
            last_updated: None,
        }
    }
}

impl AlarmSettings {
    /// Merge a partial update onto this snapshot.
    pub fn apply(&mut self, patch: &AlarmSettingsPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(sound) = patch.sound_enabled {
            self.sound_enabled = sound;
        }
        if let Some(vibration) = patch.vibration_enabled {
            self.vibration_enabled = vibration;
        }
        if let Some(interval) = patch.reminder_interval {
            self.reminder_interval = interval.min(MAX_REMINDER_INTERVAL);
        }
    }

    /// Clamp out-of-range values from older or hand-edited records.
    pub fn sanitized(mut self) -> Self {
        self.reminder_interval = self.reminder_interval.min(MAX_REMINDER_INTERVAL);
        self
    }
}

/// Partial update for [`AlarmSettings`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmSettingsPatch {
    pub enabled: Option<bool>,
    pub sound_enabled: Option<bool>,
    pub vibration_enabled: Option<bool>,
    pub reminder_interval: Option<u32>,
}

impl AlarmSettingsPatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn reminder_interval(minutes: u32) -> Self {
        Self {
            reminder_interval: Some(minutes),
            ..Self::default()
        }
    }
}
