use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::Local;

use crate::error::{AlarmError, AlarmResult};
use crate::models::alarm_settings::{AlarmSettings, AlarmSettingsPatch};
use crate::services::database::KeyValueStore;

/// Fixed key of the persisted settings record.
pub const ALARM_SETTINGS_KEY: &str = "medtime_alarm_settings";

/// Reads the alarm configuration and decides whether anything gets scheduled.
///
/// The record is loaded lazily on first use and cached. Updates are
/// read-modify-write against the cached snapshot; two concurrent updates
/// resolve last-write-wins.
pub struct SettingsGate {
    store: Arc<dyn KeyValueStore>,
    cached: Mutex<Option<AlarmSettings>>,
}

impl SettingsGate {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cached: Mutex::new(None),
        }
    }

    /// Get the current settings, falling back to defaults on first run
    pub fn get(&self) -> AlarmResult<AlarmSettings> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(settings) = cached.as_ref() {
            return Ok(settings.clone());
        }

        let loaded = self.load().map_err(AlarmError::persistence)?;
        *cached = Some(loaded.clone());
        Ok(loaded)
    }

    pub fn is_enabled(&self) -> AlarmResult<bool> {
        Ok(self.get()?.enabled)
    }

    /// Merge `patch` onto the last loaded snapshot and persist the result.
    pub fn update(&self, patch: &AlarmSettingsPatch) -> AlarmResult<AlarmSettings> {
        let mut settings = self.get()?;
        settings.apply(patch);
        settings.last_updated = Some(Local::now());

        self.save(&settings).map_err(AlarmError::persistence)?;

        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        *cached = Some(settings.clone());
        Ok(settings)
    }

    /// Reset settings to defaults
    pub fn reset(&self) -> AlarmResult<()> {
        self.store
            .remove(ALARM_SETTINGS_KEY)
            .context("Failed to reset alarm settings")
            .map_err(AlarmError::persistence)?;

        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        *cached = None;
        log::info!("Alarm settings reset to defaults");
        Ok(())
    }

    fn load(&self) -> Result<AlarmSettings> {
        let stored = self
            .store
            .get(ALARM_SETTINGS_KEY)
            .context("Failed to load alarm settings")?;

        let Some(raw) = stored else {
            return Ok(AlarmSettings::default());
        };

        match serde_json::from_str::<AlarmSettings>(&raw) {
            Ok(settings) => Ok(settings.sanitized()),
            Err(e) => {
                log::warn!("Stored alarm settings are unreadable ({}), using defaults", e);
                Ok(AlarmSettings::default())
            }
        }
    }

    fn save(&self, settings: &AlarmSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.store
            .set(ALARM_SETTINGS_KEY, &json)
            .context("Failed to save alarm settings")?;
        log::info!(
            "Alarm settings saved: enabled={}, sound={}, vibration={}, interval={}m",
            settings.enabled,
            settings.sound_enabled,
            settings.vibration_enabled,
            settings.reminder_interval
        );
        Ok(())
    }
}
