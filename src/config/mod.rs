//! Runtime configuration.
//!
//! Loaded from `medtime.toml` in the platform config directory. A missing file
//! yields defaults and every field may be omitted individually.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::services::notification::DEFAULT_CHANNEL_ID;
use crate::services::schedule::time_resolver::RolloverPolicy;

pub const CONFIG_FILE_NAME: &str = "medtime.toml";
pub const DATABASE_FILE_NAME: &str = "medtime.db";

/// Thresholds steering how occurrences are resolved and delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Leads shorter than this use an in-process timer, others the platform
    pub timer_horizon_secs: i64,
    /// Natural leads in `[timer_horizon, compression_window)` are compressed
    pub compression_window_secs: i64,
    /// Lead used for compressed occurrences
    pub compression_delay_secs: i64,
    /// Every trigger is at least this far in the future
    pub min_lead_secs: i64,
    pub snooze_minutes: i64,
    /// Reminder pulses scheduled after each primary occurrence
    pub max_reminders: u8,
    pub rollover: RolloverPolicy,
    pub channel_id: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timer_horizon_secs: 120,
            compression_window_secs: 300,
            compression_delay_secs: 10,
            min_lead_secs: 1,
            snooze_minutes: 10,
            max_reminders: 3,
            rollover: RolloverPolicy::CalendarDay,
            channel_id: DEFAULT_CHANNEL_ID.to_string(),
        }
    }
}

impl DispatchConfig {
    pub fn timer_horizon(&self) -> Duration {
        Duration::seconds(self.timer_horizon_secs)
    }

    pub fn compression_window(&self) -> Duration {
        Duration::seconds(self.compression_window_secs)
    }

    pub fn compression_delay(&self) -> Duration {
        Duration::seconds(self.compression_delay_secs)
    }

    pub fn min_lead(&self) -> Duration {
        Duration::seconds(self.min_lead_secs.max(1))
    }

    pub fn snooze_delay(&self) -> Duration {
        Duration::minutes(self.snooze_minutes)
    }

    /// Reject combinations that would make the compression rule misbehave.
    pub fn validate(&self) -> Result<(), String> {
        if self.timer_horizon_secs <= 0 {
            return Err("timer_horizon_secs must be positive".to_string());
        }
        if self.compression_window_secs < self.timer_horizon_secs {
            return Err("compression_window_secs must not be shorter than timer_horizon_secs".to_string());
        }
        if self.compression_delay_secs <= 0 {
            return Err("compression_delay_secs must be positive".to_string());
        }
        if self.snooze_minutes <= 0 {
            return Err("snooze_minutes must be positive".to_string());
        }
        if self.channel_id.trim().is_empty() {
            return Err("channel_id cannot be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Overrides the database location inside the data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    pub dispatch: DispatchConfig,
}

impl AppConfig {
    pub fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "MedTime", "MedTime")
    }

    /// Load from the platform config directory, falling back to defaults.
    pub fn load_default() -> Result<Self> {
        match Self::project_dirs() {
            Some(dirs) => Self::load(&dirs.config_dir().join(CONFIG_FILE_NAME)),
            None => {
                log::warn!("No home directory found, using default configuration");
                Ok(Self::default())
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        config
            .dispatch
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Database location: the configured path, else the platform data dir.
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let dirs = Self::project_dirs().context("Failed to locate data directory")?;
        let data_dir = dirs.data_dir();
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        Ok(data_dir.join(DATABASE_FILE_NAME))
    }
}
