mod service;

pub use service::{SettingsGate, ALARM_SETTINGS_KEY};
