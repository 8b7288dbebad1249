//! Platform notification collaborator.
//!
//! The OS notification service is outside this crate's control; the
//! scheduling core only talks to it through [`PlatformNotifier`].

mod desktop;

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::models::schedule::AlarmPayload;

pub use desktop::DesktopNotifier;

/// Default channel used for medication alarms.
pub const DEFAULT_CHANNEL_ID: &str = "medtime-reminders";
/// Category carrying the take / snooze / cancel action buttons.
pub const ALARM_CATEGORY: &str = "MEDICATION_ALARM";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Delivery channel configuration (Android-style channels, no-op elsewhere).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub vibration_pattern: Vec<u64>,
}

impl NotificationChannel {
    pub fn medication_reminders(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: "Medication reminders".to_string(),
            description: "Alerts when it is time to take a medication".to_string(),
            vibration_pattern: vec![0, 250, 250, 250],
        }
    }
}

/// One request to show a notification at a future instant.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub payload: AlarmPayload,
    pub trigger_at: DateTime<Local>,
    pub channel_id: String,
    pub category: String,
    pub sound: bool,
    pub vibrate: bool,
}

/// A notification the platform still holds for future delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledNotification {
    pub identifier: String,
    pub payload: Option<AlarmPayload>,
    pub trigger_at: Option<DateTime<Local>>,
}

/// Button (or plain tap) the user chose on a delivered notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseAction {
    /// Tapped the notification body
    Open,
    Take,
    Snooze,
    Cancel,
}

impl ResponseAction {
    pub fn from_identifier(action: &str) -> Self {
        match action {
            "take" => ResponseAction::Take,
            "snooze" => ResponseAction::Snooze,
            "cancel" => ResponseAction::Cancel,
            _ => ResponseAction::Open,
        }
    }
}

/// A user response reported by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationResponse {
    pub identifier: String,
    pub action: ResponseAction,
    pub payload: AlarmPayload,
}

/// Operations the scheduling core needs from the OS notification service.
#[cfg_attr(test, mockall::automock)]
pub trait PlatformNotifier: Send + Sync {
    fn request_permission(&self) -> PermissionStatus;

    /// Configure the delivery channel. Must be idempotent.
    fn ensure_channel(&self, channel: &NotificationChannel) -> Result<()>;

    fn schedule_at(&self, request: &NotificationRequest) -> Result<()>;

    /// Cancel a scheduled notification. Unknown identifiers are not an error.
    fn cancel(&self, identifier: &str) -> Result<()>;

    fn list_scheduled(&self) -> Result<Vec<ScheduledNotification>>;
}
