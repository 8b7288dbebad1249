// Test fixtures - reusable services and data
// Builds the full service graph over a recording notifier

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use chrono::{DateTime, Local, TimeZone};
use tokio::runtime::Handle;

use medtime::config::DispatchConfig;
use medtime::models::alarm_settings::AlarmSettingsPatch;
use medtime::models::medication::Medication;
use medtime::services::acknowledgment::{
    AcknowledgmentHandler, AlarmEvents, AlarmPresenter, OccurrenceLedger,
};
use medtime::services::database::Database;
use medtime::services::history::HistoryRepository;
use medtime::services::notification::{
    NotificationChannel, NotificationRequest, PermissionStatus, PlatformNotifier,
    ScheduledNotification,
};
use medtime::services::schedule::{ScheduleStore, TriggerDispatcher};
use medtime::services::settings::SettingsGate;

/// 15 June 2026 at the given local wall-clock time
pub fn at(hour: u32, minute: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 6, 15, hour, minute, 0).unwrap()
}

pub fn paracetamol(times: &[&str]) -> Medication {
    Medication::new("m1", "Paracetamol", "500 mg", times.iter().copied()).unwrap()
}

pub fn ibuprofen(times: &[&str]) -> Medication {
    Medication::new("m2", "Ibuprofen", "200 mg", times.iter().copied()).unwrap()
}

/// Platform notifier that keeps requests in memory.
pub struct RecordingNotifier {
    permission: PermissionStatus,
    rejected_slot: Option<String>,
    scheduled: Mutex<Vec<NotificationRequest>>,
    cancelled: Mutex<Vec<String>>,
    channels: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn granted() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            rejected_slot: None,
            scheduled: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            channels: Mutex::new(Vec::new()),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            ..Self::granted()
        }
    }

    /// Reject every request for this slot.
    pub fn rejecting(slot: &str) -> Self {
        Self {
            rejected_slot: Some(slot.to_string()),
            ..Self::granted()
        }
    }

    /// Requests still pending on the "platform".
    pub fn pending(&self) -> Vec<NotificationRequest> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn channels(&self) -> Vec<String> {
        self.channels.lock().unwrap().clone()
    }
}

impl PlatformNotifier for RecordingNotifier {
    fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    fn ensure_channel(&self, channel: &NotificationChannel) -> Result<()> {
        let mut channels = self.channels.lock().unwrap();
        if !channels.contains(&channel.id) {
            channels.push(channel.id.clone());
        }
        Ok(())
    }

    fn schedule_at(&self, request: &NotificationRequest) -> Result<()> {
        if self.rejected_slot.as_deref() == Some(request.payload.scheduled_time.as_str()) {
            bail!("platform rejected {}", request.identifier);
        }
        let mut scheduled = self.scheduled.lock().unwrap();
        scheduled.retain(|r| r.identifier != request.identifier);
        scheduled.push(request.clone());
        Ok(())
    }

    fn cancel(&self, identifier: &str) -> Result<()> {
        self.scheduled
            .lock()
            .unwrap()
            .retain(|r| r.identifier != identifier);
        self.cancelled.lock().unwrap().push(identifier.to_string());
        Ok(())
    }

    fn list_scheduled(&self) -> Result<Vec<ScheduledNotification>> {
        Ok(self
            .pending()
            .into_iter()
            .map(|r| ScheduledNotification {
                identifier: r.identifier,
                payload: Some(r.payload),
                trigger_at: Some(r.trigger_at),
            })
            .collect())
    }
}

/// Every service wired together the way the binary does it.
pub struct Services {
    pub db: Arc<Database>,
    pub settings: Arc<SettingsGate>,
    pub events: AlarmEvents,
    pub dispatcher: Arc<TriggerDispatcher>,
    pub handler: Arc<AcknowledgmentHandler>,
}

impl Services {
    /// Must be called from inside a tokio runtime.
    pub fn new(db: Arc<Database>, notifier: Arc<dyn PlatformNotifier>) -> Self {
        let events = AlarmEvents::default();
        let presenter = AlarmPresenter::new(
            Arc::new(ScheduleStore::new(notifier.clone())),
            Arc::new(OccurrenceLedger::new()),
            events.clone(),
        );
        let settings = Arc::new(SettingsGate::new(db.clone()));
        let dispatcher = Arc::new(TriggerDispatcher::new(
            presenter,
            settings.clone(),
            notifier,
            DispatchConfig::default(),
            Handle::current(),
        ));
        let handler = Arc::new(AcknowledgmentHandler::new(
            dispatcher.clone(),
            Arc::new(HistoryRepository::new(db.clone())),
        ));

        Self {
            db,
            settings,
            events,
            dispatcher,
            handler,
        }
    }

    pub fn in_memory(notifier: Arc<dyn PlatformNotifier>) -> Self {
        let db = Arc::new(Database::new(":memory:").unwrap());
        db.initialize_schema().unwrap();
        Self::new(db, notifier)
    }

    pub fn with_reminder_interval(self, minutes: u32) -> Self {
        self.settings
            .update(&AlarmSettingsPatch::reminder_interval(minutes))
            .unwrap();
        self
    }

    pub fn history(&self) -> HistoryRepository {
        HistoryRepository::new(self.db.clone())
    }
}
