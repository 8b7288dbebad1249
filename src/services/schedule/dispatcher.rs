// Trigger dispatcher
// Decides when and how each occurrence fires, then registers it

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Local};
use tokio::runtime::Handle;

use crate::config::DispatchConfig;
use crate::error::{AlarmError, AlarmResult};
use crate::models::alarm_settings::AlarmSettings;
use crate::models::medication::Medication;
use crate::models::schedule::{
    AlarmPayload, Mechanism, PayloadSource, ScheduleHandle, ScheduleKey, ScheduleKind,
};
use crate::services::acknowledgment::AlarmPresenter;
use crate::services::notification::{
    NotificationChannel, NotificationRequest, PermissionStatus, PlatformNotifier,
    ScheduledNotification, ALARM_CATEGORY,
};
use crate::services::settings::SettingsGate;

use super::planner::{plan_medication, select_mechanism, PlannedOccurrence};
use super::store::{ScheduleResource, ScheduleStore};

/// Medication id used by the demo alarm.
pub const TEST_MEDICATION_ID: &str = "test";
const TEST_ALARM_DELAY_SECS: i64 = 5;

/// What is scheduled right now, locally and on the platform.
#[derive(Debug, Clone, Default)]
pub struct ScheduleDiagnostics {
    pub active: Vec<ScheduleHandle>,
    pub platform: Vec<ScheduledNotification>,
}

pub struct TriggerDispatcher {
    store: Arc<ScheduleStore>,
    settings: Arc<SettingsGate>,
    notifier: Arc<dyn PlatformNotifier>,
    presenter: AlarmPresenter,
    config: DispatchConfig,
    runtime: Handle,
}

impl TriggerDispatcher {
    pub fn new(
        presenter: AlarmPresenter,
        settings: Arc<SettingsGate>,
        notifier: Arc<dyn PlatformNotifier>,
        config: DispatchConfig,
        runtime: Handle,
    ) -> Self {
        Self {
            store: presenter.store().clone(),
            settings,
            notifier,
            presenter,
            config,
            runtime,
        }
    }

    pub fn store(&self) -> &Arc<ScheduleStore> {
        &self.store
    }

    pub fn presenter(&self) -> &AlarmPresenter {
        &self.presenter
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn schedule_all(&self, medication: &Medication) -> AlarmResult<Vec<ScheduleKey>> {
        self.schedule_all_at(medication, Local::now())
    }

    /// Schedule every slot of `medication` relative to `now`.
    ///
    /// Returns the keys that are live afterwards. Nothing is scheduled while
    /// alarms are disabled. Permission is requested once, before anything is
    /// registered, and only if some occurrence needs the platform.
    pub fn schedule_all_at(
        &self,
        medication: &Medication,
        now: DateTime<Local>,
    ) -> AlarmResult<Vec<ScheduleKey>> {
        medication.validate().map_err(AlarmError::InvalidMedication)?;
        self.presenter.ledger().prune_expired(now);

        let settings = self.settings.get()?;
        if !settings.enabled {
            log::info!("Alarms disabled, not scheduling {}", medication.label());
            return Ok(Vec::new());
        }

        let planned = plan_medication(&self.config, medication, settings.reminder_interval, now);
        if planned.is_empty() {
            log::warn!("No valid times to schedule for {}", medication.label());
            return Ok(Vec::new());
        }

        if planned.iter().any(|p| p.mechanism == Mechanism::Platform) {
            self.prepare_platform()?;
        }

        let keys: Vec<ScheduleKey> = planned
            .into_iter()
            .filter_map(|p| self.dispatch(p, &medication.name, &medication.dose, &settings, now))
            .collect();

        log::info!("Scheduled {} occurrences for {}", keys.len(), medication.label());
        Ok(keys)
    }

    /// Cancel every schedule of a medication. Returns how many were removed.
    pub fn cancel_all(&self, medication_id: &str) -> usize {
        let cancelled = self.store.cancel_all_for_medication(medication_id);
        self.presenter.ledger().forget_pending(|occurrence| {
            ScheduleKey::parse(occurrence).is_some_and(|key| key.references(medication_id))
        });
        cancelled
    }

    pub fn reschedule(&self, medication: &Medication) -> AlarmResult<Vec<ScheduleKey>> {
        self.reschedule_at(medication, Local::now())
    }

    /// Replace every schedule of `medication`, e.g. after it was edited.
    pub fn reschedule_at(
        &self,
        medication: &Medication,
        now: DateTime<Local>,
    ) -> AlarmResult<Vec<ScheduleKey>> {
        self.cancel_all(&medication.id);
        self.schedule_all_at(medication, now)
    }

    pub fn restore(&self, medications: &[Medication]) -> AlarmResult<Vec<ScheduleKey>> {
        self.restore_at(medications, Local::now())
    }

    /// Reschedule every stored medication at startup.
    ///
    /// Invalid records are skipped; permission and persistence failures abort.
    pub fn restore_at(
        &self,
        medications: &[Medication],
        now: DateTime<Local>,
    ) -> AlarmResult<Vec<ScheduleKey>> {
        let mut keys = Vec::new();
        for medication in medications {
            match self.reschedule_at(medication, now) {
                Ok(mut scheduled) => keys.append(&mut scheduled),
                Err(AlarmError::InvalidMedication(reason)) => {
                    log::warn!("Skipping medication {}: {}", medication.id, reason)
                }
                Err(e) => return Err(e),
            }
        }
        log::info!(
            "Restored {} schedules for {} medications",
            keys.len(),
            medications.len()
        );
        Ok(keys)
    }

    /// Schedule one snooze occurrence for a presented payload.
    ///
    /// Snoozing is an explicit user request and does not consult the enabled
    /// flag. Failing to schedule it is an error rather than a skipped slot.
    pub fn schedule_snooze(
        &self,
        payload: &AlarmPayload,
        now: DateTime<Local>,
    ) -> AlarmResult<ScheduleKey> {
        self.presenter.ledger().prune_expired(now);
        let trigger_at = now + self.config.snooze_delay();
        let key = ScheduleKey::new(
            &payload.medication_id,
            &payload.scheduled_time,
            ScheduleKind::Snooze,
            trigger_at,
        );
        self.schedule_single(key, trigger_at, &payload.medication_name, &payload.dose, now)
    }

    /// Schedule a demo alarm a few seconds out.
    pub fn schedule_test_alarm(&self, now: DateTime<Local>) -> AlarmResult<ScheduleKey> {
        let trigger_at = now + Duration::seconds(TEST_ALARM_DELAY_SECS);
        let key = ScheduleKey::new(
            TEST_MEDICATION_ID,
            trigger_at.format("%H:%M").to_string(),
            ScheduleKind::Primary,
            trigger_at,
        );
        self.schedule_single(key, trigger_at, "Test alarm", "1 dose", now)
    }

    /// Live handles and the platform's own list, both logged.
    pub fn diagnose(&self) -> ScheduleDiagnostics {
        let active = self.store.handles();
        let platform = match self.notifier.list_scheduled() {
            Ok(platform) => platform,
            Err(e) => {
                log::error!("Could not list platform notifications: {}", e);
                Vec::new()
            }
        };

        log::info!(
            "{} live schedules, {} platform notifications",
            active.len(),
            platform.len()
        );
        for handle in &active {
            log::info!(
                "  {} at {} via {:?}",
                handle.key,
                handle.trigger_at.format("%Y-%m-%d %H:%M:%S"),
                handle.mechanism
            );
        }
        for notification in &platform {
            match notification.trigger_at {
                Some(at) => log::info!(
                    "  platform {} at {}",
                    notification.identifier,
                    at.format("%Y-%m-%d %H:%M:%S")
                ),
                None => log::info!("  platform {}", notification.identifier),
            }
        }

        ScheduleDiagnostics { active, platform }
    }

    fn schedule_single(
        &self,
        key: ScheduleKey,
        trigger_at: DateTime<Local>,
        name: &str,
        dose: &str,
        now: DateTime<Local>,
    ) -> AlarmResult<ScheduleKey> {
        let settings = self.settings.get()?;
        let mechanism = select_mechanism(&self.config, trigger_at, now);
        if mechanism == Mechanism::Platform {
            self.prepare_platform()?;
        }

        let planned = PlannedOccurrence {
            key,
            trigger_at,
            mechanism,
        };
        let identifier = planned.key.to_identifier();
        self.dispatch(planned, name, dose, &settings, now)
            .ok_or_else(|| AlarmError::Platform(format!("could not schedule {}", identifier)))
    }

    fn prepare_platform(&self) -> AlarmResult<()> {
        if self.notifier.request_permission() != PermissionStatus::Granted {
            log::warn!("Notification permission not granted, nothing scheduled");
            return Err(AlarmError::PermissionDenied);
        }

        let channel = NotificationChannel::medication_reminders(&self.config.channel_id);
        if let Err(e) = self.notifier.ensure_channel(&channel) {
            log::error!("Failed to configure notification channel {}: {}", channel.id, e);
        }
        Ok(())
    }

    /// Start one occurrence and register its handle. Returns `None` when the
    /// platform rejected it.
    fn dispatch(
        &self,
        planned: PlannedOccurrence,
        name: &str,
        dose: &str,
        settings: &AlarmSettings,
        now: DateTime<Local>,
    ) -> Option<ScheduleKey> {
        let PlannedOccurrence {
            key,
            trigger_at,
            mechanism,
        } = planned;

        if self.store.contains(&key) {
            log::debug!("{} already scheduled", key);
            return Some(key);
        }

        let handle = ScheduleHandle {
            key: key.clone(),
            trigger_at,
            mechanism,
        };

        match mechanism {
            Mechanism::Timer => {
                let payload = AlarmPayload::new(&key, name, dose, PayloadSource::Local);
                let delay = (trigger_at - now).to_std().unwrap_or(StdDuration::ZERO);
                let presenter = self.presenter.clone();
                self.store.register_timer(handle, || {
                    self.runtime
                        .spawn(async move {
                            tokio::time::sleep(delay).await;
                            presenter.present(payload);
                        })
                        .abort_handle()
                });
            }
            Mechanism::Platform => {
                let payload = AlarmPayload::new(&key, name, dose, PayloadSource::Remote);
                let request = NotificationRequest {
                    identifier: key.to_identifier(),
                    title: payload.title(),
                    body: payload.body(),
                    payload,
                    trigger_at,
                    channel_id: self.config.channel_id.clone(),
                    category: ALARM_CATEGORY.to_string(),
                    sound: settings.sound_enabled,
                    vibrate: settings.vibration_enabled,
                };

                if let Err(e) = self.notifier.schedule_at(&request) {
                    log::error!("Failed to schedule notification {}: {}", request.identifier, e);
                    return None;
                }
                self.store.register(handle, ScheduleResource::Platform);
            }
        }

        self.presenter.ledger().mark_scheduled(&key.to_identifier());
        log::info!(
            "Scheduled {} at {} via {:?}",
            key,
            trigger_at.format("%Y-%m-%d %H:%M:%S"),
            mechanism
        );
        Some(key)
    }
}
