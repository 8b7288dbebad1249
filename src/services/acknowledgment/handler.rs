use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};

use crate::error::{AlarmError, AlarmResult};
use crate::models::history::{HistoryEntry, HistoryStatus};
use crate::models::schedule::{AlarmPayload, OccurrenceState, ScheduleKey};
use crate::services::history::HistorySink;
use crate::services::notification::{NotificationResponse, ResponseAction};
use crate::services::schedule::TriggerDispatcher;

use super::events::AlarmEvent;
use super::presenter::AlarmPresenter;

/// Result of a user action on a presented alarm.
#[derive(Debug, Clone, PartialEq)]
pub enum AckOutcome {
    Taken(HistoryEntry),
    Snoozed(ScheduleKey),
    Cancelled {
        entry: HistoryEntry,
        cancelled_schedules: usize,
    },
    /// The occurrence was already acknowledged; nothing was written
    AlreadyRecorded(OccurrenceState),
}

/// Applies take / snooze / cancel to presented occurrences.
pub struct AcknowledgmentHandler {
    dispatcher: Arc<TriggerDispatcher>,
    history: Arc<dyn HistorySink>,
    // Serialises acknowledgments so check, write and commit happen together
    ack: Mutex<()>,
}

impl AcknowledgmentHandler {
    pub fn new(dispatcher: Arc<TriggerDispatcher>, history: Arc<dyn HistorySink>) -> Self {
        Self {
            dispatcher,
            history,
            ack: Mutex::new(()),
        }
    }

    fn presenter(&self) -> &AlarmPresenter {
        self.dispatcher.presenter()
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.ack.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn present(&self, payload: AlarmPayload) -> bool {
        self.presenter().present(payload)
    }

    /// A platform notification was delivered while the app is running.
    pub fn on_notification_received(&self, payload: AlarmPayload) -> bool {
        log::debug!("Notification received: {}", payload.occurrence_id);
        self.presenter().present(payload)
    }

    /// Route an action button (or a plain tap) from a delivered notification.
    pub fn on_notification_response(
        &self,
        response: NotificationResponse,
    ) -> AlarmResult<Option<AckOutcome>> {
        log::info!(
            "Notification response {:?} for {}",
            response.action,
            response.identifier
        );
        match response.action {
            ResponseAction::Open => {
                self.presenter().present(response.payload);
                Ok(None)
            }
            ResponseAction::Take => self.on_take(&response.payload).map(Some),
            ResponseAction::Snooze => self.on_snooze(&response.payload).map(Some),
            ResponseAction::Cancel => self.on_cancel(&response.payload).map(Some),
        }
    }

    pub fn on_take(&self, payload: &AlarmPayload) -> AlarmResult<AckOutcome> {
        self.on_take_at(payload, Local::now())
    }

    /// Record the dose as taken and silence the rest of this slot's reminders.
    pub fn on_take_at(&self, payload: &AlarmPayload, now: DateTime<Local>) -> AlarmResult<AckOutcome> {
        let _guard = self.lock();
        if let Some(outcome) = self.already_recorded(payload) {
            return Ok(outcome);
        }
        self.presenter().ensure_presented(payload)?;

        let entry = HistoryEntry::from_payload(payload, HistoryStatus::Taken, now);
        self.history.append(&entry).map_err(AlarmError::persistence)?;
        self.presenter()
            .ledger()
            .transition(&payload.occurrence_id, OccurrenceState::Taken)?;
        self.stop_feedback(payload);

        let reminders = match payload.key() {
            Some(key) => self
                .dispatcher
                .store()
                .cancel_matching(|k| k.kind.is_reminder() && k.same_slot(&key)),
            None => 0,
        };

        log::info!(
            "{} ({}) taken, {} reminders cancelled",
            payload.medication_name,
            payload.dose,
            reminders
        );
        self.presenter()
            .events()
            .publish(AlarmEvent::Taken(payload.clone()));
        Ok(AckOutcome::Taken(entry))
    }

    pub fn on_snooze(&self, payload: &AlarmPayload) -> AlarmResult<AckOutcome> {
        self.on_snooze_at(payload, Local::now())
    }

    /// Schedule one snooze occurrence. No history is written.
    pub fn on_snooze_at(&self, payload: &AlarmPayload, now: DateTime<Local>) -> AlarmResult<AckOutcome> {
        let _guard = self.lock();
        if let Some(outcome) = self.already_recorded(payload) {
            return Ok(outcome);
        }
        self.presenter().ensure_presented(payload)?;

        let next = self.dispatcher.schedule_snooze(payload, now)?;
        self.presenter()
            .ledger()
            .transition(&payload.occurrence_id, OccurrenceState::Snoozed)?;
        self.stop_feedback(payload);

        log::info!("{} snoozed until {}", payload.medication_name, next);
        self.presenter().events().publish(AlarmEvent::Snoozed {
            payload: payload.clone(),
            next: next.clone(),
        });
        Ok(AckOutcome::Snoozed(next))
    }

    pub fn on_cancel(&self, payload: &AlarmPayload) -> AlarmResult<AckOutcome> {
        self.on_cancel_at(payload, Local::now())
    }

    /// Record the dose as skipped and drop every schedule of the medication.
    pub fn on_cancel_at(&self, payload: &AlarmPayload, now: DateTime<Local>) -> AlarmResult<AckOutcome> {
        let _guard = self.lock();
        if let Some(outcome) = self.already_recorded(payload) {
            return Ok(outcome);
        }
        self.presenter().ensure_presented(payload)?;

        let entry = HistoryEntry::from_payload(payload, HistoryStatus::Cancelled, now);
        self.history.append(&entry).map_err(AlarmError::persistence)?;
        self.presenter()
            .ledger()
            .transition(&payload.occurrence_id, OccurrenceState::Cancelled)?;
        self.stop_feedback(payload);

        let cancelled_schedules = self.dispatcher.cancel_all(&payload.medication_id);

        log::info!(
            "{} cancelled, {} schedules removed",
            payload.medication_name,
            cancelled_schedules
        );
        self.presenter()
            .events()
            .publish(AlarmEvent::Cancelled(payload.clone()));
        Ok(AckOutcome::Cancelled {
            entry,
            cancelled_schedules,
        })
    }

    fn already_recorded(&self, payload: &AlarmPayload) -> Option<AckOutcome> {
        match self.presenter().ledger().state(&payload.occurrence_id) {
            Some(state) if state.is_terminal() => {
                log::info!("{} already {:?}", payload.occurrence_id, state);
                Some(AckOutcome::AlreadyRecorded(state))
            }
            _ => None,
        }
    }

    fn stop_feedback(&self, payload: &AlarmPayload) {
        self.presenter().events().publish(AlarmEvent::FeedbackStopped {
            occurrence_id: payload.occurrence_id.clone(),
        });
    }
}
