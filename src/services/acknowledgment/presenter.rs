use std::sync::Arc;

use crate::error::AlarmResult;
use crate::models::schedule::{AlarmPayload, OccurrenceState, PayloadSource};
use crate::services::schedule::ScheduleStore;

use super::events::{AlarmEvent, AlarmEvents};
use super::ledger::OccurrenceLedger;

/// Turns a fired occurrence into a `Presented` event.
///
/// Shared by timer tasks and the platform delivery path, so it is cheap to
/// clone.
#[derive(Clone)]
pub struct AlarmPresenter {
    store: Arc<ScheduleStore>,
    ledger: Arc<OccurrenceLedger>,
    events: AlarmEvents,
}

impl AlarmPresenter {
    pub fn new(store: Arc<ScheduleStore>, ledger: Arc<OccurrenceLedger>, events: AlarmEvents) -> Self {
        Self {
            store,
            ledger,
            events,
        }
    }

    pub fn store(&self) -> &Arc<ScheduleStore> {
        &self.store
    }

    pub fn ledger(&self) -> &Arc<OccurrenceLedger> {
        &self.ledger
    }

    pub fn events(&self) -> &AlarmEvents {
        &self.events
    }

    /// Present a fired occurrence. Returns `false` when it was dropped.
    ///
    /// A locally fired payload whose handle is no longer live lost the race
    /// against a cancel and is dropped. Platform deliveries are presented even
    /// without a live handle, since they may predate this process.
    pub fn present(&self, payload: AlarmPayload) -> bool {
        if let Some(key) = payload.key() {
            let fired = self.store.complete_fired(&key);
            if fired.is_none() && payload.source == PayloadSource::Local {
                log::debug!("Timer {} was cancelled before firing", payload.occurrence_id);
                return false;
            }
        }

        if let Err(e) = self.ledger.transition(&payload.occurrence_id, OccurrenceState::Presented) {
            log::debug!("Not presenting {}: {}", payload.occurrence_id, e);
            return false;
        }

        log::info!(
            "Presenting {:?} alarm for {} ({}) from {:?}",
            payload.kind,
            payload.medication_name,
            payload.dose,
            payload.source
        );
        self.events.publish(AlarmEvent::Presented(payload));
        true
    }

    /// Make sure an occurrence the user acted on counts as presented, even if
    /// the action arrived straight from a notification button.
    pub(crate) fn ensure_presented(&self, payload: &AlarmPayload) -> AlarmResult<()> {
        if self.ledger.state(&payload.occurrence_id) == Some(OccurrenceState::Presented) {
            return Ok(());
        }

        if let Some(key) = payload.key() {
            self.store.complete_fired(&key);
        }
        self.ledger
            .transition(&payload.occurrence_id, OccurrenceState::Presented)?;
        Ok(())
    }
}
