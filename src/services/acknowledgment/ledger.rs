use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Local};

use crate::error::{AlarmError, AlarmResult};
use crate::models::schedule::{OccurrenceState, ScheduleKey};

/// How long past its trigger instant an occurrence stays in the ledger.
const RETENTION_HOURS: i64 = 24;

/// Acknowledgment state of every occurrence seen by this process.
#[derive(Debug, Default)]
pub struct OccurrenceLedger {
    states: Mutex<HashMap<String, OccurrenceState>>,
}

impl OccurrenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, OccurrenceState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self, occurrence_id: &str) -> Option<OccurrenceState> {
        self.states().get(occurrence_id).copied()
    }

    /// Record a freshly scheduled occurrence. Known occurrences keep their
    /// state.
    pub fn mark_scheduled(&self, occurrence_id: &str) {
        self.states()
            .entry(occurrence_id.to_string())
            .or_insert(OccurrenceState::Scheduled);
    }

    /// Move an occurrence to `next`, returning the state it left.
    ///
    /// Occurrences the ledger never saw (scheduled by an earlier process)
    /// start from `Scheduled`.
    pub fn transition(&self, occurrence_id: &str, next: OccurrenceState) -> AlarmResult<OccurrenceState> {
        let mut states = self.states();
        let current = states
            .get(occurrence_id)
            .copied()
            .unwrap_or(OccurrenceState::Scheduled);

        if !current.can_transition_to(next) {
            return Err(AlarmError::InvalidTransition {
                occurrence: occurrence_id.to_string(),
                from: current,
                to: next,
            });
        }

        states.insert(occurrence_id.to_string(), next);
        Ok(current)
    }

    /// Drop occurrences that never reached a terminal state, e.g. after their
    /// schedules were cancelled.
    pub fn forget_pending<P>(&self, predicate: P) -> usize
    where
        P: Fn(&str) -> bool,
    {
        let mut states = self.states();
        let before = states.len();
        states.retain(|id, state| state.is_terminal() || !predicate(id));
        before - states.len()
    }

    /// Drop occurrences whose trigger instant is more than a day before
    /// `now`, whatever their state. Ids that do not parse as schedule keys
    /// are kept.
    pub fn prune_expired(&self, now: DateTime<Local>) -> usize {
        let horizon = (now - Duration::hours(RETENTION_HOURS)).timestamp_millis();
        let mut states = self.states();
        let before = states.len();
        states.retain(|id, _| {
            ScheduleKey::parse(id).map_or(true, |key| key.trigger_at_ms >= horizon)
        });
        before - states.len()
    }

    pub fn len(&self) -> usize {
        self.states().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use OccurrenceState::*;

    #[test]
    fn unknown_occurrence_starts_scheduled() {
        let ledger = OccurrenceLedger::new();
        assert_eq!(ledger.transition("a", Presented).unwrap(), Scheduled);
        assert_eq!(ledger.state("a"), Some(Presented));
    }

    #[test]
    fn terminal_states_are_final() {
        let ledger = OccurrenceLedger::new();
        ledger.transition("a", Presented).unwrap();
        ledger.transition("a", Taken).unwrap();

        let err = ledger.transition("a", Cancelled).unwrap_err();
        assert!(matches!(
            err,
            AlarmError::InvalidTransition {
                from: Taken,
                to: Cancelled,
                ..
            }
        ));
        assert_eq!(ledger.state("a"), Some(Taken));
    }

    #[test]
    fn cannot_skip_presentation() {
        let ledger = OccurrenceLedger::new();
        ledger.mark_scheduled("a");
        assert!(ledger.transition("a", Taken).is_err());
        assert_eq!(ledger.state("a"), Some(Scheduled));
    }

    #[test]
    fn mark_scheduled_keeps_existing_state() {
        let ledger = OccurrenceLedger::new();
        ledger.transition("a", Presented).unwrap();
        ledger.mark_scheduled("a");
        assert_eq!(ledger.state("a"), Some(Presented));
    }

    #[test]
    fn forget_pending_keeps_terminal_entries() {
        let ledger = OccurrenceLedger::new();
        ledger.mark_scheduled("m1_alarm_08:00_1");
        ledger.transition("m1_alarm_20:00_2", Presented).unwrap();
        ledger.transition("m1_alarm_20:00_2", Taken).unwrap();
        ledger.mark_scheduled("m2_alarm_08:00_1");

        let dropped = ledger.forget_pending(|id| id.starts_with("m1_"));

        assert_eq!(dropped, 1);
        assert_eq!(ledger.state("m1_alarm_08:00_1"), None);
        assert_eq!(ledger.state("m1_alarm_20:00_2"), Some(Taken));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn prune_expired_drops_occurrences_past_retention() {
        let now = Local.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap();
        let old = format!("m1_alarm_08:00_{}", (now - Duration::hours(30)).timestamp_millis());
        let recent = format!("m1_alarm_20:00_{}", (now - Duration::hours(16)).timestamp_millis());
        let upcoming = format!("m1_alarm_20:00_{}", (now + Duration::hours(8)).timestamp_millis());

        let ledger = ledger_with_taken(&old);
        ledger.mark_scheduled(&recent);
        ledger.mark_scheduled(&upcoming);
        ledger.mark_scheduled("not-a-key");

        assert_eq!(ledger.prune_expired(now), 1);
        assert_eq!(ledger.state(&old), None);
        assert_eq!(ledger.state(&recent), Some(Scheduled));
        assert_eq!(ledger.state(&upcoming), Some(Scheduled));
        assert_eq!(ledger.state("not-a-key"), Some(Scheduled));
    }

    fn ledger_with_taken(id: &str) -> OccurrenceLedger {
        let ledger = OccurrenceLedger::new();
        ledger.transition(id, Presented).unwrap();
        ledger.transition(id, Taken).unwrap();
        ledger
    }
}
