// Schedule module
// Keys, handles and payloads describing scheduled medication occurrences

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Why an occurrence was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    /// The dose time itself
    Primary,
    /// Follow-up pulse number `n` (1-based) after the primary occurrence
    Reminder(u8),
    /// Re-scheduled by the user from a presented alarm
    Snooze,
}

impl ScheduleKind {
    fn tag(&self) -> String {
        match self {
            ScheduleKind::Primary => "alarm".to_string(),
            ScheduleKind::Reminder(n) => format!("reminder_{}", n),
            ScheduleKind::Snooze => "snooze".to_string(),
        }
    }

    pub fn is_reminder(&self) -> bool {
        matches!(self, ScheduleKind::Reminder(_))
    }
}

/// How an occurrence is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mechanism {
    /// In-process timer, only fires while the process is alive
    Timer,
    /// OS-level scheduled notification, survives backgrounding
    Platform,
}

/// Structured composite identifier of one scheduled occurrence.
///
/// The flat string form (`{medication}_{kind}_{slot}_{millis}`) only exists at
/// the platform boundary, see [`ScheduleKey::to_identifier`] and
/// [`ScheduleKey::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScheduleKey {
    pub medication_id: String,
    pub slot: String,
    pub kind: ScheduleKind,
    pub trigger_at_ms: i64,
}

impl ScheduleKey {
    pub fn new(
        medication_id: impl Into<String>,
        slot: impl Into<String>,
        kind: ScheduleKind,
        trigger_at: DateTime<Local>,
    ) -> Self {
        Self {
            medication_id: medication_id.into(),
            slot: slot.into(),
            kind,
            trigger_at_ms: trigger_at.timestamp_millis(),
        }
    }

    /// Flat identifier handed to the platform notification service.
    pub fn to_identifier(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.medication_id,
            self.kind.tag(),
            self.slot,
            self.trigger_at_ms
        )
    }

    /// Parse a flat identifier back into a key.
    ///
    /// Returns `None` for identifiers this crate did not produce (test
    /// notifications, other apps' entries, ...).
    pub fn parse(identifier: &str) -> Option<Self> {
        let (medication_id, rest) = identifier.split_once('_')?;
        if medication_id.is_empty() {
            return None;
        }

        let (kind, rest) = if let Some(rest) = rest.strip_prefix("alarm_") {
            (ScheduleKind::Primary, rest)
        } else if let Some(rest) = rest.strip_prefix("snooze_") {
            (ScheduleKind::Snooze, rest)
        } else if let Some(rest) = rest.strip_prefix("reminder_") {
            let (number, rest) = rest.split_once('_')?;
            (ScheduleKind::Reminder(number.parse().ok()?), rest)
        } else {
            return None;
        };

        let (slot, millis) = rest.rsplit_once('_')?;
        if slot.is_empty() {
            return None;
        }

        Some(Self {
            medication_id: medication_id.to_string(),
            slot: slot.to_string(),
            kind,
            trigger_at_ms: millis.parse().ok()?,
        })
    }

    pub fn references(&self, medication_id: &str) -> bool {
        self.medication_id == medication_id
    }

    /// True when both keys come from the same medication time-of-day slot.
    pub fn same_slot(&self, other: &ScheduleKey) -> bool {
        self.medication_id == other.medication_id && self.slot == other.slot
    }
}

impl fmt::Display for ScheduleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_identifier())
    }
}

/// Live, cancellable representation of a scheduled occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleHandle {
    pub key: ScheduleKey,
    pub trigger_at: DateTime<Local>,
    pub mechanism: Mechanism,
}

impl ScheduleHandle {
    pub fn kind(&self) -> ScheduleKind {
        self.key.kind
    }

    pub fn id(&self) -> String {
        self.key.to_identifier()
    }
}

/// Where a presented payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadSource {
    /// Fired by an in-process timer
    Local,
    /// Delivered by the platform notification service
    Remote,
}

/// Data carried by an occurrence from scheduling to acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmPayload {
    pub occurrence_id: String,
    pub medication_id: String,
    pub medication_name: String,
    pub dose: String,
    pub scheduled_time: String,
    pub kind: ScheduleKind,
    pub source: PayloadSource,
    /// Needs a modal acknowledgment surface rather than a passive banner
    pub show_modal: bool,
    #[serde(default)]
    pub snoozed: bool,
}

impl AlarmPayload {
    pub fn new(
        key: &ScheduleKey,
        medication_name: impl Into<String>,
        dose: impl Into<String>,
        source: PayloadSource,
    ) -> Self {
        Self {
            occurrence_id: key.to_identifier(),
            medication_id: key.medication_id.clone(),
            medication_name: medication_name.into(),
            dose: dose.into(),
            scheduled_time: key.slot.clone(),
            kind: key.kind,
            source,
            show_modal: !key.kind.is_reminder(),
            snoozed: key.kind == ScheduleKind::Snooze,
        }
    }

    pub fn key(&self) -> Option<ScheduleKey> {
        ScheduleKey::parse(&self.occurrence_id)
    }

    pub fn title(&self) -> String {
        match self.kind {
            ScheduleKind::Primary => "Time for your medication".to_string(),
            ScheduleKind::Reminder(n) => format!("Medication reminder ({})", n),
            ScheduleKind::Snooze => "Snoozed: time for your medication".to_string(),
        }
    }

    pub fn body(&self) -> String {
        match self.kind {
            ScheduleKind::Reminder(_) => format!(
                "Don't forget to take {} ({})",
                self.medication_name, self.dose
            ),
            _ => format!("Time to take {} ({})", self.medication_name, self.dose),
        }
    }
}

/// Per-occurrence acknowledgment state.
///
/// ```text
/// Scheduled ──► Presented ──► Taken
///                   │    └──► Cancelled
///                   └───────► Snoozed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccurrenceState {
    Scheduled,
    Presented,
    Taken,
    Snoozed,
    Cancelled,
}

impl OccurrenceState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OccurrenceState::Taken | OccurrenceState::Snoozed | OccurrenceState::Cancelled
        )
    }

    /// Whether the machine allows moving from `self` to `next`.
    ///
    /// Re-presenting an already presented occurrence is allowed: the timer
    /// and the platform notification may both report the same alarm.
    pub fn can_transition_to(&self, next: OccurrenceState) -> bool {
        use OccurrenceState::*;
        matches!(
            (self, next),
            (Scheduled, Presented)
                | (Presented, Presented)
                | (Presented, Taken)
                | (Presented, Snoozed)
                | (Presented, Cancelled)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at_eight() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 6, 15, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_identifier_round_trips_for_each_kind() {
        for kind in [
            ScheduleKind::Primary,
            ScheduleKind::Reminder(2),
            ScheduleKind::Snooze,
        ] {
            let key = ScheduleKey::new("med-1", "2026-06-15T08:00:00.000Z", kind, at_eight());
            let parsed = ScheduleKey::parse(&key.to_identifier()).unwrap();
            assert_eq!(parsed, key);
        }
    }

    #[test]
    fn test_identifier_format() {
        let key = ScheduleKey::new("42", "08:00", ScheduleKind::Reminder(1), at_eight());
        let ms = at_eight().timestamp_millis();
        assert_eq!(key.to_identifier(), format!("42_reminder_1_08:00_{}", ms));
    }

    #[test]
    fn test_parse_rejects_foreign_identifiers() {
        assert!(ScheduleKey::parse("test_1700000000000").is_none());
        assert!(ScheduleKey::parse("immediate_test_1700000000000").is_none());
        assert!(ScheduleKey::parse("42_alarm_08:00_notanumber").is_none());
        assert!(ScheduleKey::parse("").is_none());
    }

    #[test]
    fn test_references_is_exact() {
        let key = ScheduleKey::new("11", "08:00", ScheduleKind::Primary, at_eight());
        assert!(key.references("11"));
        assert!(!key.references("1"));
    }

    #[test]
    fn test_payload_from_key() {
        let key = ScheduleKey::new("m1", "08:00", ScheduleKind::Snooze, at_eight());
        let payload = AlarmPayload::new(&key, "Paracetamol", "500 mg", PayloadSource::Remote);
        assert!(payload.snoozed);
        assert!(payload.show_modal);
        assert_eq!(payload.key(), Some(key));
        assert_eq!(payload.body(), "Time to take Paracetamol (500 mg)");
    }

    #[test]
    fn test_payload_source_serializes_as_discriminant() {
        let key = ScheduleKey::new("m1", "08:00", ScheduleKind::Primary, at_eight());
        let payload = AlarmPayload::new(&key, "Paracetamol", "500 mg", PayloadSource::Local);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["source"], "local");
        assert_eq!(json["kind"], "primary");
    }

    #[test]
    fn test_state_transitions() {
        use OccurrenceState::*;
        assert!(Scheduled.can_transition_to(Presented));
        assert!(Presented.can_transition_to(Taken));
        assert!(Presented.can_transition_to(Snoozed));
        assert!(!Scheduled.can_transition_to(Taken));
        assert!(!Taken.can_transition_to(Cancelled));
        assert!(Cancelled.is_terminal());
        assert!(!Presented.is_terminal());
    }
}
