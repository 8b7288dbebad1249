//! Turns medication slots into concrete occurrences without side effects.

use chrono::{DateTime, Duration, Local};

use crate::config::DispatchConfig;
use crate::error::{AlarmError, AlarmResult};
use crate::models::medication::Medication;
use crate::models::schedule::{Mechanism, ScheduleKey, ScheduleKind};

use super::time_resolver::{next_occurrence, parse_time_of_day};

/// One occurrence about to be scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOccurrence {
    pub key: ScheduleKey,
    pub trigger_at: DateTime<Local>,
    pub mechanism: Mechanism,
}

/// Apply near-term compression and the minimum lead to a natural instant.
///
/// A natural lead inside `[timer_horizon, compression_window)` is pulled in to
/// `now + compression_delay`. Shorter leads are left as they are.
pub fn adjust_trigger(
    config: &DispatchConfig,
    natural: DateTime<Local>,
    now: DateTime<Local>,
) -> DateTime<Local> {
    let lead = natural - now;
    let trigger = if lead >= config.timer_horizon() && lead < config.compression_window() {
        now + config.compression_delay()
    } else {
        natural
    };

    trigger.max(now + config.min_lead())
}

/// Leads under the timer horizon run in-process; everything else, including
/// exactly the horizon, goes to the platform.
pub fn select_mechanism(
    config: &DispatchConfig,
    trigger_at: DateTime<Local>,
    now: DateTime<Local>,
) -> Mechanism {
    if trigger_at - now < config.timer_horizon() {
        Mechanism::Timer
    } else {
        Mechanism::Platform
    }
}

/// Plan the primary occurrence of one slot plus its reminder pulses.
pub fn plan_slot(
    config: &DispatchConfig,
    medication_id: &str,
    slot: &str,
    reminder_interval: u32,
    now: DateTime<Local>,
) -> AlarmResult<Vec<PlannedOccurrence>> {
    let time_of_day =
        parse_time_of_day(slot, &Local).ok_or_else(|| AlarmError::InvalidTime(slot.to_string()))?;
    let natural = next_occurrence(time_of_day, &now, config.rollover);

    let trigger_at = adjust_trigger(config, natural, now);
    let mut planned = vec![PlannedOccurrence {
        key: ScheduleKey::new(medication_id, slot, ScheduleKind::Primary, trigger_at),
        trigger_at,
        mechanism: select_mechanism(config, trigger_at, now),
    }];

    if reminder_interval > 0 {
        for pulse in 1..=config.max_reminders {
            let at = natural + Duration::minutes(i64::from(reminder_interval) * i64::from(pulse));
            if at <= now {
                continue;
            }
            planned.push(PlannedOccurrence {
                key: ScheduleKey::new(medication_id, slot, ScheduleKind::Reminder(pulse), at),
                trigger_at: at,
                mechanism: select_mechanism(config, at, now),
            });
        }
    }

    Ok(planned)
}

/// Plan every slot of a medication. Slots that do not parse are skipped.
pub fn plan_medication(
    config: &DispatchConfig,
    medication: &Medication,
    reminder_interval: u32,
    now: DateTime<Local>,
) -> Vec<PlannedOccurrence> {
    let mut planned = Vec::new();
    for slot in &medication.times {
        match plan_slot(config, &medication.id, slot, reminder_interval, now) {
            Ok(mut occurrences) => planned.append(&mut occurrences),
            Err(e) => log::warn!("Skipping slot of {}: {}", medication.label(), e),
        }
    }
    planned
}
