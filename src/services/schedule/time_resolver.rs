//! Pure time-of-day resolution.
//!
//! Medication times only carry hour and minute; these helpers turn them into
//! the next absolute instant relative to "now". Nothing here touches a clock.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
};
use serde::{Deserialize, Serialize};

/// How a time that already passed today is moved to tomorrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloverPolicy {
    /// Advance the calendar date and keep the wall-clock time. Correct across
    /// daylight-saving transitions.
    #[default]
    CalendarDay,
    /// Add exactly 24 hours of elapsed time. Drifts by the DST offset on
    /// transition days.
    Fixed24h,
}

/// Parse a stored time-of-day marker.
///
/// Accepts `HH:MM` and ISO timestamps. RFC 3339 timestamps carrying an offset
/// are converted into `tz` before the hour and minute are read; naive
/// timestamps are read as-is. The date component is always discarded.
/// Malformed or out-of-range input is logged and yields `None`.
pub fn parse_time_of_day<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<NaiveTime> {
    let raw = raw.trim();

    let parsed = if raw.contains('T') {
        parse_iso(raw, tz)
    } else {
        parse_hour_minute(raw)
    };

    if parsed.is_none() {
        log::error!("Invalid time of day: {:?}", raw);
    }
    parsed
}

fn parse_iso<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<NaiveTime> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        let local = with_offset.with_timezone(tz);
        return NaiveTime::from_hms_opt(local.hour(), local.minute(), 0);
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| NaiveTime::from_hms_opt(naive.hour(), naive.minute(), 0))
}

fn parse_hour_minute(raw: &str) -> Option<NaiveTime> {
    let mut fields = raw.split(':');
    let (hour, minute) = match (fields.next(), fields.next(), fields.next()) {
        (Some(h), Some(m), None) => (h.trim(), m.trim()),
        _ => return None,
    };

    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Map a local wall-clock time onto the zone.
///
/// Ambiguous times (clocks going back) take the earlier instant. Times inside
/// a spring-forward gap are pushed forward by an hour, which lands on the
/// same offset change the clocks made.
pub fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}

/// Next instant strictly after `now` at `time_of_day` (seconds zeroed).
///
/// # Examples
/// ```
/// use chrono::{NaiveTime, TimeZone, Utc};
/// use medtime::services::schedule::time_resolver::{next_occurrence, RolloverPolicy};
///
/// let now = Utc.with_ymd_and_hms(2026, 6, 15, 8, 5, 0).unwrap();
/// let eight = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
/// let next = next_occurrence(eight, &now, RolloverPolicy::CalendarDay);
/// assert_eq!(next, Utc.with_ymd_and_hms(2026, 6, 16, 8, 0, 0).unwrap());
/// ```
pub fn next_occurrence<Tz: TimeZone>(
    time_of_day: NaiveTime,
    now: &DateTime<Tz>,
    policy: RolloverPolicy,
) -> DateTime<Tz> {
    let tz = now.timezone();
    let time_of_day = time_of_day.with_second(0).unwrap_or(time_of_day);
    let today = now.date_naive();

    if let Some(candidate) = resolve_local(&tz, today.and_time(time_of_day)) {
        if candidate > *now {
            return candidate;
        }

        if policy == RolloverPolicy::Fixed24h {
            // A 25-hour day can leave candidate + 24h still behind now
            let mut next = candidate + Duration::days(1);
            while next <= *now {
                next = next + Duration::days(1);
            }
            return next;
        }
    }

    // Calendar-day rollover; keep walking if a date has no such local time
    let mut date: NaiveDate = today;
    for _ in 0..3 {
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
        if let Some(candidate) = resolve_local(&tz, date.and_time(time_of_day)) {
            if candidate > *now {
                return candidate;
            }
        }
    }

    now.clone() + Duration::days(1)
}
