// Property-based tests for time-of-day resolution
// Random "now" instants and dose times across ordinary and DST-observing zones

use chrono::{Duration, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Europe::Berlin;
use proptest::prelude::*;

use medtime::config::DispatchConfig;
use medtime::models::schedule::Mechanism;
use medtime::services::schedule::time_resolver::{
    next_occurrence, parse_time_of_day, RolloverPolicy,
};
use medtime::services::schedule::{adjust_trigger, select_mechanism};

fn policy() -> impl Strategy<Value = RolloverPolicy> {
    prop_oneof![Just(RolloverPolicy::CalendarDay), Just(RolloverPolicy::Fixed24h)]
}

proptest! {
    /// The resolved instant is strictly after now and at most a day away
    #[test]
    fn prop_next_occurrence_is_strictly_future_utc(
        day in 1..=365u32,
        seconds in 0..86_400u32,
        hour in 0..24u32,
        minute in 0..60u32,
        policy in policy(),
    ) {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
            + Duration::days(i64::from(day - 1))
            + Duration::seconds(i64::from(seconds));
        let tod = NaiveTime::from_hms_opt(hour, minute, 0).unwrap();

        let next = next_occurrence(tod, &now, policy);

        prop_assert!(next > now);
        prop_assert!(next - now <= Duration::days(1));
        prop_assert_eq!(next.hour(), hour);
        prop_assert_eq!(next.minute(), minute);
    }

    /// A time that already passed today lands on tomorrow's date
    #[test]
    fn prop_passed_time_rolls_to_next_day(
        hour in 0..23u32,
        minute in 0..60u32,
        later in 1..60u32,
    ) {
        let tod = NaiveTime::from_hms_opt(hour, minute, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 10, hour, minute, 0).unwrap()
            + Duration::minutes(i64::from(later));

        let next = next_occurrence(tod, &now, RolloverPolicy::CalendarDay);

        prop_assert_eq!(next.date_naive(), now.date_naive().succ_opt().unwrap());
    }

    /// In a DST zone the result is still in the future and never more than a
    /// day plus one hour away
    #[test]
    fn prop_next_occurrence_is_future_across_dst(
        day in 60..100u32,
        seconds in 0..86_400u32,
        hour in 0..24u32,
        minute in 0..60u32,
        policy in policy(),
    ) {
        let now = Berlin.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
            + Duration::days(i64::from(day))
            + Duration::seconds(i64::from(seconds));
        let tod = NaiveTime::from_hms_opt(hour, minute, 0).unwrap();

        let next = next_occurrence(tod, &now, policy);

        prop_assert!(next > now);
        prop_assert!(next - now <= Duration::hours(25));
    }

    /// Around the autumn change (2026-10-25 in Berlin) the repeated hour
    /// never leaves the result in the past
    #[test]
    fn prop_next_occurrence_is_future_across_fall_back(
        day in 290..306u32,
        seconds in 0..86_400u32,
        hour in 0..24u32,
        minute in 0..60u32,
        policy in policy(),
    ) {
        let now = Berlin.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
            + Duration::days(i64::from(day))
            + Duration::seconds(i64::from(seconds));
        let tod = NaiveTime::from_hms_opt(hour, minute, 0).unwrap();

        let next = next_occurrence(tod, &now, policy);

        prop_assert!(next > now);
        prop_assert!(next - now <= Duration::hours(25));
        if policy == RolloverPolicy::CalendarDay {
            prop_assert_eq!(next.hour(), hour);
            prop_assert_eq!(next.minute(), minute);
        }
    }

    /// Every in-range HH:MM parses back to itself
    #[test]
    fn prop_hour_minute_parses(hour in 0..24u32, minute in 0..60u32) {
        let raw = format!("{:02}:{:02}", hour, minute);
        prop_assert_eq!(
            parse_time_of_day(&raw, &Utc),
            NaiveTime::from_hms_opt(hour, minute, 0)
        );
    }

    /// Out-of-range fields never parse
    #[test]
    fn prop_out_of_range_rejected(hour in 24..100u32, minute in 60..100u32) {
        let bad_hour = format!("{}:00", hour);
        let bad_minute = format!("00:{}", minute);
        prop_assert!(parse_time_of_day(&bad_hour, &Utc).is_none());
        prop_assert!(parse_time_of_day(&bad_minute, &Utc).is_none());
    }

    /// Adjusted triggers are always at least a second out, and the mechanism
    /// only depends on the final lead
    #[test]
    fn prop_adjusted_trigger_respects_min_lead(lead_ms in 0..86_400_000i64) {
        let config = DispatchConfig::default();
        let now = chrono::Local.with_ymd_and_hms(2026, 6, 15, 7, 0, 0).unwrap();

        let trigger = adjust_trigger(&config, now + Duration::milliseconds(lead_ms), now);

        prop_assert!(trigger - now >= Duration::seconds(1));
        let expected = if trigger - now < Duration::minutes(2) {
            Mechanism::Timer
        } else {
            Mechanism::Platform
        };
        prop_assert_eq!(select_mechanism(&config, trigger, now), expected);
        // Nothing ends up inside the compression window
        prop_assert!(
            trigger - now < Duration::minutes(2) || trigger - now >= Duration::minutes(5)
        );
    }
}
