//! Week and slot arithmetic for the agenda board.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use std::ops::RangeInclusive;

/// Business hours rendered by the agenda grid, inclusive (08:00-17:00).
pub const BUSINESS_HOURS: RangeInclusive<u32> = 8..=17;

/// Number of hour rows in the agenda grid.
pub const HOURS_PER_DAY: usize = 10;

/// Number of day columns in the agenda grid.
pub const DAYS_PER_WEEK: usize = 7;

/// The Monday of the week containing `d`, at day granularity.
///
/// Sunday counts as day 7 of the previous week.
pub fn start_of_week(d: NaiveDate) -> NaiveDate {
    let offset = d.weekday().num_days_from_monday() as u64;
    d - Days::new(offset)
}

/// The seven days of the week starting at `start` (expected to be a Monday).
pub fn week_days(start: NaiveDate) -> [NaiveDate; DAYS_PER_WEEK] {
    let mut days = [start; DAYS_PER_WEEK];
    for (i, day) in days.iter_mut().enumerate() {
        *day = start + Days::new(i as u64);
    }
    days
}

/// The timestamp of a grid cell: `day` at `hour` with zero minutes/seconds.
pub fn slot_timestamp(day: NaiveDate, hour: u32) -> Option<NaiveDateTime> {
    day.and_hms_opt(hour, 0, 0)
}

/// Wire format for a slot timestamp, `AAAA-MM-DDTHH:00:00`.
pub fn format_slot(slot: NaiveDateTime) -> String {
    slot.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Parse an agenda item timestamp as wall-clock time.
///
/// The API sends RFC 3339; the offset, when present, is dropped and the
/// wall-clock components kept, matching how the grid buckets items by the
/// hour they display.
pub fn parse_item_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    None
}

/// The grid cell an item timestamp falls into.
pub fn slot_of(ts: NaiveDateTime) -> (NaiveDate, u32) {
    use chrono::Timelike;
    (ts.date(), ts.hour())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Weekday};
    use proptest::prelude::*;

    #[test]
    fn monday_is_its_own_week_start() {
        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(start_of_week(monday), monday);
    }

    #[test]
    fn sunday_belongs_to_the_previous_week() {
        let sunday = NaiveDate::from_ymd_opt(2025, 1, 12).unwrap();
        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(start_of_week(sunday), monday);
    }

    #[test]
    fn slot_has_zeroed_minutes_and_seconds() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        let slot = slot_timestamp(day, 10).unwrap();
        assert_eq!(format_slot(slot), "2025-01-08T10:00:00");
    }

    #[test]
    fn parses_rfc3339_and_bare_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 8)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(parse_item_timestamp("2025-01-08T10:00:00"), Some(expected));
        assert_eq!(
            parse_item_timestamp("2025-01-08T10:00:00-03:00"),
            Some(expected)
        );
        assert_eq!(
            parse_item_timestamp("2025-01-08T10:00:00.000Z"),
            Some(expected)
        );
        assert_eq!(parse_item_timestamp("not a date"), None);
    }

    proptest! {
        #[test]
        fn start_of_week_is_a_monday_within_seven_days(offset in 0i64..20_000) {
            let d = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + Duration::days(offset);
            let start = start_of_week(d);
            prop_assert_eq!(start.weekday(), Weekday::Mon);
            prop_assert!(start <= d);
            prop_assert!(d < start + Duration::days(7));
        }

        #[test]
        fn week_days_are_consecutive(offset in 0i64..20_000) {
            let d = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + Duration::days(offset);
            let days = week_days(start_of_week(d));
            for pair in days.windows(2) {
                prop_assert_eq!(pair[1] - pair[0], Duration::days(1));
            }
            prop_assert!(days.contains(&d));
        }
    }
}
