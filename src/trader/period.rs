//! Bar boundary computation.
//!
//! A boundary is the instant at which the bar containing a timestamp starts.
//! Truncation happens on the wall clock of a reference time zone which must
//! stay fixed for the lifetime of a series, otherwise boundaries from before
//! and after the change are not comparable.

use chrono::{DateTime, Datelike, Days, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use super::constant::Periodicity;
use super::error::SeriesError;

/// Longest DST gap we probe through when the truncated wall time does not exist
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// Get the start of the bar containing `dt`.
///
/// Pure and total. Monotonic: `t1 <= t2` implies
/// `period_start(t1) <= period_start(t2)` for the same periodicity and zone.
///
/// `Second` and `Quarter` have no bar boundary of their own here and are
/// truncated to the minute, so an unexpected unit keeps the series updating
/// instead of stalling it.
pub fn period_start(dt: &DateTime<Utc>, periodicity: Periodicity, tz: &Tz) -> DateTime<Utc> {
    let local = dt.with_timezone(tz).naive_local();
    let truncated = truncate_local(local, periodicity);
    resolve_local(truncated, tz, dt)
}

fn truncate_local(local: NaiveDateTime, periodicity: Periodicity) -> NaiveDateTime {
    let date = local.date();
    let start_of_day = |d: NaiveDate| d.and_hms_opt(0, 0, 0);

    let truncated = match periodicity {
        Periodicity::Minute => date.and_hms_opt(local.hour(), local.minute(), 0),
        Periodicity::Hour => date.and_hms_opt(local.hour(), 0, 0),
        Periodicity::Day => start_of_day(date),
        Periodicity::Week => {
            let days_from_monday = u64::from(date.weekday().num_days_from_monday());
            date.checked_sub_days(Days::new(days_from_monday))
                .and_then(start_of_day)
        }
        Periodicity::Month => date.with_day(1).and_then(start_of_day),
        Periodicity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).and_then(start_of_day),
        // Fallback policy for units without a bar boundary
        Periodicity::Second | Periodicity::Quarter => {
            date.and_hms_opt(local.hour(), local.minute(), 0)
        }
    };

    truncated.unwrap_or(local)
}

/// Map a truncated wall time back to an instant that is not after `dt`
fn resolve_local(naive: NaiveDateTime, tz: &Tz, dt: &DateTime<Utc>) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(local) => local.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, latest) => {
            let latest = latest.with_timezone(&Utc);
            if latest <= *dt {
                latest
            } else {
                earliest.with_timezone(&Utc)
            }
        }
        LocalResult::None => {
            let mut probe = naive;
            for _ in 0..MAX_GAP_MINUTES {
                probe += Duration::minutes(1);
                if let Some(resolved) = tz.from_local_datetime(&probe).earliest() {
                    return resolved.with_timezone(&Utc).min(*dt);
                }
            }
            *dt
        }
    }
}

/// Parse an IANA time zone name such as `"UTC"` or `"Europe/Kyiv"`
pub fn parse_timezone(name: &str) -> Result<Tz, SeriesError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| SeriesError::UnknownTimeZone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_period_start_utc_units() {
        let tz = Tz::UTC;
        // Wednesday
        let dt = utc(2024, 5, 1, 13, 47, 29) + Duration::milliseconds(250);

        assert_eq!(period_start(&dt, Periodicity::Minute, &tz), utc(2024, 5, 1, 13, 47, 0));
        assert_eq!(period_start(&dt, Periodicity::Hour, &tz), utc(2024, 5, 1, 13, 0, 0));
        assert_eq!(period_start(&dt, Periodicity::Day, &tz), utc(2024, 5, 1, 0, 0, 0));
        assert_eq!(period_start(&dt, Periodicity::Week, &tz), utc(2024, 4, 29, 0, 0, 0));
        assert_eq!(period_start(&dt, Periodicity::Month, &tz), utc(2024, 5, 1, 0, 0, 0));
        assert_eq!(period_start(&dt, Periodicity::Year, &tz), utc(2024, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_unsupported_units_fall_back_to_minute() {
        let tz = Tz::UTC;
        let dt = utc(2024, 8, 15, 9, 12, 44);

        assert_eq!(period_start(&dt, Periodicity::Second, &tz), utc(2024, 8, 15, 9, 12, 0));
        assert_eq!(period_start(&dt, Periodicity::Quarter, &tz), utc(2024, 8, 15, 9, 12, 0));
    }

    #[test]
    fn test_boundary_is_idempotent() {
        let tz = Tz::UTC;
        let dt = utc(2023, 12, 31, 23, 59, 59);
        for p in Periodicity::all() {
            let start = period_start(&dt, p, &tz);
            assert_eq!(period_start(&start, p, &tz), start);
            assert!(start <= dt);
        }
    }

    #[test]
    fn test_week_starts_on_monday() {
        let tz = Tz::UTC;
        // Sunday belongs to the week that started six days earlier
        let sunday = utc(2024, 5, 5, 23, 0, 0);
        assert_eq!(period_start(&sunday, Periodicity::Week, &tz), utc(2024, 4, 29, 0, 0, 0));

        let monday = utc(2024, 5, 6, 0, 0, 0);
        assert_eq!(period_start(&monday, Periodicity::Week, &tz), monday);
    }

    #[test]
    fn test_day_in_reference_zone() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        // 12:00 CEST
        let dt = utc(2024, 5, 1, 10, 0, 0);
        assert_eq!(period_start(&dt, Periodicity::Day, &tz), utc(2024, 4, 30, 22, 0, 0));

        // 01:30 CEST on May 2nd is still May 1st in UTC
        let late = utc(2024, 5, 1, 23, 30, 0);
        assert_eq!(period_start(&late, Periodicity::Day, &tz), utc(2024, 5, 1, 22, 0, 0));
    }

    #[test]
    fn test_hour_across_fall_back() {
        let tz: Tz = "America/New_York".parse().unwrap();

        // 01:30 EDT
        let first = utc(2024, 11, 3, 5, 30, 0);
        // 01:30 EST
        let second = utc(2024, 11, 3, 6, 30, 0);

        assert_eq!(period_start(&first, Periodicity::Hour, &tz), utc(2024, 11, 3, 5, 0, 0));
        assert_eq!(period_start(&second, Periodicity::Hour, &tz), utc(2024, 11, 3, 6, 0, 0));
    }

    #[test]
    fn test_monotonic_across_dst_transitions() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let ranges = [utc(2024, 3, 10, 0, 0, 0), utc(2024, 11, 2, 22, 0, 0)];

        for start in ranges {
            for p in Periodicity::all() {
                let mut previous = period_start(&start, p, &tz);
                for step in 1..(12 * 60) {
                    let dt = start + Duration::minutes(step);
                    let boundary = period_start(&dt, p, &tz);
                    assert!(boundary >= previous, "{p} went backwards at {dt}");
                    assert!(boundary <= dt);
                    previous = boundary;
                }
            }
        }
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("UTC").unwrap(), Tz::UTC);
        assert!(parse_timezone("Mars/Olympus").is_err());
    }
}
