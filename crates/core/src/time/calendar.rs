use crate::retention::error::RetentionError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Format of `created.date` in the Ops Manager snapshot listing.
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format used by the Ops Manager dashboard, e.g. `01/31/24 - 11:00 PM`.
pub const DASHBOARD_TIME_FORMAT: &str = "%m/%d/%y - %I:%M %p";

/// Last calendar day of the month before `now`, evaluated in UTC.
pub fn last_day_of_previous_month(now: DateTime<Utc>) -> NaiveDate {
    last_day_of_month_before(now.date_naive())
}

pub fn last_day_of_month_before(date: NaiveDate) -> NaiveDate {
    // Stepping back `day()` days from any date lands on the previous month's last day.
    date - Duration::days(i64::from(date.day()))
}

pub fn parse_snapshot_timestamp(text: &str) -> Result<DateTime<Utc>, RetentionError> {
    NaiveDateTime::parse_from_str(text.trim(), SNAPSHOT_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|err| RetentionError::MalformedTimestamp {
            snapshot_id: None,
            text: text.to_string(),
            detail: err.to_string(),
        })
}

pub fn format_snapshot_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(SNAPSHOT_TIMESTAMP_FORMAT).to_string()
}

pub fn same_calendar_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

pub fn format_display_time<Tz>(ts: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    ts.with_timezone(tz).format(DASHBOARD_TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn previous_month_across_year_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 1, 17, 9, 30, 0).unwrap();
        assert_eq!(last_day_of_previous_month(now), ymd(2023, 12, 31));
    }

    #[test]
    fn previous_month_handles_every_month_length() {
        // Leap February, common February, 30-day and 31-day months.
        let cases = [
            (Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(), ymd(2024, 2, 29)),
            (Utc.with_ymd_and_hms(2023, 3, 31, 23, 59, 59).unwrap(), ymd(2023, 2, 28)),
            (Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap(), ymd(2024, 4, 30)),
            (Utc.with_ymd_and_hms(2024, 8, 2, 6, 0, 0).unwrap(), ymd(2024, 7, 31)),
        ];
        for (now, expected) in cases {
            assert_eq!(last_day_of_previous_month(now), expected, "clock {now}");
        }
    }

    #[test]
    fn parses_api_timestamp_as_utc() {
        let ts = parse_snapshot_timestamp("2024-01-31T22:00:00Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 31, 22, 0, 0).unwrap());
    }

    #[test]
    fn malformed_timestamp_is_an_error_not_epoch() {
        for bad in ["", "2024-01-31", "31/01/2024 22:00", "2024-13-01T00:00:00Z"] {
            let err = parse_snapshot_timestamp(bad).unwrap_err();
            assert!(
                matches!(err, RetentionError::MalformedTimestamp { ref text, .. } if text == bad),
                "input {bad:?}"
            );
        }
    }

    #[test]
    fn same_day_ignores_time_of_day() {
        let early = Utc.with_ymd_and_hms(2024, 3, 31, 1, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 31, 23, 0, 0).unwrap();
        let next = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

        assert!(same_calendar_day(early, early));
        assert!(same_calendar_day(early, late));
        assert!(same_calendar_day(late, early));
        assert!(!same_calendar_day(late, next));
        assert!(!same_calendar_day(next, late));
    }

    #[test]
    fn format_then_parse_keeps_the_day() {
        let ts = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let text = format_snapshot_timestamp(ts);
        assert_eq!(text, "2023-12-31T23:59:59Z");
        let back = parse_snapshot_timestamp(&text).unwrap();
        assert!(same_calendar_day(ts, back));
    }

    #[test]
    fn display_time_uses_dashboard_format_in_zone() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 31, 22, 0, 0).unwrap();
        assert_eq!(format_display_time(ts, &Utc), "01/31/24 - 10:00 PM");
        // Cairo is UTC+2 in winter, which pushes this snapshot past midnight.
        assert_eq!(
            format_display_time(ts, &chrono_tz::Africa::Cairo),
            "02/01/24 - 12:00 AM"
        );
    }
}
