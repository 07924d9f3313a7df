//! Date parsing and formatting shared by the row framework and media model.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Persisted timestamp format. Sorts lexicographically in time order, so
/// range filters can compare the stored text directly.
const DB_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Stand-in for missing or unparseable dates (1900-01-01T00:00:00Z).
pub fn minimum_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Parse a timestamp in any of the forms we persist or receive remotely.
///
/// Accepted:
/// - `2020-01-31 12:00:00` / `2020-01-31 12:00:00.250` (database form)
/// - `2017-08-28T21:43:29Z` / `2017-08-28T21:43:29.123+01:00` (RFC 3339)
/// - `2017-08-28T21:43:29` (naive ISO, taken as UTC)
/// - `2017-08-28` (midnight UTC)
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, DB_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|naive| Utc.from_local_datetime(&naive).single())
}

/// Format a timestamp in the persisted form.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DB_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_minimum_date() {
        let min = minimum_date();
        assert_eq!(min.year(), 1900);
        assert_eq!(min.month(), 1);
        assert_eq!(min.day(), 1);
    }

    #[test]
    fn test_parse_db_form() {
        let dt = parse_date("2020-01-31 12:34:56").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2020, 1, 31, 12, 34, 56).unwrap());
    }

    #[test]
    fn test_parse_db_form_with_fraction() {
        let dt = parse_date("2020-01-31 12:34:56.250").unwrap();
        assert_eq!(dt.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_date("2017-08-28T21:43:29Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2017, 8, 28, 21, 43, 29).unwrap());

        let dt = parse_date("2017-08-28T22:43:29+01:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2017, 8, 28, 21, 43, 29).unwrap());
    }

    #[test]
    fn test_parse_naive_iso_and_bare_date() {
        assert_eq!(
            parse_date("2017-08-28T21:43:29").unwrap(),
            Utc.with_ymd_and_hms(2017, 8, 28, 21, 43, 29).unwrap()
        );
        assert_eq!(
            parse_date("2017-08-28").unwrap(),
            Utc.with_ymd_and_hms(2017, 8, 28, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_date("").is_none());
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("2017-13-45").is_none());
    }

    #[test]
    fn test_format_round_trip_keeps_subseconds() {
        let dt = Utc.with_ymd_and_hms(2021, 6, 1, 8, 0, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        let s = format_date(&dt);
        assert_eq!(s, "2021-06-01 08:00:00.123456");
        assert_eq!(parse_date(&s), Some(dt));
    }

    #[test]
    fn test_format_sorts_in_time_order() {
        let a = format_date(&Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let b = format_date(
            &(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::milliseconds(500)),
        );
        let c = format_date(&Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 1).unwrap());
        assert!(a < b);
        assert!(b < c);
    }
}
