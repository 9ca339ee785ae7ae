use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike, Utc};

/// Wire format for forecast timestamps. Fixed width and zero padded, so the
/// string order matches chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub const SERIES_LOOKBACK_DAYS: i64 = 1;
pub const SERIES_LOOKAHEAD_DAYS: i64 = 5;

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Accepts the provider's RFC 3339 timestamps (any offset, optional fractional
/// seconds) and normalizes them to whole seconds in UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(truncate_to_second(parsed.with_timezone(&Utc)));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

fn truncate_to_second(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Inclusive window used by the series query: one day back, five days ahead.
pub fn series_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        now - Duration::days(SERIES_LOOKBACK_DAYS),
        now + Duration::days(SERIES_LOOKAHEAD_DAYS),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_fixed_width_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(ts), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn parses_offsets_and_fractions_into_utc_seconds() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-10T14:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10T16:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10T14:00:00.750Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10T14:00:00"), Some(expected));
        assert_eq!(parse_timestamp("not a time"), None);
    }

    #[test]
    fn lexical_order_matches_chronological_order() {
        let a = Utc.with_ymd_and_hms(2024, 9, 30, 23, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 10, 1, 1, 0, 0).unwrap();
        assert!(a < b);
        assert!(format_timestamp(a) < format_timestamp(b));
    }

    #[test]
    fn series_window_spans_six_days() {
        let now = Utc.with_ymd_and_hms(2024, 5, 5, 12, 0, 0).unwrap();
        let (from, to) = series_window(now);
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 5, 4, 12, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap());
    }
}
