use chrono::{NaiveDateTime, ParseResult, SubsecRound};

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const SECONDS_PER_HOUR: f64 = 3_600.0;
pub const STORE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Drops everything below the millisecond, matching `timestamp(3)` columns.
#[inline]
pub fn truncate_to_millis(ts: NaiveDateTime) -> NaiveDateTime {
    ts.trunc_subsecs(3)
}

#[inline]
pub fn format_store_timestamp(ts: NaiveDateTime) -> String {
    ts.format(STORE_TIMESTAMP_FORMAT).to_string()
}

#[inline]
pub fn parse_store_timestamp(value: &str) -> ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn ts(h: u32, m: u32, s: u32, nanos: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 25)
            .unwrap()
            .and_hms_nano_opt(h, m, s, nanos)
            .unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let original = truncate_to_millis(ts(20, 15, 7, 123_456_789));
        let stored = format_store_timestamp(original);
        assert_eq!(stored, "2024-03-25 20:15:07.123");
        assert_eq!(parse_store_timestamp(&stored).unwrap(), original);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(truncate_to_millis(ts(0, 0, 0, 999_999)).nanosecond(), 0);
        assert_eq!(truncate_to_millis(ts(0, 0, 0, 1_999_999)).nanosecond(), 1_000_000);
        assert_eq!(format_store_timestamp(ts(8, 0, 0, 0)), "2024-03-25 08:00:00.000");
    }
}
