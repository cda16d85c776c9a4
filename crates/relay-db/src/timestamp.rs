use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

/// Format used when the store writes a timestamp itself.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_FORMATS: &[&str] = &[STORAGE_FORMAT, "%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S"];

/// Parse a stored timestamp, accepting SQLite's `CURRENT_TIMESTAMP` form and
/// the `T`-separated variants with or without a zone. Never fails: an
/// unrecognised value reads as the current time.
pub fn parse_timestamp(s: &str) -> DateTime<Utc> {
    for format in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return ndt.and_utc();
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }

    warn!("Unparseable timestamp '{}', using current time", s);
    Utc::now()
}

pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.format(STORAGE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn expected() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 5).unwrap()
    }

    #[test]
    fn parses_space_separated() {
        assert_eq!(parse_timestamp("2024-03-09 14:30:05"), expected());
    }

    #[test]
    fn parses_t_separated_with_and_without_zone() {
        assert_eq!(parse_timestamp("2024-03-09T14:30:05Z"), expected());
        assert_eq!(parse_timestamp("2024-03-09T14:30:05"), expected());
    }

    #[test]
    fn parses_rfc3339_offsets() {
        assert_eq!(parse_timestamp("2024-03-09T16:30:05+02:00"), expected());
    }

    #[test]
    fn garbage_falls_back_to_now() {
        let before = Utc::now() - Duration::seconds(1);
        let parsed = parse_timestamp("not a timestamp");
        assert!(parsed >= before);
        assert!(parsed <= Utc::now() + Duration::seconds(1));
    }

    #[test]
    fn format_round_trips_through_storage_format() {
        assert_eq!(format_timestamp(expected()), "2024-03-09 14:30:05");
        assert_eq!(parse_timestamp(&format_timestamp(expected())), expected());
    }
}
