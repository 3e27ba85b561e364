use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::constants::TIMESTAMP_FORMAT;

/// Naive layouts seen across export generations; interpreted as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Offset layouts written by dataframe tooling (`2024-01-01 00:00:00+00:00`).
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parse a timestamp into a UTC instant. Returns `None` for anything unparseable.
pub fn parse_utc_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// ISO-8601 UTC with trailing `Z`, second precision.
pub fn format_utc_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Truncate to the start of the containing UTC hour.
pub fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    let secs = ts.timestamp();
    let floored = secs - secs.rem_euclid(3600);
    Utc.timestamp_opt(floored, 0).single().unwrap_or(ts)
}

/// Parse a numeric cell. Empty, non-numeric and non-finite values are null.
pub fn parse_value(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generations() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        for input in [
            "2024-01-01T10:00:00Z",
            "2024-01-01T11:00:00+01:00",
            "2024-01-01 10:00:00",
            "2024-01-01 10:00:00+00:00",
            "2024-01-01T10:00:00.000",
            "2024-01-01 10:00",
        ] {
            assert_eq!(parse_utc_timestamp(input), Some(expected), "input {}", input);
        }

        assert_eq!(
            parse_utc_timestamp("2024-01-01"),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_utc_timestamp(""), None);
        assert_eq!(parse_utc_timestamp("yesterday"), None);
        assert_eq!(parse_utc_timestamp("2024-13-01T00:00:00Z"), None);
    }

    #[test]
    fn test_floor_to_hour() {
        let ts = parse_utc_timestamp("2024-03-31T23:59:59.900Z").unwrap();
        assert_eq!(format_utc_timestamp(&floor_to_hour(ts)), "2024-03-31T23:00:00Z");
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("12.5"), Some(12.5));
        assert_eq!(parse_value(" -3 "), Some(-3.0));
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value("n/a"), None);
    }
}
