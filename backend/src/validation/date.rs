//! Date parsing and timezone normalization.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::json;

use crate::models::{DateSettings, ValidationResult};

/// Accepted date layouts, tried in this order.
pub const DATE_FORMATS: [&str; 6] = [
    "YYYY-MM-DD",
    "DD/MM/YYYY",
    "YYYY/MM/DD",
    "DD-MM-YYYY",
    "YYYY-MM-DD HH:MM:SS",
    "YYYY-MM-DDTHH:MM:SS±HHMM",
];

enum Parsed {
    /// Wall-clock time to be read in the column timezone.
    Local(NaiveDateTime),
    /// Time carrying its own offset.
    Offset(DateTime<FixedOffset>),
}

fn parse_candidates(raw: &str) -> Option<Parsed> {
    let midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN);

    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(Parsed::Local(midnight(date)));
        }
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Parsed::Local(dt));
    }

    // a trailing Z is the UTC offset
    let zoned = match raw.strip_suffix('Z') {
        Some(head) => format!("{}+0000", head),
        None => raw.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_str(&zoned, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(Parsed::Offset(dt));
    }

    // Offset missing or unreadable: keep the wall-clock part
    let head = raw.split('+').next().unwrap_or(raw);
    NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(Parsed::Local)
}

/// Validate a date string and normalize it to a UTC `YYYY-MM-DD`.
///
/// Wall-clock inputs are read in the column timezone (default UTC) before
/// conversion, so a midnight date east of UTC lands on the previous day.
pub fn validate_date(raw: &str, settings: &DateSettings) -> ValidationResult {
    let tz: Tz = match settings.timezone.parse() {
        Ok(tz) => tz,
        Err(_) => {
            return ValidationResult::invalid(format!("Unknown timezone: {}", settings.timezone));
        }
    };

    let Some(parsed) = parse_candidates(raw.trim()) else {
        return ValidationResult::invalid(format!(
            "Date must be in one of these formats: {}",
            DATE_FORMATS.join(", ")
        ));
    };

    let utc = match parsed {
        Parsed::Offset(dt) => dt.with_timezone(&Utc),
        Parsed::Local(naive) => match tz.from_local_datetime(&naive).earliest() {
            Some(local) => local.with_timezone(&Utc),
            None => {
                return ValidationResult::invalid(format!(
                    "Time {} does not exist in timezone {}",
                    naive, settings.timezone
                ));
            }
        },
    };

    ValidationResult::valid_with(json!(utc.format("%Y-%m-%d").to_string()))
        .with_message("Date formatted successfully")
}

/// Parse an ISO-8601 timestamp. A trailing `Z` means UTC; timestamps without
/// an offset are read as UTC.
pub fn parse_iso_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    let normalized = match raw.strip_suffix('Z') {
        Some(head) => format!("{}+00:00", head),
        None => raw.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Some(dt);
        }
    }

    let utc = FixedOffset::east_opt(0)?;
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return utc.from_local_datetime(&naive).single();
        }
    }
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|d| utc.from_local_datetime(&d.and_time(NaiveTime::MIN)).single())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> DateSettings {
        DateSettings {
            timezone: "UTC".into(),
            includes_time: false,
        }
    }

    fn tz(name: &str) -> DateSettings {
        DateSettings {
            timezone: name.into(),
            includes_time: false,
        }
    }

    fn date_of(result: &ValidationResult) -> &str {
        result.transformed_value.as_ref().unwrap().as_str().unwrap()
    }

    #[test]
    fn test_all_six_formats_normalize() {
        let inputs = [
            "2024-03-15",
            "15/03/2024",
            "2024/03/15",
            "15-03-2024",
            "2024-03-15 10:30:00",
            "2024-03-15T10:30:00+0000",
            "2024-03-15T10:30:00Z",
            "2024-03-15T10:30:00+05:30",
        ];
        for input in inputs {
            let result = validate_date(input, &utc());
            assert!(result.is_valid, "{} should be valid", input);
            assert_eq!(date_of(&result), "2024-03-15", "input {}", input);
        }
    }

    #[test]
    fn test_offset_moves_day() {
        let result = validate_date("2024-03-15T01:00:00+0300", &utc());
        assert_eq!(date_of(&result), "2024-03-14");

        let result = validate_date("2024-03-14T21:00:00-0500", &utc());
        assert_eq!(date_of(&result), "2024-03-15");
    }

    #[test]
    fn test_column_timezone_applied() {
        // midnight in Tokyo is the previous day in UTC
        let result = validate_date("2024-03-15", &tz("Asia/Tokyo"));
        assert_eq!(date_of(&result), "2024-03-14");

        let result = validate_date("2024-03-15", &tz("America/New_York"));
        assert_eq!(date_of(&result), "2024-03-15");
    }

    #[test]
    fn test_missing_offset_uses_column_timezone() {
        let result = validate_date("2024-03-15T23:30:00", &tz("America/New_York"));
        assert_eq!(date_of(&result), "2024-03-16");
    }

    #[test]
    fn test_rejects_unknown_layouts() {
        for input in ["March 15 2024", "2024.03.15", "15/13/2024", "", "2024-03-15T10:30"] {
            let result = validate_date(input, &utc());
            assert!(!result.is_valid, "{} should be rejected", input);
            assert!(result.message.unwrap().contains("YYYY-MM-DD"));
        }
    }

    #[test]
    fn test_unknown_timezone() {
        let result = validate_date("2024-03-15", &tz("Mars/Olympus"));
        assert!(!result.is_valid);
    }

    #[test]
    fn test_parse_iso_timestamp() {
        assert!(parse_iso_timestamp("2024-01-01T10:00:00Z").is_some());
        assert!(parse_iso_timestamp("2024-01-01T10:00:00.123+02:00").is_some());
        assert!(parse_iso_timestamp("2024-01-01 10:00:00").is_some());
        assert!(parse_iso_timestamp("2024-01-01").is_some());
        assert!(parse_iso_timestamp("yesterday").is_none());
        let a = parse_iso_timestamp("2024-01-01T12:00:00+02:00").unwrap();
        let b = parse_iso_timestamp("2024-01-01T10:00:00Z").unwrap();
        assert_eq!(a, b);
    }
}
