//! Best-effort date parsing.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Datetime layouts tried in order.
const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
];

/// Date-only layouts tried in order. Month comes before day for slashed dates.
const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%Y%m%d",
    "%d-%b-%Y",
    "%B %d, %Y",
    "%d %B %Y",
];

/// Year, month and day of a parsed date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    pub year: i32,
    pub month: i32,
    pub day: i32,
}

impl From<NaiveDate> for DateParts {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month() as i32,
            day: date.day() as i32,
        }
    }
}

/// Parse a date-like string, returning `None` when no layout matches.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Parse and decompose in one step.
pub fn parse_date_parts(raw: &str) -> Option<DateParts> {
    parse_date(raw).map(DateParts::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(y: i32, m: i32, d: i32) -> Option<DateParts> {
        Some(DateParts {
            year: y,
            month: m,
            day: d,
        })
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(parse_date_parts("2024-01-05"), parts(2024, 1, 5));
        assert_eq!(parse_date_parts("  2024-12-31 "), parts(2024, 12, 31));
    }

    #[test]
    fn test_datetime_variants() {
        assert_eq!(parse_date_parts("2024-01-05T13:45:00"), parts(2024, 1, 5));
        assert_eq!(parse_date_parts("2024-01-05 13:45:00"), parts(2024, 1, 5));
        assert_eq!(parse_date_parts("2024-01-05T13:45:00Z"), parts(2024, 1, 5));
        assert_eq!(parse_date_parts("2024-01-05 00:00:00.000"), parts(2024, 1, 5));
    }

    #[test]
    fn test_slashed_dates_are_month_first() {
        assert_eq!(parse_date_parts("01/05/2024"), parts(2024, 1, 5));
        assert_eq!(parse_date_parts("2024/01/05"), parts(2024, 1, 5));
        assert_eq!(parse_date_parts("1/5/2024 12:00:00 AM"), parts(2024, 1, 5));
    }

    #[test]
    fn test_unparseable_values() {
        assert_eq!(parse_date("bad-date"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2024-13-45"), None);
        assert_eq!(parse_date("42"), None);
    }
}
