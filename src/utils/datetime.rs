use chrono::{DateTime, Local, NaiveDate, Utc};

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%d.%m.%Y %H:%M").to_string()
}

/// Formats a stored RFC 3339 timestamp, falling back to the raw value.
pub fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| format_datetime(&dt.with_timezone(&Utc)))
        .unwrap_or_else(|_| raw.to_string())
}

pub fn days_until(deadline: NaiveDate, today: NaiveDate) -> i64 {
    (deadline - today).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2025-01-31T18:05:00+00:00"), "31.01.2025 18:05");
        assert_eq!(format_timestamp("2025-01-31T21:05:00+03:00"), "31.01.2025 18:05");
        assert_eq!(format_timestamp("garbage"), "garbage");
    }

    #[test]
    fn test_days_until() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 30).unwrap();
        assert_eq!(days_until(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(), today), 2);
        assert_eq!(days_until(today, today), 0);
        assert_eq!(days_until(NaiveDate::from_ymd_opt(2025, 1, 29).unwrap(), today), -1);
    }
}
