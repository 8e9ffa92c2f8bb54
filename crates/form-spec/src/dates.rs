//! Date parsing and bound resolution for `date` fields.
//!
//! All comparisons are date-only; time-of-day information in an input is
//! discarded.

use chrono::{DateTime, Days, Local, Months, NaiveDate, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parses an ISO date, an ISO date-time, or an RFC 3339 timestamp.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|stamp| stamp.date())
}

/// Resolves `today`, `today+N`, `today-N`, or an absolute date.
/// Returns `None` for anything unparsable, which callers treat as "no bound".
pub fn resolve_date_bound(expr: &str, today: NaiveDate) -> Option<NaiveDate> {
    let compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let lowered = compact.to_ascii_lowercase();
    if let Some(rest) = lowered.strip_prefix("today") {
        if rest.is_empty() {
            return Some(today);
        }
        let mut chars = rest.chars();
        let sign = chars.next()?;
        let days: u64 = chars.as_str().parse().ok()?;
        return match sign {
            '+' => today.checked_add_days(Days::new(days)),
            '-' => today.checked_sub_days(Days::new(days)),
            _ => None,
        };
    }
    parse_date(expr)
}

/// The date exactly `years` years before `today`. Feb 29 clamps to Feb 28.
pub fn years_before(today: NaiveDate, years: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_common_shapes() {
        assert_eq!(parse_date("2024-03-01"), Some(day(2024, 3, 1)));
        assert_eq!(parse_date("2024-03-01T10:15:00"), Some(day(2024, 3, 1)));
        assert_eq!(parse_date("2024-03-01T10:15:00Z"), Some(day(2024, 3, 1)));
        assert_eq!(parse_date("01/03/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn resolves_relative_expressions() {
        let today = day(2026, 10, 19);
        assert_eq!(resolve_date_bound("today", today), Some(today));
        assert_eq!(resolve_date_bound("today+1", today), Some(day(2026, 10, 20)));
        assert_eq!(resolve_date_bound("today - 19", today), Some(day(2026, 9, 30)));
        assert_eq!(resolve_date_bound("2020-01-31", today), Some(day(2020, 1, 31)));
        assert_eq!(resolve_date_bound("today*2", today), None);
        assert_eq!(resolve_date_bound("tomorrow", today), None);
    }

    #[test]
    fn years_before_clamps_leap_day() {
        assert_eq!(years_before(day(2024, 2, 29), 1), day(2023, 2, 28));
        assert_eq!(years_before(day(2026, 10, 19), 65), day(1961, 10, 19));
    }
}
