//! Calendar-date utilities: fixed-width due dates and timezone-aware "today".

use anyhow::Result;
use chrono::{Days, Local, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::LazyLock;

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

static DUE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex"));

/// Parse a `YYYY-MM-DD` due date.
///
/// Rejects non-padded forms like `2024-1-5`: chrono accepts them, but they
/// break lexicographic ordering against padded dates.
pub fn parse_due_date(s: &str) -> Result<NaiveDate> {
    if !DUE_DATE_RE.is_match(s) {
        anyhow::bail!("due date must be YYYY-MM-DD: '{s}'");
    }
    NaiveDate::parse_from_str(s, DUE_DATE_FORMAT)
        .map_err(|e| anyhow::anyhow!("invalid due date '{s}': {e}"))
}

pub fn is_valid_due_date(s: &str) -> bool {
    parse_due_date(s).is_ok()
}

pub fn format_due_date(date: NaiveDate) -> String {
    date.format(DUE_DATE_FORMAT).to_string()
}

/// `date + days`, formatted as a due date.
pub fn due_date_after(date: NaiveDate, days: u64) -> String {
    let shifted = date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
    format_due_date(shifted)
}

/// Today's calendar date in an IANA timezone like "America/Chicago".
pub fn today_in(tz: &str) -> Result<NaiveDate> {
    let tz: Tz = tz
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))?;
    Ok(Utc::now().with_timezone(&tz).date_naive())
}

/// Today's date in the configured timezone, or the system local date.
pub fn today(tz: Option<&str>) -> Result<NaiveDate> {
    match tz {
        Some(tz) => today_in(tz),
        None => Ok(Local::now().date_naive()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_padded_date() {
        let d = parse_due_date("2024-02-29").unwrap();
        assert_eq!(format_due_date(d), "2024-02-29");
    }

    #[test]
    fn test_rejects_unpadded_and_garbage() {
        assert!(parse_due_date("2024-1-5").is_err());
        assert!(parse_due_date("2024-02-30").is_err());
        assert!(parse_due_date("next tuesday").is_err());
        assert!(parse_due_date("").is_err());
    }

    #[test]
    fn test_due_date_after_crosses_month() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(due_date_after(d, 1), "2024-02-01");
        assert_eq!(due_date_after(d, 7), "2024-02-07");
    }

    #[test]
    fn test_invalid_timezone() {
        assert!(today_in("Mars/Olympus").is_err());
        assert!(today_in("America/Chicago").is_ok());
    }
}
