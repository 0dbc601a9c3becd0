use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::MesoError;

/// Most recent weekday on or before `today`. Exchange holidays are not
/// modelled; a holiday date simply yields empty provider data.
pub fn latest_trade_date(today: NaiveDate) -> NaiveDate {
    match today.weekday() {
        Weekday::Sat => today - Duration::days(1),
        Weekday::Sun => today - Duration::days(2),
        _ => today,
    }
}

/// Provider wire format, `YYYYMMDD`
pub fn provider_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Accepts `YYYYMMDD` or `YYYY-MM-DD`
pub fn parse_trade_date(raw: &str) -> Result<NaiveDate, MesoError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| MesoError::InvalidDate(raw.to_string()))
}
