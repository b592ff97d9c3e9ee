//! Session marker parsing.
//!
//! Every scale is reduced to a single `f64` so the matcher can order and
//! compare markers without knowing where they came from.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use pheno_common::{parse_f64, round_to};
use pheno_model::{Cell, SessionKey, SessionScale, SessionTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%m/%d/%Y", "%Y/%m/%d"];

fn try_parse_datetime(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn try_parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Parses a calendar date or date-time into fractional days since the common era.
pub fn date_to_days(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if let Some(dt) = try_parse_datetime(trimmed) {
        let seconds = f64::from(dt.time().num_seconds_from_midnight());
        return Some(f64::from(dt.date().num_days_from_ce()) + seconds / 86_400.0);
    }
    try_parse_date(trimmed).map(|date| f64::from(date.num_days_from_ce()))
}

/// Normalises any supported date spelling to `YYYY-MM-DD`.
pub fn iso_date(value: &str) -> Option<String> {
    let trimmed = value.trim();
    try_parse_datetime(trimmed)
        .map(|dt| dt.date())
        .or_else(|| try_parse_date(trimmed))
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// Parses a session marker according to its key; unparseable values are `None`.
pub fn parse_session(key: &SessionKey, cell: &Cell) -> Option<SessionTime> {
    let raw = cell.as_text()?;
    let mut text = raw.trim().to_string();
    if let Some(fix) = key.fixes.iter().find(|fix| fix.from == text) {
        text = fix.to.clone();
    }
    if let Some(prefix) = &key.strip_prefix {
        if let Some(rest) = text.strip_prefix(prefix.as_str()) {
            text = rest.to_string();
        }
    }
    let mut value = match key.scale {
        SessionScale::Date => date_to_days(&text)?,
        // `V03`, `d0180`
        SessionScale::Visit | SessionScale::DaysSinceEntry => {
            parse_f64(text.trim_start_matches(|c: char| c.is_ascii_alphabetic()))?
        }
        SessionScale::AgeYears => parse_f64(&text)?,
    };
    if let Some(divisor) = key.divide_by {
        value /= divisor;
    }
    if let Some(places) = key.round {
        value = round_to(value, places);
    }
    value
        .is_finite()
        .then(|| SessionTime::new(key.scale, value))
}
